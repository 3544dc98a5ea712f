use super::month::MonthGrid;
use super::util::WeekdayExt;
use ratatui::layout::Flex;
use ratatui::{prelude::*, widgets::*};
use time::{Month, Weekday};

static HEADER: &str = " Su  Mo  Tu  We  Th  Fr  Sa ";

/// Number of columns per day of week
const DAY_WIDTH: u16 = 4;

/// Width of the calendar in columns
const MAIN_WIDTH: u16 = DAY_WIDTH * 7;

/// Number of lines taken up by the month title, the weekday header, and its
/// rule
const HEADER_LINES: u16 = 3;

const ACS_HLINE: char = '─';

/// Renders a [`MonthGrid`] centered in the available area.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct MonthCalendar;

impl StatefulWidget for MonthCalendar {
    type State = MonthGrid;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let week_qty = u16::try_from(state.weeks().len()).unwrap_or(u16::MAX);
        let height = HEADER_LINES.saturating_add(week_qty);
        let [area] = Layout::horizontal([MAIN_WIDTH.min(area.width)])
            .flex(Flex::Center)
            .areas(area);
        let [area] = Layout::vertical([height.min(area.height)])
            .flex(Flex::Center)
            .areas(area);
        let today = state.today();
        let mut canvas = BufferCanvas::new(area, buf);
        canvas.draw_title(state.year(), state.month());
        canvas.draw_header();
        for (i, week) in std::iter::zip(0u16.., state.weeks()) {
            for (wd, date) in week.enumerate() {
                canvas.draw_day(i, wd, date.show(date.date == today));
            }
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
struct BufferCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
}

impl<'a> BufferCanvas<'a> {
    fn new(area: Rect, buf: &'a mut Buffer) -> Self {
        Self { area, buf }
    }

    fn draw_title(&mut self, year: i32, month: Month) {
        let title = format!("{month} {year}");
        let width = u16::try_from(title.len()).unwrap_or(u16::MAX);
        let x = MAIN_WIDTH.saturating_sub(width) / 2;
        self.mvprint(0, x, title, Some(Style::new().bold()));
    }

    fn draw_header(&mut self) {
        self.mvprint(1, 0, HEADER, Some(Style::new().bold()));
        self.hline(2, 0, ACS_HLINE, MAIN_WIDTH);
    }

    fn draw_day(&mut self, week_no: u16, wd: Weekday, s: Span<'_>) {
        self.mvprint(
            week_no + HEADER_LINES,
            DAY_WIDTH * wd.index0(),
            s.content,
            Some(s.style),
        );
    }

    fn mvprint<S: AsRef<str>>(&mut self, y: u16, x: u16, s: S, style: Option<Style>) {
        if y < self.area.height && x < self.area.width {
            let text = Text::styled(s.as_ref(), style.unwrap_or_default());
            let width = u16::try_from(text.width()).unwrap_or(u16::MAX);
            // Using a Paragraph lets us truncate text that extends beyond the
            // calendar's area, though we need to be sure that the Rect passed
            // to the Paragraph is entirely within the frame lest a panic
            // result.
            Paragraph::new(text).render(
                Rect {
                    x: x + self.area.x,
                    y: y + self.area.y,
                    width: (self.area.width - x).min(width),
                    height: 1,
                },
                self.buf,
            );
        }
    }

    fn hline(&mut self, y: u16, x: u16, ch: char, length: u16) {
        self.mvprint(y, x, String::from(ch).repeat(length.into()), None);
    }
}
