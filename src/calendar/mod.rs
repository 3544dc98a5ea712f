mod month;
mod util;
mod widget;
pub(crate) use self::month::MonthGrid;
pub(crate) use self::widget::MonthCalendar;
use ratatui::style::Style;
use time::Date;

pub(crate) trait DateStyler {
    fn date_style(&self, date: Date) -> Style;
}
