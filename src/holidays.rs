use crate::calendar::DateStyler;
use crate::theme::{HOLIDAY_STYLE, SATURDAY_STYLE};
use ratatui::style::Style;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use time::{format_description::FormatItem, macros::format_description, Date, Month, Weekday};
use tracing::{debug, warn};

static YMD_FMT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Immutable set of holiday dates read from a line-based config file.
///
/// One date or rule per line: `YYYY-MM-DD` marks a single date, `MM-DD` marks
/// a date recurring every year.  `#` starts a comment.  Lookup failures of
/// any kind degrade to "not a holiday" rather than blocking the calendar.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Holidays {
    dates: HashSet<Date>,
    yearly: HashSet<(u8, u8)>,
}

impl Holidays {
    /// Reads the holiday set from `path`.  A missing or unreadable file
    /// yields an empty set.
    pub(crate) fn load(path: &Path) -> Holidays {
        match fs::read_to_string(path) {
            Ok(text) => Holidays::parse(&text),
            Err(e) => {
                warn!("cannot read holiday file {}: {e}", path.display());
                Holidays::default()
            }
        }
    }

    pub(crate) fn parse(text: &str) -> Holidays {
        let mut holidays = Holidays::default();
        for line in text.lines() {
            let entry = line.split('#').next().unwrap_or(line).trim();
            if entry.is_empty() {
                continue;
            }
            if let Ok(date) = Date::parse(entry, &YMD_FMT) {
                holidays.dates.insert(date);
            } else if let Some(md) = parse_month_day(entry) {
                holidays.yearly.insert(md);
            } else {
                warn!("skipping unparseable holiday entry {entry:?}");
            }
        }
        debug!(
            "loaded {} fixed and {} yearly holidays",
            holidays.dates.len(),
            holidays.yearly.len()
        );
        holidays
    }

    pub(crate) fn contains(&self, date: Date) -> bool {
        self.dates.contains(&date) || self.yearly.contains(&(u8::from(date.month()), date.day()))
    }
}

fn parse_month_day(s: &str) -> Option<(u8, u8)> {
    let (month, day) = s.split_once('-')?;
    let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
    let day = day.parse::<u8>().ok()?;
    (1..=31).contains(&day).then_some((u8::from(month), day))
}

/// Styles cells the way the desktop gadget's stylesheet did: Sundays and
/// holidays in red, Saturdays in blue.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct HolidayStyler {
    holidays: Holidays,
}

impl HolidayStyler {
    pub(crate) fn new(holidays: Holidays) -> HolidayStyler {
        HolidayStyler { holidays }
    }
}

impl DateStyler for HolidayStyler {
    fn date_style(&self, date: Date) -> Style {
        if self.holidays.contains(date) || date.weekday() == Weekday::Sunday {
            HOLIDAY_STYLE
        } else if date.weekday() == Weekday::Saturday {
            SATURDAY_STYLE
        } else {
            Style::new()
        }
    }
}
