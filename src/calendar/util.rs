use ratatui::{style::Style, text::Span};
use time::{Weekday, Weekday::*};

const DAYS_IN_WEEK: usize = 7;

pub(super) trait WeekdayExt {
    fn index0(&self) -> u16;
}

impl WeekdayExt for Weekday {
    fn index0(&self) -> u16 {
        self.number_days_from_sunday().into()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct StyledDate {
    pub(crate) date: time::Date,
    pub(crate) style: Style,
}

impl StyledDate {
    pub(super) fn day(&self) -> u8 {
        self.date.day()
    }

    pub(super) fn show(&self, is_today: bool) -> Span<'static> {
        let s = if is_today {
            format!("[{:2}]", self.day())
        } else {
            format!(" {:2} ", self.day())
        };
        Span::styled(s, self.style)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
// Invariant: At least one element of the array is Some
pub(super) struct Week([Option<StyledDate>; DAYS_IN_WEEK]);

impl Week {
    pub(super) fn new(date: StyledDate) -> Self {
        let mut this = Week([None; DAYS_IN_WEEK]);
        this.set(date);
        this
    }

    pub(super) fn set(&mut self, date: StyledDate) {
        let i = usize::from(date.date.weekday().index0());
        assert!(i < DAYS_IN_WEEK, "weekday index should be less than 7");
        self.0[i] = Some(date);
    }

    pub(super) fn enumerate(&self) -> EnumerateWeek<'_> {
        EnumerateWeek::new(self)
    }

    pub(super) fn get(&self, wd: Weekday) -> Option<StyledDate> {
        self.0.get(usize::from(wd.index0())).copied().flatten()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct EnumerateWeek<'a> {
    week: &'a Week,
    next_weekday: Option<Weekday>,
}

impl<'a> EnumerateWeek<'a> {
    fn new(week: &'a Week) -> Self {
        EnumerateWeek {
            week,
            next_weekday: Some(Sunday),
        }
    }
}

impl Iterator for EnumerateWeek<'_> {
    type Item = (Weekday, StyledDate);

    fn next(&mut self) -> Option<(Weekday, StyledDate)> {
        loop {
            let Some(wd) = self.next_weekday else {
                return None;
            };
            self.next_weekday = match wd.next() {
                Sunday => None,
                wd2 => Some(wd2),
            };
            if let Some(date) = self.week.get(wd) {
                return Some((wd, date));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn plain(date: time::Date) -> StyledDate {
        StyledDate {
            date,
            style: Style::new(),
        }
    }

    #[test]
    fn test_enumerate_skips_empty_cells() {
        // 2023-11-16 is a Thursday
        let mut week = Week::new(plain(date!(2023 - 11 - 16)));
        week.set(plain(date!(2023 - 11 - 17)));
        let mut iter = week.enumerate().map(|(wd, sd)| (wd, sd.date));
        assert_eq!(iter.next(), Some((Thursday, date!(2023 - 11 - 16))));
        assert_eq!(iter.next(), Some((Friday, date!(2023 - 11 - 17))));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_show_brackets_today() {
        let sd = plain(date!(2023 - 11 - 16));
        assert_eq!(sd.show(true).content, "[16]");
        assert_eq!(sd.show(false).content, " 16 ");
    }

    #[test]
    fn test_show_pads_single_digits() {
        let sd = plain(date!(2023 - 11 - 05));
        assert_eq!(sd.show(true).content, "[ 5]");
        assert_eq!(sd.show(false).content, "  5 ");
    }
}
