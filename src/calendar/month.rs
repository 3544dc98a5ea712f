use super::util::{StyledDate, Week};
use super::DateStyler;
use std::iter::successors;
use time::{Date, Month, Weekday};

/// One calendar month's worth of styled weeks, anchored on the date the
/// widget currently treats as "today".
///
/// A grid is immutable once built; the date crossover replaces it wholesale
/// rather than patching cells, so rendering never consults the styler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MonthGrid {
    today: Date,
    weeks: Vec<Week>,
}

impl MonthGrid {
    pub(crate) fn new<S: DateStyler>(today: Date, styler: &S) -> MonthGrid {
        let first = today.replace_day(1).expect("every month has a day 1");
        let mut weeks: Vec<Week> = Vec::with_capacity(6);
        for date in iter_month_days(first) {
            let styled = StyledDate {
                date,
                style: styler.date_style(date),
            };
            match weeks.last_mut() {
                Some(week) if date.weekday() != Weekday::Sunday => week.set(styled),
                _ => weeks.push(Week::new(styled)),
            }
        }
        MonthGrid { today, weeks }
    }

    pub(crate) fn today(&self) -> Date {
        self.today
    }

    pub(super) fn month(&self) -> Month {
        self.today.month()
    }

    pub(super) fn year(&self) -> i32 {
        self.today.year()
    }

    pub(super) fn weeks(&self) -> &[Week] {
        &self.weeks
    }
}

fn iter_month_days(first: Date) -> impl Iterator<Item = Date> {
    successors(Some(first), |&d| d.next_day()).take_while(move |d| d.month() == first.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Style;
    use time::macros::date;
    use time::Weekday::*;

    struct NullStyler;

    impl DateStyler for NullStyler {
        fn date_style(&self, _date: Date) -> Style {
            Style::new()
        }
    }

    fn cell(grid: &MonthGrid, week: usize, wd: Weekday) -> Option<Date> {
        grid.weeks()[week].get(wd).map(|sd| sd.date)
    }

    #[test]
    fn test_month_starting_midweek() {
        // January 2025 starts on a Wednesday and spans five weeks
        let grid = MonthGrid::new(date!(2025 - 01 - 22), &NullStyler);
        assert_eq!(grid.today(), date!(2025 - 01 - 22));
        assert_eq!(grid.weeks().len(), 5);
        assert_eq!(cell(&grid, 0, Sunday), None);
        assert_eq!(cell(&grid, 0, Tuesday), None);
        assert_eq!(cell(&grid, 0, Wednesday), Some(date!(2025 - 01 - 01)));
        assert_eq!(cell(&grid, 0, Saturday), Some(date!(2025 - 01 - 04)));
        assert_eq!(cell(&grid, 1, Sunday), Some(date!(2025 - 01 - 05)));
        assert_eq!(cell(&grid, 3, Wednesday), Some(date!(2025 - 01 - 22)));
        assert_eq!(cell(&grid, 4, Friday), Some(date!(2025 - 01 - 31)));
        assert_eq!(cell(&grid, 4, Saturday), None);
    }

    #[test]
    fn test_month_starting_on_sunday() {
        // June 2025 starts on a Sunday; 30 days fill five exact-then-partial weeks
        let grid = MonthGrid::new(date!(2025 - 06 - 15), &NullStyler);
        assert_eq!(grid.weeks().len(), 5);
        assert_eq!(cell(&grid, 0, Sunday), Some(date!(2025 - 06 - 01)));
        assert_eq!(cell(&grid, 4, Sunday), Some(date!(2025 - 06 - 29)));
        assert_eq!(cell(&grid, 4, Monday), Some(date!(2025 - 06 - 30)));
        assert_eq!(cell(&grid, 4, Tuesday), None);
    }

    #[test]
    fn test_four_week_february() {
        // February 2026: 28 days starting on a Sunday
        let grid = MonthGrid::new(date!(2026 - 02 - 01), &NullStyler);
        assert_eq!(grid.weeks().len(), 4);
        assert_eq!(cell(&grid, 0, Sunday), Some(date!(2026 - 02 - 01)));
        assert_eq!(cell(&grid, 3, Saturday), Some(date!(2026 - 02 - 28)));
    }

    #[test]
    fn test_rebuilt_grid_marks_holiday_cells() {
        use crate::holidays::{HolidayStyler, Holidays};
        use crate::theme::{HOLIDAY_STYLE, SATURDAY_STYLE};
        let styler = HolidayStyler::new(Holidays::parse("2025-01-13\n"));
        let grid = MonthGrid::new(date!(2025 - 01 - 22), &styler);
        let week = &grid.weeks()[2]; // Jan 12 – Jan 18
        let monday = week.get(Monday).unwrap();
        assert_eq!(monday.date, date!(2025 - 01 - 13));
        assert_eq!(monday.style, HOLIDAY_STYLE);
        assert_eq!(week.get(Sunday).unwrap().style, HOLIDAY_STYLE);
        assert_eq!(week.get(Saturday).unwrap().style, SATURDAY_STYLE);
        assert_eq!(week.get(Tuesday).unwrap().style, Style::new());
    }

    #[test]
    fn test_every_day_appears_exactly_once() {
        let grid = MonthGrid::new(date!(2024 - 02 - 29), &NullStyler);
        let days: Vec<u8> = grid
            .weeks()
            .iter()
            .flat_map(|week| week.enumerate().map(|(_, sd)| sd.date.day()))
            .collect();
        assert_eq!(days, (1..=29).collect::<Vec<u8>>());
    }
}
