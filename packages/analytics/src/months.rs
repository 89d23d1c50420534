//! Calendar month stepping for the trailing trend window.

use chrono::{Datelike as _, Days, Months, NaiveDate};

/// Number of months in the trend window.
pub const TREND_MONTHS: u32 = 12;

/// First day of the month containing `date`.
#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after `month`.
///
/// Steps through day 28 plus four days and truncates to the 1st, which
/// lands in the following month regardless of month length.
#[must_use]
pub fn next_month(month: NaiveDate) -> NaiveDate {
    let day_28 = month.with_day(28).unwrap_or(month);
    month_start(day_28 + Days::new(4))
}

/// The first days of the `count` months ending with the month of `today`,
/// oldest first.
#[must_use]
pub fn trailing_months(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    if count == 0 {
        return Vec::new();
    }

    let end = month_start(today);
    let mut current = end
        .checked_sub_months(Months::new(count - 1))
        .unwrap_or(end);

    let mut months = Vec::with_capacity(count as usize);
    while current <= end {
        months.push(current);
        current = next_month(current);
    }
    months
}

/// Formats a month as its `YYYY-MM` key.
#[must_use]
pub fn month_key(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn next_month_crosses_february_and_year_end() {
        assert_eq!(next_month(date(2024, 1, 1)), date(2024, 2, 1));
        assert_eq!(next_month(date(2024, 2, 1)), date(2024, 3, 1));
        assert_eq!(next_month(date(2023, 2, 1)), date(2023, 3, 1));
        assert_eq!(next_month(date(2024, 12, 1)), date(2025, 1, 1));
        assert_eq!(next_month(date(2024, 1, 31)), date(2024, 2, 1));
    }

    #[test]
    fn trailing_window_is_twelve_months_ending_today() {
        let months = trailing_months(date(2025, 3, 15), TREND_MONTHS);
        let keys: Vec<String> = months.into_iter().map(month_key).collect();

        assert_eq!(keys.len(), 12);
        assert_eq!(keys.first().map(String::as_str), Some("2024-04"));
        assert_eq!(keys.last().map(String::as_str), Some("2025-03"));
    }

    #[test]
    fn trailing_window_from_month_end() {
        let months = trailing_months(date(2025, 1, 31), TREND_MONTHS);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], date(2024, 2, 1));
        assert_eq!(months[11], date(2025, 1, 1));
    }

    #[test]
    fn empty_window() {
        assert!(trailing_months(date(2025, 1, 1), 0).is_empty());
    }
}
