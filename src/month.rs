//! Calendar month arithmetic shared by budgets and trends.
//!
//! Budget math works on whole months: every budget date is normalized to
//! the first day of its month, and reports walk month by month.

use time::{Date, Month};

use crate::Error;

/// The first day of `date`'s month.
pub fn month_start(date: Date) -> Date {
    date.replace_day(1).unwrap()
}

/// The first day of the month after `date`'s month.
pub fn next_month(date: Date) -> Date {
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        month => (date.year(), month.next()),
    };

    Date::from_calendar_date(year, month, 1).unwrap()
}

/// The first day of the month before `date`'s month.
pub fn previous_month(date: Date) -> Date {
    let (year, month) = match date.month() {
        Month::January => (date.year() - 1, Month::December),
        month => (date.year(), month.previous()),
    };

    Date::from_calendar_date(year, month, 1).unwrap()
}

/// The last day of `date`'s month.
pub fn month_end(date: Date) -> Date {
    next_month(date).previous_day().unwrap()
}

/// The first day of the given calendar month.
///
/// # Errors
/// Returns [Error::Validation] if `month` is not in 1..=12.
pub fn first_of_month(year: i32, month: u8) -> Result<Date, Error> {
    let month = Month::try_from(month)
        .map_err(|_| Error::Validation(format!("{month} is not a valid month number")))?;

    Date::from_calendar_date(year, month, 1)
        .map_err(|_| Error::Validation(format!("{year}-{month} is not a valid month")))
}

/// The number of whole calendar months from `from`'s month to `to`'s month.
///
/// Negative when `to` is in an earlier month than `from`.
pub fn months_between(from: Date, to: Date) -> i64 {
    let years = i64::from(to.year()) - i64::from(from.year());
    let months = i64::from(u8::from(to.month())) - i64::from(u8::from(from.month()));

    years * 12 + months
}

/// The first day of every month from `start`'s month through `end`'s month,
/// inclusive.
pub fn months_inclusive(start: Date, end: Date) -> Vec<Date> {
    let mut months = Vec::new();
    let mut month = month_start(start);
    let last = month_start(end);

    while month <= last {
        months.push(month);
        month = next_month(month);
    }

    months
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::{
        first_of_month, month_end, month_start, months_between, months_inclusive, next_month,
        previous_month,
    };

    #[test]
    fn month_start_resets_day() {
        assert_eq!(month_start(date!(2024 - 03 - 17)), date!(2024 - 03 - 01));
        assert_eq!(month_start(date!(2024 - 03 - 01)), date!(2024 - 03 - 01));
    }

    #[test]
    fn next_month_rolls_over_year() {
        assert_eq!(next_month(date!(2024 - 12 - 15)), date!(2025 - 01 - 01));
        assert_eq!(next_month(date!(2024 - 01 - 31)), date!(2024 - 02 - 01));
    }

    #[test]
    fn previous_month_rolls_back_year() {
        assert_eq!(previous_month(date!(2024 - 01 - 15)), date!(2023 - 12 - 01));
        assert_eq!(previous_month(date!(2024 - 03 - 31)), date!(2024 - 02 - 01));
    }

    #[test]
    fn month_end_handles_leap_years() {
        assert_eq!(month_end(date!(2024 - 02 - 10)), date!(2024 - 02 - 29));
        assert_eq!(month_end(date!(2023 - 02 - 10)), date!(2023 - 02 - 28));
        assert_eq!(month_end(date!(2024 - 04 - 01)), date!(2024 - 04 - 30));
    }

    #[test]
    fn months_between_spans_years() {
        assert_eq!(
            months_between(date!(2024 - 01 - 01), date!(2024 - 04 - 01)),
            3
        );
        assert_eq!(
            months_between(date!(2023 - 11 - 01), date!(2024 - 02 - 01)),
            3
        );
        assert_eq!(
            months_between(date!(2024 - 04 - 01), date!(2024 - 01 - 01)),
            -3
        );
        assert_eq!(
            months_between(date!(2024 - 01 - 01), date!(2024 - 01 - 31)),
            0
        );
    }

    #[test]
    fn months_inclusive_includes_both_ends() {
        let months = months_inclusive(date!(2024 - 11 - 15), date!(2025 - 02 - 03));

        assert_eq!(
            months,
            vec![
                date!(2024 - 11 - 01),
                date!(2024 - 12 - 01),
                date!(2025 - 01 - 01),
                date!(2025 - 02 - 01),
            ]
        );
    }

    #[test]
    fn first_of_month_rejects_invalid_month() {
        assert!(first_of_month(2024, 13).is_err());
        assert_eq!(first_of_month(2024, 2).unwrap(), date!(2024 - 02 - 01));
    }
}
