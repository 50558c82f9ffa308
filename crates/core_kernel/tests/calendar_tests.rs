//! Tests for the calendar helpers used by reminders and policy terms

use chrono::NaiveDate;
use core_kernel::calendar::{
    add_months, birthday_within, days_until, is_birthday_on, is_leap_year, next_birthday,
    start_of_month, term_end_date, Timezone,
};
use proptest::prelude::*;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn test_leap_years() {
    assert!(is_leap_year(2024));
    assert!(is_leap_year(2000));
    assert!(!is_leap_year(1900));
    assert!(!is_leap_year(2025));
}

#[test]
fn test_next_birthday_wraps_to_next_year() {
    assert_eq!(next_birthday(d(1980, 1, 10), d(2024, 12, 30)), Some(d(2025, 1, 10)));
    assert_eq!(next_birthday(d(1980, 12, 30), d(2024, 12, 30)), Some(d(2024, 12, 30)));
}

#[test]
fn test_next_birthday_for_leap_day() {
    assert_eq!(next_birthday(d(2000, 2, 29), d(2025, 1, 1)), Some(d(2025, 2, 28)));
    assert_eq!(next_birthday(d(2000, 2, 29), d(2028, 1, 1)), Some(d(2028, 2, 29)));
}

#[test]
fn test_birthday_within_window() {
    let dob = d(1990, 3, 5);
    assert_eq!(birthday_within(dob, d(2024, 3, 1), 7), Some(d(2024, 3, 5)));
    assert_eq!(birthday_within(dob, d(2024, 3, 1), 4), None);
}

#[test]
fn test_add_months_clamps_to_month_end() {
    assert_eq!(add_months(d(2023, 1, 31), 1).unwrap(), d(2023, 2, 28));
    assert_eq!(add_months(d(2024, 8, 31), 1).unwrap(), d(2024, 9, 30));
}

#[test]
fn test_start_of_month() {
    assert_eq!(start_of_month(d(2024, 7, 19)), d(2024, 7, 1));
}

#[test]
fn test_days_until_is_signed() {
    assert_eq!(days_until(d(2024, 1, 1), d(2024, 1, 31)), 30);
    assert_eq!(days_until(d(2024, 1, 31), d(2024, 1, 1)), -30);
}

#[test]
fn test_timezone_parse_and_local_date() {
    use chrono::{TimeZone, Utc};

    let tz: Timezone = "Asia/Kolkata".parse().unwrap();
    // 20:00 UTC is already the next day in India (UTC+05:30)
    let instant = Utc.with_ymd_and_hms(2024, 6, 30, 20, 0, 0).unwrap();
    assert_eq!(tz.local_date(instant), d(2024, 7, 1));
    assert!("Nowhere/Special".parse::<Timezone>().is_err());
}

proptest! {
    #[test]
    fn prop_next_birthday_is_a_birthday_and_not_in_the_past(
        year in 1940i32..2010,
        ordinal in 1u32..366,
        from_offset in 0i64..20_000,
    ) {
        let dob = NaiveDate::from_yo_opt(year, ordinal).unwrap();
        let from = d(2010, 1, 1) + chrono::Duration::days(from_offset);
        let next = next_birthday(dob, from).unwrap();

        prop_assert!(next >= from);
        prop_assert!(is_birthday_on(dob, next));
        prop_assert!(days_until(from, next) <= 366);
    }

    #[test]
    fn prop_term_end_is_after_start(
        ordinal in 1u32..366,
        months in 1u32..240,
    ) {
        let start = NaiveDate::from_yo_opt(2023, ordinal).unwrap();
        let end = term_end_date(start, months).unwrap();
        prop_assert!(end > start);
    }
}

#[test]
fn test_day_bounds_in_local_zone() {
    use chrono::{TimeZone, Utc};

    let tz: Timezone = "Asia/Kolkata".parse().unwrap();
    let (start, end) = tz.day_bounds(d(2024, 7, 1)).unwrap();
    assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 30, 18, 30, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2024, 7, 1, 18, 30, 0).unwrap());
}
