//! Calendar helpers
//!
//! Birthday greetings and renewal reminders are date-driven, and "today"
//! has to be the agent's local today rather than the server's UTC date.
//! Everything here works on `NaiveDate` once the local date is known.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper for the agent's locale
///
/// Wraps `chrono_tz::Tz` with string serialization (`"Asia/Kolkata"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| CalendarError::InvalidTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Returns the IANA name of the zone
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Converts a UTC instant to the local calendar date
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// The local calendar date right now
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    /// UTC instants bounding the local calendar day: `[start, end)`
    pub fn day_bounds(&self, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| CalendarError::OutOfRange(date.to_string()))?;
        Ok((self.start_of_day(date)?, self.start_of_day(next)?))
    }

    fn start_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        date.and_hms_opt(0, 0, 0)
            .and_then(|midnight| midnight.and_local_timezone(self.0).earliest())
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| CalendarError::OutOfRange(format!("midnight of {} in {}", date, self.name())))
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Asia::Kolkata)
    }
}

/// Errors related to calendar arithmetic
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Date out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid date range: {start} is not before {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Returns true for Gregorian leap years
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Whether `date` is the birthday of someone born on `date_of_birth`
///
/// People born on 29 February are greeted on 28 February in common years.
pub fn is_birthday_on(date_of_birth: NaiveDate, date: NaiveDate) -> bool {
    if date < date_of_birth {
        return false;
    }
    if date_of_birth.month() == date.month() && date_of_birth.day() == date.day() {
        return true;
    }
    date_of_birth.month() == 2
        && date_of_birth.day() == 29
        && date.month() == 2
        && date.day() == 28
        && !is_leap_year(date.year())
}

/// The first date on or after `from` that is a birthday for `date_of_birth`
pub fn next_birthday(date_of_birth: NaiveDate, from: NaiveDate) -> Option<NaiveDate> {
    let start = if from < date_of_birth { date_of_birth } else { from };
    (start.year()..=start.year() + 1)
        .filter_map(|year| birthday_in_year(date_of_birth, year))
        .find(|candidate| *candidate >= start)
}

fn birthday_in_year(date_of_birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, date_of_birth.month(), date_of_birth.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
}

/// Returns the birthday falling within `days` days of `from` (inclusive of
/// `from`, exclusive of `from + days`), if any
pub fn birthday_within(date_of_birth: NaiveDate, from: NaiveDate, days: u32) -> Option<NaiveDate> {
    let next = next_birthday(date_of_birth, from)?;
    (days_until(from, next) < i64::from(days)).then_some(next)
}

/// Completed years of age on `date`
pub fn age_on(date_of_birth: NaiveDate, date: NaiveDate) -> i32 {
    let mut age = date.year() - date_of_birth.year();
    if (date.month(), date.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Signed number of days from `from` to `to`
pub fn days_until(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Adds calendar months, clamping to the last day of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, CalendarError> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| CalendarError::OutOfRange(format!("{} + {} months", date, months)))
}

/// Last covered day of a term of `months` starting on `start`
///
/// A 12-month term starting 2024-04-01 ends on 2025-03-31.
pub fn term_end_date(start: NaiveDate, months: u32) -> Result<NaiveDate, CalendarError> {
    add_months(start, months)?
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| CalendarError::OutOfRange(format!("{} - 1 day", start)))
}

/// Number of whole months between two dates, used to carry a term over on renewal
pub fn months_between(start: NaiveDate, end_inclusive: NaiveDate) -> Result<u32, CalendarError> {
    let end = end_inclusive
        .checked_add_days(Days::new(1))
        .ok_or_else(|| CalendarError::OutOfRange(end_inclusive.to_string()))?;
    if end <= start {
        return Err(CalendarError::InvalidRange { start, end: end_inclusive });
    }
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() && add_months(start, months as u32)? > end {
        months -= 1;
    }
    Ok(months.max(1) as u32)
}

/// First day of the month containing `date`
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
