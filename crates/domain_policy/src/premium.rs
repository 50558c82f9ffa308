//! Premium frequency and due dates

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::calendar;

use crate::error::PolicyError;

/// How often the premium is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumFrequency {
    Monthly,
    Quarterly,
    HalfYearly,
    #[default]
    Annual,
    /// One payment for the whole term
    Single,
}

impl PremiumFrequency {
    pub const ALL: [PremiumFrequency; 5] = [
        PremiumFrequency::Monthly,
        PremiumFrequency::Quarterly,
        PremiumFrequency::HalfYearly,
        PremiumFrequency::Annual,
        PremiumFrequency::Single,
    ];

    /// Returns the number of payments per year
    pub fn payments_per_year(&self) -> u32 {
        match self {
            PremiumFrequency::Monthly => 12,
            PremiumFrequency::Quarterly => 4,
            PremiumFrequency::HalfYearly => 2,
            PremiumFrequency::Annual => 1,
            PremiumFrequency::Single => 1,
        }
    }

    /// Multiplier turning one installment into a yearly figure
    pub fn annualization_factor(&self) -> Decimal {
        Decimal::from(self.payments_per_year())
    }

    /// Months between installments; `None` for single premium
    pub fn interval_months(&self) -> Option<u32> {
        match self {
            PremiumFrequency::Single => None,
            other => Some(12 / other.payments_per_year()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PremiumFrequency::Monthly => "monthly",
            PremiumFrequency::Quarterly => "quarterly",
            PremiumFrequency::HalfYearly => "half_yearly",
            PremiumFrequency::Annual => "annual",
            PremiumFrequency::Single => "single",
        }
    }

    /// First installment date on or after `from` for a schedule anchored at `start`
    ///
    /// Returns `None` for single premium once `start` has passed.
    pub fn next_due_date(&self, start: NaiveDate, from: NaiveDate) -> Option<NaiveDate> {
        if from <= start {
            return Some(start);
        }
        let interval = self.interval_months()?;
        let mut installment = 1u32;
        loop {
            let due = calendar::add_months(start, interval * installment).ok()?;
            if due >= from {
                return Some(due);
            }
            installment += 1;
        }
    }
}

impl fmt::Display for PremiumFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PremiumFrequency {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PremiumFrequency::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| PolicyError::validation(format!("unknown premium frequency '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_next_due_date_quarterly() {
        let start = d(2024, 1, 31);
        assert_eq!(PremiumFrequency::Quarterly.next_due_date(start, d(2024, 1, 1)), Some(start));
        assert_eq!(PremiumFrequency::Quarterly.next_due_date(start, d(2024, 2, 1)), Some(d(2024, 4, 30)));
        assert_eq!(PremiumFrequency::Quarterly.next_due_date(start, d(2024, 5, 1)), Some(d(2024, 7, 31)));
    }

    #[test]
    fn test_single_premium_has_no_later_installments() {
        let start = d(2024, 1, 1);
        assert_eq!(PremiumFrequency::Single.next_due_date(start, d(2024, 3, 1)), None);
        assert_eq!(PremiumFrequency::Single.interval_months(), None);
    }
}
