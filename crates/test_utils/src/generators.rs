//! Property-Based Test Generators
//!
//! proptest strategies producing values the domain accepts.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use domain_client::{LeadSource, LeadStatus};
use domain_policy::PremiumFrequency;

/// Ten-digit Indian mobile numbers, optionally formatted
pub fn phone_strategy() -> impl Strategy<Value = String> {
    ("[6-9][0-9]{9}", prop::bool::ANY).prop_map(|(digits, spaced)| {
        if spaced {
            format!("{} {}", &digits[..5], &digits[5..])
        } else {
            digits
        }
    })
}

pub fn person_name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,11}"
}

pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{3,10}", "[a-z]{3,8}").prop_map(|(user, domain)| format!("{}@{}.com", user, domain))
}

/// Any date from 1940 through 2060, leap days included
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1940, 1, 1).unwrap();
    (0u64..(121 * 366)).prop_map(move |offset| base + Days::new(offset))
}

/// Dates of birth for adult clients
pub fn date_of_birth_strategy() -> impl Strategy<Value = NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1940, 1, 1).unwrap();
    (0u64..(65 * 365)).prop_map(move |offset| base + Days::new(offset))
}

/// Premiums from 1 to 10 lakh rupees, two decimal places
pub fn premium_strategy() -> impl Strategy<Value = Money> {
    (100i64..100_000_000i64).prop_map(|paise| Money::new(Decimal::new(paise, 2), Currency::INR))
}

pub fn term_months_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![Just(12u32), Just(24), Just(36), 1u32..=600]
}

pub fn lead_status_strategy() -> impl Strategy<Value = LeadStatus> {
    prop::sample::select(LeadStatus::ALL.to_vec())
}

pub fn lead_source_strategy() -> impl Strategy<Value = LeadSource> {
    prop::sample::select(LeadSource::ALL.to_vec())
}

pub fn premium_frequency_strategy() -> impl Strategy<Value = PremiumFrequency> {
    prop_oneof![
        Just(PremiumFrequency::Monthly),
        Just(PremiumFrequency::Quarterly),
        Just(PremiumFrequency::HalfYearly),
        Just(PremiumFrequency::Annual),
        Just(PremiumFrequency::Single),
    ]
}
