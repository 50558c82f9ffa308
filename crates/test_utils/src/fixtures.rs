//! Test Fixtures
//!
//! Fixed values so that date arithmetic in tests is reproducible.

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money};
use domain_automation::{NewWhatsAppTemplate, Settings, TemplatePurpose};

/// Fixed dates
pub struct DateFixtures;

impl DateFixtures {
    /// The "today" most tests run against
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    pub fn policy_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    /// Last covered day of a 12-month term from [`Self::policy_start`]
    pub fn policy_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
    }

    /// A date of birth whose birthday is [`Self::today`]
    pub fn birthday_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(1985, 3, 1).unwrap()
    }

    pub fn leap_day_birth() -> NaiveDate {
        NaiveDate::from_ymd_opt(1992, 2, 29).unwrap()
    }
}

/// Contact details
pub struct ContactFixtures;

impl ContactFixtures {
    pub fn phone() -> &'static str {
        "98765 43210"
    }

    /// [`Self::phone`] with the default country code
    pub fn msisdn() -> &'static str {
        "919876543210"
    }

    pub fn email() -> &'static str {
        "asha.sharma@example.com"
    }
}

/// Premium amounts
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn annual_premium() -> Money {
        Money::new(dec!(12000), Currency::INR)
    }

    pub fn sum_insured() -> Money {
        Money::new(dec!(500000), Currency::INR)
    }
}

/// Automation configuration
pub struct AutomationFixtures;

impl AutomationFixtures {
    pub fn settings() -> Settings {
        Settings {
            agent_name: "Meera Iyer".to_string(),
            agency_name: Some("Iyer Insurance".to_string()),
            agent_phone: Some("9812345678".to_string()),
            agent_email: Some("meera@example.com".to_string()),
            ..Settings::default()
        }
    }

    pub fn birthday_template() -> NewWhatsAppTemplate {
        NewWhatsAppTemplate {
            name: "birthday".to_string(),
            provider_template: "crm_birthday".to_string(),
            language_code: None,
            namespace: None,
            purpose: TemplatePurpose::Birthday,
            body: "Happy birthday {{first_name}}! Best wishes from {{agent_name}}.".to_string(),
            variables: None,
        }
    }

    pub fn renewal_template() -> NewWhatsAppTemplate {
        NewWhatsAppTemplate {
            name: "renewal".to_string(),
            provider_template: "crm_renewal".to_string(),
            language_code: None,
            namespace: None,
            purpose: TemplatePurpose::RenewalReminder,
            body: "Hi {{first_name}}, policy {{policy_number}} ends on {{end_date}}.".to_string(),
            variables: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::calendar;

    #[test]
    fn test_policy_dates_are_consistent() {
        assert_eq!(
            calendar::term_end_date(DateFixtures::policy_start(), 12).unwrap(),
            DateFixtures::policy_end()
        );
    }

    #[test]
    fn test_settings_are_valid() {
        assert!(AutomationFixtures::settings().validate().is_ok());
    }
}
