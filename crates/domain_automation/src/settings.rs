//! Agent settings
//!
//! One settings record per installation: who the agent is (used in
//! message signatures), which automations run, and on which days before
//! expiry renewal reminders go out.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AutomationError;

/// Reminder offsets used when none are configured
pub const DEFAULT_REMINDER_DAYS: [u32; 4] = [30, 15, 7, 1];

/// Country code prepended to local numbers
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Largest reminder offset accepted
pub const MAX_REMINDER_DAYS: u32 = 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub agent_name: String,
    pub agency_name: Option<String>,
    pub agent_phone: Option<String>,
    pub agent_email: Option<String>,
    pub birthday_automation_enabled: bool,
    pub renewal_automation_enabled: bool,
    /// Days before a policy's end date on which reminders are sent, largest first
    pub renewal_reminder_days: Vec<u32>,
    pub whatsapp_enabled: bool,
    pub email_enabled: bool,
    pub default_country_code: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            agent_name: "Your Insurance Advisor".to_string(),
            agency_name: None,
            agent_phone: None,
            agent_email: None,
            birthday_automation_enabled: true,
            renewal_automation_enabled: true,
            renewal_reminder_days: DEFAULT_REMINDER_DAYS.to_vec(),
            whatsapp_enabled: true,
            email_enabled: true,
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub agent_name: Option<String>,
    pub agency_name: Option<String>,
    pub agent_phone: Option<String>,
    pub agent_email: Option<String>,
    pub birthday_automation_enabled: Option<bool>,
    pub renewal_automation_enabled: Option<bool>,
    pub renewal_reminder_days: Option<Vec<u32>>,
    pub whatsapp_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
    pub default_country_code: Option<String>,
}

fn optional_text(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

impl Settings {
    pub fn apply(mut self, update: SettingsUpdate) -> Result<Self, AutomationError> {
        if let Some(name) = update.agent_name {
            self.agent_name = name.trim().to_string();
        }
        if let Some(agency) = update.agency_name {
            self.agency_name = optional_text(agency);
        }
        if let Some(phone) = update.agent_phone {
            self.agent_phone = optional_text(phone);
        }
        if let Some(email) = update.agent_email {
            self.agent_email = optional_text(email).map(|e| e.to_lowercase());
        }
        if let Some(enabled) = update.birthday_automation_enabled {
            self.birthday_automation_enabled = enabled;
        }
        if let Some(enabled) = update.renewal_automation_enabled {
            self.renewal_automation_enabled = enabled;
        }
        if let Some(days) = update.renewal_reminder_days {
            self.renewal_reminder_days = normalize_reminder_days(days)?;
        }
        if let Some(enabled) = update.whatsapp_enabled {
            self.whatsapp_enabled = enabled;
        }
        if let Some(enabled) = update.email_enabled {
            self.email_enabled = enabled;
        }
        if let Some(code) = update.default_country_code {
            self.default_country_code = code.trim().trim_start_matches('+').to_string();
        }
        self.validate()?;
        self.updated_at = Utc::now();
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.agent_name.is_empty() {
            return Err(AutomationError::validation("agent name is required"));
        }
        let code = &self.default_country_code;
        if code.is_empty() || code.len() > 4 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AutomationError::validation(format!(
                "country code must be 1 to 4 digits, got '{}'",
                code
            )));
        }
        if let Some(ref email) = self.agent_email {
            if !domain_client::validation::is_valid_email(email) {
                return Err(AutomationError::validation(format!("invalid agent email '{}'", email)));
            }
        }
        Ok(())
    }

    /// The dates whose expiring policies get a reminder when run on `today`
    pub fn reminder_targets(&self, today: NaiveDate) -> Vec<(u32, NaiveDate)> {
        self.renewal_reminder_days
            .iter()
            .filter_map(|days| {
                today
                    .checked_add_days(Days::new(u64::from(*days)))
                    .map(|date| (*days, date))
            })
            .collect()
    }

    /// Signature line appended to emails
    pub fn signature(&self) -> String {
        let mut lines = vec![self.agent_name.clone()];
        lines.extend(self.agency_name.clone());
        lines.extend(self.agent_phone.clone());
        lines.join("\n")
    }
}

/// Sorts offsets largest first and drops duplicates
pub fn normalize_reminder_days(mut days: Vec<u32>) -> Result<Vec<u32>, AutomationError> {
    if let Some(bad) = days.iter().find(|d| **d > MAX_REMINDER_DAYS) {
        return Err(AutomationError::validation(format!(
            "reminder offset {} exceeds {} days",
            bad, MAX_REMINDER_DAYS
        )));
    }
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.renewal_reminder_days, vec![30, 15, 7, 1]);
        assert_eq!(settings.default_country_code, "91");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_reminder_days_normalized() {
        assert_eq!(normalize_reminder_days(vec![7, 30, 7, 0]).unwrap(), vec![30, 7, 0]);
        assert!(normalize_reminder_days(vec![400]).is_err());
    }

    #[test]
    fn test_apply_strips_plus_from_country_code() {
        let settings = Settings::default()
            .apply(SettingsUpdate {
                default_country_code: Some("+44".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.default_country_code, "44");

        let err = Settings::default().apply(SettingsUpdate {
            default_country_code: Some("uk".into()),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_reminder_targets() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let targets = Settings::default().reminder_targets(today);
        assert_eq!(targets[0], (30, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()));
        assert_eq!(targets[3], (1, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()));
    }
}
