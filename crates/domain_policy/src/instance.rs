//! Client policies
//!
//! A policy instance is one client's copy of a template: its own number,
//! period, premium and status.
//!
//! # Lifecycle
//!
//! ```text
//! Active -> Expired    (end date passed, set by the expiry sweep)
//! Active -> Cancelled
//! Active | Expired -> Renewed   (a new Active instance takes over)
//! ```

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::calendar;
use core_kernel::{ClientId, Money, PolicyInstanceId, PolicyTemplateId};

use crate::error::PolicyError;
use crate::premium::PremiumFrequency;
use crate::template::{validate_term, PolicyTemplate};

/// Policy lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    #[default]
    Active,
    Expired,
    Cancelled,
    Renewed,
}

impl PolicyStatus {
    pub const ALL: [PolicyStatus; 4] = [
        PolicyStatus::Active,
        PolicyStatus::Expired,
        PolicyStatus::Cancelled,
        PolicyStatus::Renewed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Cancelled => "cancelled",
            PolicyStatus::Renewed => "renewed",
        }
    }

    pub fn is_renewable(&self) -> bool {
        matches!(self, PolicyStatus::Active | PolicyStatus::Expired)
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyStatus {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PolicyError::validation(format!("unknown policy status '{}'", s)))
    }
}

/// A client's policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInstance {
    pub id: PolicyInstanceId,
    pub policy_number: String,
    pub client_id: ClientId,
    pub template_id: PolicyTemplateId,
    pub start_date: NaiveDate,
    /// Last covered day (inclusive)
    pub end_date: NaiveDate,
    /// Installment amount per `premium_frequency`
    pub premium: Money,
    pub sum_insured: Option<Money>,
    pub premium_frequency: PremiumFrequency,
    pub status: PolicyStatus,
    pub notes: Option<String>,
    /// The policy this one renewed
    pub renewed_from: Option<PolicyInstanceId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for issuing a policy from a template; `None` fields take the template default
#[derive(Debug, Clone)]
pub struct NewPolicyInstance {
    pub policy_number: String,
    pub client_id: ClientId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub term_months: Option<u32>,
    pub premium: Option<Money>,
    pub sum_insured: Option<Money>,
    pub premium_frequency: Option<PremiumFrequency>,
    pub notes: Option<String>,
}

/// Partial update of a policy; status changes go through renew/cancel
#[derive(Debug, Clone, Default)]
pub struct PolicyInstanceUpdate {
    pub policy_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub premium: Option<Money>,
    pub sum_insured: Option<Money>,
    pub premium_frequency: Option<PremiumFrequency>,
    pub notes: Option<String>,
}

/// Options for a renewal
#[derive(Debug, Clone, Default)]
pub struct RenewalRequest {
    /// Number for the new policy; derived from the old one when absent
    pub policy_number: Option<String>,
    pub premium: Option<Money>,
    pub sum_insured: Option<Money>,
    pub notes: Option<String>,
}

impl PolicyInstance {
    /// Issues a policy for a client from `template`
    ///
    /// Premium, sum insured, frequency and term are copied from the template
    /// unless `input` overrides them. An explicit end date wins over a term.
    pub fn from_template(template: &PolicyTemplate, input: NewPolicyInstance) -> Result<Self, PolicyError> {
        if !template.is_active {
            return Err(PolicyError::TemplateInactive(template.name.clone()));
        }
        let end_date = match input.end_date {
            Some(end) => end,
            None => {
                let months = input.term_months.unwrap_or(template.default_term_months);
                validate_term(months)?;
                calendar::term_end_date(input.start_date, months)?
            }
        };

        let now = Utc::now();
        let policy = Self {
            id: PolicyInstanceId::new(),
            policy_number: input.policy_number.trim().to_string(),
            client_id: input.client_id,
            template_id: template.id,
            start_date: input.start_date,
            end_date,
            premium: input.premium.unwrap_or(template.default_premium),
            sum_insured: input.sum_insured.or(template.default_sum_insured),
            premium_frequency: input.premium_frequency.unwrap_or(template.premium_frequency),
            status: PolicyStatus::Active,
            notes: input.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            renewed_from: None,
            created_at: now,
            updated_at: now,
        };
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.policy_number.is_empty() {
            return Err(PolicyError::MissingRequiredField("policy_number".into()));
        }
        if self.end_date <= self.start_date {
            return Err(PolicyError::InvalidPeriod {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if !self.premium.is_positive() {
            return Err(PolicyError::validation("premium must be positive"));
        }
        if let Some(sum_insured) = self.sum_insured {
            if !sum_insured.is_positive() {
                return Err(PolicyError::validation("sum insured must be positive"));
            }
        }
        Ok(())
    }

    pub fn apply(mut self, update: PolicyInstanceUpdate) -> Result<Self, PolicyError> {
        if let Some(number) = update.policy_number {
            self.policy_number = number.trim().to_string();
        }
        if let Some(start) = update.start_date {
            self.start_date = start;
        }
        if let Some(end) = update.end_date {
            self.end_date = end;
        }
        if let Some(premium) = update.premium {
            self.premium = premium;
        }
        if update.sum_insured.is_some() {
            self.sum_insured = update.sum_insured;
        }
        if let Some(frequency) = update.premium_frequency {
            self.premium_frequency = frequency;
        }
        if let Some(notes) = update.notes {
            let notes = notes.trim().to_string();
            self.notes = (!notes.is_empty()).then_some(notes);
        }
        self.updated_at = Utc::now();
        self.validate()?;
        Ok(self)
    }

    /// Term length in whole months
    pub fn term_months(&self) -> Result<u32, PolicyError> {
        Ok(calendar::months_between(self.start_date, self.end_date)?)
    }

    /// Renews the policy
    ///
    /// This instance becomes `Renewed`; the returned instance is `Active`,
    /// starts the day after this one ends and runs for the same number of
    /// months.
    pub fn renew(&mut self, request: RenewalRequest) -> Result<PolicyInstance, PolicyError> {
        if !self.status.is_renewable() {
            return Err(PolicyError::InvalidStateTransition {
                from: self.status,
                to: PolicyStatus::Renewed,
            });
        }

        let months = self.term_months()?;
        let start_date = self
            .end_date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| PolicyError::validation("end date out of range"))?;
        let end_date = calendar::term_end_date(start_date, months)?;

        let now = Utc::now();
        let renewed = PolicyInstance {
            id: PolicyInstanceId::new(),
            policy_number: request
                .policy_number
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| renewal_number(&self.policy_number)),
            client_id: self.client_id,
            template_id: self.template_id,
            start_date,
            end_date,
            premium: request.premium.unwrap_or(self.premium),
            sum_insured: request.sum_insured.or(self.sum_insured),
            premium_frequency: self.premium_frequency,
            status: PolicyStatus::Active,
            notes: request.notes.or_else(|| self.notes.clone()),
            renewed_from: Some(self.id),
            created_at: now,
            updated_at: now,
        };
        renewed.validate()?;

        self.status = PolicyStatus::Renewed;
        self.updated_at = now;
        Ok(renewed)
    }

    /// Cancels an active policy
    pub fn cancel(&mut self) -> Result<(), PolicyError> {
        if self.status != PolicyStatus::Active {
            return Err(PolicyError::InvalidStateTransition {
                from: self.status,
                to: PolicyStatus::Cancelled,
            });
        }
        self.status = PolicyStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether cover has lapsed by `date` (the end date itself is still covered)
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.end_date < date
    }

    /// Marks an active policy expired once its end date has passed
    ///
    /// Returns whether the status changed.
    pub fn expire_if_overdue(&mut self, today: NaiveDate) -> bool {
        if self.status == PolicyStatus::Active && self.is_expired_on(today) {
            self.status = PolicyStatus::Expired;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// Days from `today` to the end date; negative once expired
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        calendar::days_until(today, self.end_date)
    }

    /// Whether the policy is active and ends within `days` of `today`
    pub fn is_expiring_within(&self, today: NaiveDate, days: u32) -> bool {
        let remaining = self.days_until_expiry(today);
        self.status == PolicyStatus::Active && (0..=i64::from(days)).contains(&remaining)
    }

    /// Premium per year, whatever the installment frequency
    pub fn annualized_premium(&self) -> Money {
        self.premium.multiply(self.premium_frequency.annualization_factor())
    }

    /// Next installment date on or after `today`, within the policy period
    pub fn next_premium_due(&self, today: NaiveDate) -> Option<NaiveDate> {
        if self.status != PolicyStatus::Active {
            return None;
        }
        self.premium_frequency
            .next_due_date(self.start_date, today)
            .filter(|due| *due <= self.end_date)
    }
}

/// Number for a renewal: `ABC123` → `ABC123-R1`, `ABC123-R1` → `ABC123-R2`
pub fn renewal_number(policy_number: &str) -> String {
    if let Some((base, suffix)) = policy_number.rsplit_once("-R") {
        if let Ok(n) = suffix.parse::<u32>() {
            return format!("{}-R{}", base, n + 1);
        }
    }
    format!("{}-R1", policy_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewal_number() {
        assert_eq!(renewal_number("LIC-778812"), "LIC-778812-R1");
        assert_eq!(renewal_number("LIC-778812-R1"), "LIC-778812-R2");
        assert_eq!(renewal_number("HDFC-R9"), "HDFC-R10");
        assert_eq!(renewal_number("SBI-Rx"), "SBI-Rx-R1");
    }

    #[test]
    fn test_status_parse() {
        for status in PolicyStatus::ALL {
            assert_eq!(status.as_str().parse::<PolicyStatus>().unwrap(), status);
        }
    }
}
