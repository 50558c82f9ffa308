//! Policy templates
//!
//! A template is the agent's master definition of a product they sell:
//! insurer, type, and the default premium, cover and term that a new
//! client policy starts from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{Money, PolicyTemplateId};

use crate::error::PolicyError;
use crate::premium::PremiumFrequency;

/// Longest supported term (50 years)
pub const MAX_TERM_MONTHS: u32 = 600;

/// Line of business
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    Life,
    Term,
    Health,
    Motor,
    Home,
    Travel,
    Other,
}

impl PolicyType {
    pub const ALL: [PolicyType; 7] = [
        PolicyType::Life,
        PolicyType::Term,
        PolicyType::Health,
        PolicyType::Motor,
        PolicyType::Home,
        PolicyType::Travel,
        PolicyType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Life => "life",
            PolicyType::Term => "term",
            PolicyType::Health => "health",
            PolicyType::Motor => "motor",
            PolicyType::Home => "home",
            PolicyType::Travel => "travel",
            PolicyType::Other => "other",
        }
    }

    /// Human-readable label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            PolicyType::Life => "Life Insurance",
            PolicyType::Term => "Term Insurance",
            PolicyType::Health => "Health Insurance",
            PolicyType::Motor => "Motor Insurance",
            PolicyType::Home => "Home Insurance",
            PolicyType::Travel => "Travel Insurance",
            PolicyType::Other => "Insurance",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PolicyError::validation(format!("unknown policy type '{}'", s)))
    }
}

/// Master policy definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTemplate {
    pub id: PolicyTemplateId,
    pub name: String,
    pub insurer: String,
    pub policy_type: PolicyType,
    pub description: Option<String>,
    pub default_premium: Money,
    pub default_sum_insured: Option<Money>,
    pub default_term_months: u32,
    pub premium_frequency: PremiumFrequency,
    /// Inactive templates stay for existing policies but are hidden from pickers
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a template
#[derive(Debug, Clone)]
pub struct NewPolicyTemplate {
    pub name: String,
    pub insurer: String,
    pub policy_type: PolicyType,
    pub description: Option<String>,
    pub default_premium: Money,
    pub default_sum_insured: Option<Money>,
    pub default_term_months: u32,
    pub premium_frequency: PremiumFrequency,
}

/// Partial update of a template
#[derive(Debug, Clone, Default)]
pub struct PolicyTemplateUpdate {
    pub name: Option<String>,
    pub insurer: Option<String>,
    pub policy_type: Option<PolicyType>,
    pub description: Option<String>,
    pub default_premium: Option<Money>,
    pub default_sum_insured: Option<Money>,
    pub default_term_months: Option<u32>,
    pub premium_frequency: Option<PremiumFrequency>,
    pub is_active: Option<bool>,
}

impl PolicyTemplate {
    pub fn new(input: NewPolicyTemplate) -> Result<Self, PolicyError> {
        let now = Utc::now();
        let template = Self {
            id: PolicyTemplateId::new(),
            name: input.name.trim().to_string(),
            insurer: input.insurer.trim().to_string(),
            policy_type: input.policy_type,
            description: input.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            default_premium: input.default_premium,
            default_sum_insured: input.default_sum_insured,
            default_term_months: input.default_term_months,
            premium_frequency: input.premium_frequency,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        template.validate()?;
        Ok(template)
    }

    pub fn apply(mut self, update: PolicyTemplateUpdate) -> Result<Self, PolicyError> {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(insurer) = update.insurer {
            self.insurer = insurer.trim().to_string();
        }
        if let Some(policy_type) = update.policy_type {
            self.policy_type = policy_type;
        }
        if let Some(description) = update.description {
            let description = description.trim().to_string();
            self.description = (!description.is_empty()).then_some(description);
        }
        if let Some(premium) = update.default_premium {
            self.default_premium = premium;
        }
        if update.default_sum_insured.is_some() {
            self.default_sum_insured = update.default_sum_insured;
        }
        if let Some(term) = update.default_term_months {
            self.default_term_months = term;
        }
        if let Some(frequency) = update.premium_frequency {
            self.premium_frequency = frequency;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.name.is_empty() {
            return Err(PolicyError::MissingRequiredField("name".into()));
        }
        if self.insurer.is_empty() {
            return Err(PolicyError::MissingRequiredField("insurer".into()));
        }
        validate_term(self.default_term_months)?;
        if !self.default_premium.is_positive() {
            return Err(PolicyError::validation("default premium must be positive"));
        }
        if let Some(sum_insured) = self.default_sum_insured {
            if !sum_insured.is_positive() {
                return Err(PolicyError::validation("default sum insured must be positive"));
            }
        }
        Ok(())
    }
}

/// Checks a term length against `1..=MAX_TERM_MONTHS`
pub fn validate_term(months: u32) -> Result<(), PolicyError> {
    if (1..=MAX_TERM_MONTHS).contains(&months) {
        Ok(())
    } else {
        Err(PolicyError::InvalidTerm(months))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> NewPolicyTemplate {
        NewPolicyTemplate {
            name: "Family Floater Gold".into(),
            insurer: "Star Health".into(),
            policy_type: PolicyType::Health,
            description: Some("  ".into()),
            default_premium: Money::inr(dec!(24000)),
            default_sum_insured: Some(Money::inr(dec!(1000000))),
            default_term_months: 12,
            premium_frequency: PremiumFrequency::Annual,
        }
    }

    #[test]
    fn test_new_template_is_active() {
        let template = PolicyTemplate::new(input()).unwrap();
        assert!(template.is_active);
        assert_eq!(template.description, None);
    }

    #[test]
    fn test_term_bounds() {
        let mut bad = input();
        bad.default_term_months = 0;
        assert!(matches!(PolicyTemplate::new(bad), Err(PolicyError::InvalidTerm(0))));

        let mut bad = input();
        bad.default_term_months = 601;
        assert!(PolicyTemplate::new(bad).is_err());
    }

    #[test]
    fn test_deactivate_via_update() {
        let template = PolicyTemplate::new(input()).unwrap();
        let template = template
            .apply(PolicyTemplateUpdate {
                is_active: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert!(!template.is_active);
    }
}
