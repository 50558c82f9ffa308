//! Policy template and policy DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use core_kernel::{ClientId, Currency, Money, PolicyTemplateId};
use domain_policy::{
    NewPolicyInstance, NewPolicyTemplate, PolicyInstanceUpdate, PolicyQuery, PolicyStatus,
    PolicyTemplateUpdate, PolicyType, PremiumFrequency, RenewalRequest,
};

fn money(amount: Option<Decimal>, currency: Currency) -> Option<Money> {
    amount.map(|a| Money::new(a, currency))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePolicyTemplateRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "insurer is required"))]
    pub insurer: String,
    pub policy_type: PolicyType,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub default_premium: Decimal,
    pub default_sum_insured: Option<Decimal>,
    #[validate(range(min = 1, max = 600))]
    pub default_term_months: u32,
    #[serde(default)]
    pub premium_frequency: PremiumFrequency,
}

impl CreatePolicyTemplateRequest {
    pub fn into_new(self, currency: Currency) -> NewPolicyTemplate {
        NewPolicyTemplate {
            name: self.name,
            insurer: self.insurer,
            policy_type: self.policy_type,
            description: self.description,
            default_premium: Money::new(self.default_premium, currency),
            default_sum_insured: money(self.default_sum_insured, currency),
            default_term_months: self.default_term_months,
            premium_frequency: self.premium_frequency,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePolicyTemplateRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub insurer: Option<String>,
    pub policy_type: Option<PolicyType>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub default_premium: Option<Decimal>,
    pub default_sum_insured: Option<Decimal>,
    #[validate(range(min = 1, max = 600))]
    pub default_term_months: Option<u32>,
    pub premium_frequency: Option<PremiumFrequency>,
    pub is_active: Option<bool>,
}

impl UpdatePolicyTemplateRequest {
    pub fn into_update(self, currency: Currency) -> PolicyTemplateUpdate {
        PolicyTemplateUpdate {
            name: self.name,
            insurer: self.insurer,
            policy_type: self.policy_type,
            description: self.description,
            default_premium: money(self.default_premium, currency),
            default_sum_insured: money(self.default_sum_insured, currency),
            default_term_months: self.default_term_months,
            premium_frequency: self.premium_frequency,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateListParams {
    /// Hide retired templates (for pickers)
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePolicyRequest {
    #[validate(length(min = 1, max = 100, message = "policy number is required"))]
    pub policy_number: String,
    pub client_id: ClientId,
    pub template_id: PolicyTemplateId,
    pub start_date: NaiveDate,
    /// Computed from the term when absent
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 1, max = 600))]
    pub term_months: Option<u32>,
    pub premium: Option<Decimal>,
    pub sum_insured: Option<Decimal>,
    pub premium_frequency: Option<PremiumFrequency>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

impl CreatePolicyRequest {
    pub fn into_new(self, currency: Currency) -> NewPolicyInstance {
        NewPolicyInstance {
            policy_number: self.policy_number,
            client_id: self.client_id,
            start_date: self.start_date,
            end_date: self.end_date,
            term_months: self.term_months,
            premium: money(self.premium, currency),
            sum_insured: money(self.sum_insured, currency),
            premium_frequency: self.premium_frequency,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePolicyRequest {
    #[validate(length(min = 1, max = 100))]
    pub policy_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub premium: Option<Decimal>,
    pub sum_insured: Option<Decimal>,
    pub premium_frequency: Option<PremiumFrequency>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

impl UpdatePolicyRequest {
    pub fn into_update(self, currency: Currency) -> PolicyInstanceUpdate {
        PolicyInstanceUpdate {
            policy_number: self.policy_number,
            start_date: self.start_date,
            end_date: self.end_date,
            premium: money(self.premium, currency),
            sum_insured: money(self.sum_insured, currency),
            premium_frequency: self.premium_frequency,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RenewPolicyRequest {
    /// Defaults to `<old number>-R<n>`
    #[validate(length(min = 1, max = 100))]
    pub policy_number: Option<String>,
    pub premium: Option<Decimal>,
    pub sum_insured: Option<Decimal>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

impl RenewPolicyRequest {
    pub fn into_request(self, currency: Currency) -> RenewalRequest {
        RenewalRequest {
            policy_number: self.policy_number,
            premium: money(self.premium, currency),
            sum_insured: money(self.sum_insured, currency),
            notes: self.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PolicyListParams {
    pub client_id: Option<ClientId>,
    pub template_id: Option<PolicyTemplateId>,
    pub status: Option<PolicyStatus>,
    pub expiring_within_days: Option<u32>,
    /// Matches the policy number
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PolicyListParams {
    pub fn into_query(self, today: NaiveDate) -> PolicyQuery {
        PolicyQuery {
            client_id: self.client_id,
            template_id: self.template_id,
            status: self.status,
            expiring_within_days: self.expiring_within_days,
            today: Some(today),
            search: self.search.filter(|s| !s.trim().is_empty()),
            limit: self.limit,
            offset: self.offset,
        }
    }
}
