//! Test Data Builders
//!
//! Builders go through the domain constructors, so everything they produce
//! passes the same validation as API input. Only the fields a test cares
//! about need to be set.

use chrono::NaiveDate;

use core_kernel::{ClientId, Money};
use domain_client::{Client, Lead, LeadSource, NewClient, NewLead};
use domain_policy::{
    NewPolicyInstance, NewPolicyTemplate, PolicyInstance, PolicyTemplate, PolicyType,
    PremiumFrequency,
};

use crate::fixtures::{ContactFixtures, DateFixtures, MoneyFixtures};

/// Builder for leads
pub struct LeadBuilder {
    input: NewLead,
}

impl Default for LeadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadBuilder {
    pub fn new() -> Self {
        Self {
            input: NewLead {
                name: "Ravi Kumar".to_string(),
                phone: ContactFixtures::phone().to_string(),
                source: LeadSource::Referral,
                ..NewLead::default()
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.input.name = name.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.input.email = Some(email.into());
        self
    }

    pub fn with_source(mut self, source: LeadSource) -> Self {
        self.input.source = source;
        self
    }

    pub fn with_follow_up(mut self, date: NaiveDate) -> Self {
        self.input.follow_up_date = Some(date);
        self
    }

    pub fn build(self) -> Lead {
        Lead::new(self.input).expect("lead builder produced invalid input")
    }
}

/// Builder for clients
pub struct ClientBuilder {
    input: NewClient,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            input: NewClient {
                first_name: "Asha".to_string(),
                last_name: "Sharma".to_string(),
                phone: ContactFixtures::phone().to_string(),
                city: Some("Pune".to_string()),
                ..NewClient::default()
            },
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.input.first_name = first.into();
        self.input.last_name = last.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.input.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.input.phone = phone.into();
        self
    }

    pub fn with_whatsapp(mut self, number: impl Into<String>) -> Self {
        self.input.whatsapp_number = Some(number.into());
        self
    }

    pub fn born_on(mut self, date: NaiveDate) -> Self {
        self.input.date_of_birth = Some(date);
        self
    }

    pub fn build(self) -> Client {
        Client::new(self.input).expect("client builder produced invalid input")
    }
}

/// Builder for policy templates
pub struct PolicyTemplateBuilder {
    input: NewPolicyTemplate,
}

impl Default for PolicyTemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyTemplateBuilder {
    pub fn new() -> Self {
        Self {
            input: NewPolicyTemplate {
                name: "Family Health Shield".to_string(),
                insurer: "Star Health".to_string(),
                policy_type: PolicyType::Health,
                description: None,
                default_premium: MoneyFixtures::annual_premium(),
                default_sum_insured: Some(MoneyFixtures::sum_insured()),
                default_term_months: 12,
                premium_frequency: PremiumFrequency::Annual,
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.input.name = name.into();
        self
    }

    pub fn with_type(mut self, policy_type: PolicyType) -> Self {
        self.input.policy_type = policy_type;
        self
    }

    pub fn with_premium(mut self, premium: Money, frequency: PremiumFrequency) -> Self {
        self.input.default_premium = premium;
        self.input.premium_frequency = frequency;
        self
    }

    pub fn with_term_months(mut self, months: u32) -> Self {
        self.input.default_term_months = months;
        self
    }

    pub fn build(self) -> PolicyTemplate {
        PolicyTemplate::new(self.input).expect("template builder produced invalid input")
    }
}

/// Builder for a client's policy, issued from a template
pub struct PolicyBuilder {
    template: PolicyTemplate,
    input: NewPolicyInstance,
}

impl PolicyBuilder {
    pub fn new(template: PolicyTemplate, client_id: ClientId) -> Self {
        Self {
            template,
            input: NewPolicyInstance {
                policy_number: "SH-1001".to_string(),
                client_id,
                start_date: DateFixtures::policy_start(),
                end_date: None,
                term_months: None,
                premium: None,
                sum_insured: None,
                premium_frequency: None,
                notes: None,
            },
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.input.policy_number = number.into();
        self
    }

    pub fn starting(mut self, date: NaiveDate) -> Self {
        self.input.start_date = date;
        self
    }

    pub fn ending(mut self, date: NaiveDate) -> Self {
        self.input.end_date = Some(date);
        self
    }

    pub fn with_premium(mut self, premium: Money) -> Self {
        self.input.premium = Some(premium);
        self
    }

    pub fn build(self) -> PolicyInstance {
        PolicyInstance::from_template(&self.template, self.input)
            .expect("policy builder produced invalid input")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_policy::PolicyStatus;

    #[test]
    fn test_defaults_are_valid() {
        let lead = LeadBuilder::new().with_email("ravi@example.com").build();
        assert_eq!(lead.source, LeadSource::Referral);

        let client = ClientBuilder::new().born_on(DateFixtures::birthday_today()).build();
        assert_eq!(client.full_name(), "Asha Sharma");

        let policy = PolicyBuilder::new(PolicyTemplateBuilder::new().build(), client.id).build();
        assert_eq!(policy.status, PolicyStatus::Active);
        assert_eq!(policy.end_date, DateFixtures::policy_end());
        assert_eq!(policy.premium, MoneyFixtures::annual_premium());
    }
}
