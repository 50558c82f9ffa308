//! Outbound message channels
//!
//! WhatsApp and email are ports; `infra_external` provides MSG91 and SMTP
//! adapters plus log-only stand-ins for when an integration is not
//! configured.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, PortError};
use domain_client::Client;
use domain_policy::{PolicyInstance, PolicyTemplate};

use crate::render::MESSAGE_DATE_FORMAT;
use crate::settings::Settings;

/// A template message to one WhatsApp number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundWhatsApp {
    /// International number without `+`
    pub to: String,
    pub template_name: String,
    pub language_code: String,
    pub namespace: Option<String>,
    /// Values for `body_1..body_n`
    pub parameters: Vec<String>,
    /// Rendered text, kept for logs and previews
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub text_body: String,
}

/// What a channel reports after accepting a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub provider: String,
    pub message_id: Option<String>,
    /// True when the message was only logged, not sent
    pub dry_run: bool,
}

impl DeliveryReceipt {
    pub fn sent(provider: impl Into<String>, message_id: Option<String>) -> Self {
        Self {
            provider: provider.into(),
            message_id,
            dry_run: false,
        }
    }

    pub fn logged(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message_id: None,
            dry_run: true,
        }
    }
}

#[async_trait]
pub trait WhatsAppSender: DomainPort {
    async fn send(&self, message: &OutboundWhatsApp) -> Result<DeliveryReceipt, PortError>;
}

#[async_trait]
pub trait EmailSender: DomainPort {
    async fn send(&self, message: &OutboundEmail) -> Result<DeliveryReceipt, PortError>;
}

/// Birthday greeting email for a client with an email address
pub fn birthday_email(client: &Client, settings: &Settings) -> Option<OutboundEmail> {
    let to = client.email.clone()?;
    let text_body = format!(
        "Dear {},\n\n\
         Wishing you a very happy birthday! May the year ahead bring you good \
         health, happiness and success.\n\n\
         Warm regards,\n{}",
        client.first_name,
        settings.signature()
    );
    Some(OutboundEmail {
        to,
        to_name: Some(client.full_name()),
        subject: format!("Happy Birthday, {}!", client.first_name),
        text_body,
    })
}

/// Renewal reminder email for a client with an email address
pub fn renewal_email(
    client: &Client,
    policy: &PolicyInstance,
    template: Option<&PolicyTemplate>,
    settings: &Settings,
    today: NaiveDate,
) -> Option<OutboundEmail> {
    let to = client.email.clone()?;
    let product = template
        .map(|t| format!("{} ({})", t.name, t.insurer))
        .unwrap_or_else(|| "insurance".to_string());
    let days_left = core_kernel::calendar::days_until(today, policy.end_date).max(0);
    let when = match days_left {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {} days", n),
    };
    let end_date = policy.end_date.format(MESSAGE_DATE_FORMAT);

    let mut text_body = format!(
        "Dear {},\n\n\
         This is a friendly reminder that your {} policy {} is due for renewal \
         {}, on {}.\n\n\
         Premium: {}\n",
        client.first_name,
        product,
        policy.policy_number,
        when,
        end_date,
        policy.premium.to_display_string()
    );
    if let Some(sum_insured) = policy.sum_insured {
        text_body.push_str(&format!("Sum insured: {}\n", sum_insured.to_display_string()));
    }
    text_body.push_str(&format!(
        "\nRenewing on time keeps your cover continuous. Reply to this email or \
         call me to renew.\n\nRegards,\n{}",
        settings.signature()
    ));

    Some(OutboundEmail {
        to,
        to_name: Some(client.full_name()),
        subject: format!("Renewal reminder: policy {} expires on {}", policy.policy_number, end_date),
        text_body,
    })
}

/// Recording senders for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Records WhatsApp messages; numbers in the failure list are rejected
    #[derive(Debug, Default, Clone)]
    pub struct RecordingWhatsApp {
        sent: Arc<RwLock<Vec<OutboundWhatsApp>>>,
        failing_numbers: Arc<RwLock<HashSet<String>>>,
    }

    impl RecordingWhatsApp {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn fail_for(&self, number: impl Into<String>) {
            self.failing_numbers.write().await.insert(number.into());
        }

        pub async fn sent(&self) -> Vec<OutboundWhatsApp> {
            self.sent.read().await.clone()
        }
    }

    impl DomainPort for RecordingWhatsApp {}

    #[async_trait]
    impl WhatsAppSender for RecordingWhatsApp {
        async fn send(&self, message: &OutboundWhatsApp) -> Result<DeliveryReceipt, PortError> {
            if self.failing_numbers.read().await.contains(&message.to) {
                return Err(PortError::unavailable("mock-whatsapp", "number rejected"));
            }
            let mut sent = self.sent.write().await;
            sent.push(message.clone());
            Ok(DeliveryReceipt::sent("mock-whatsapp", Some(format!("wa-{}", sent.len()))))
        }
    }

    /// Records emails; addresses in the failure list are rejected
    #[derive(Debug, Default, Clone)]
    pub struct RecordingEmail {
        sent: Arc<RwLock<Vec<OutboundEmail>>>,
        failing_addresses: Arc<RwLock<HashSet<String>>>,
    }

    impl RecordingEmail {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn fail_for(&self, address: impl Into<String>) {
            self.failing_addresses.write().await.insert(address.into());
        }

        pub async fn sent(&self) -> Vec<OutboundEmail> {
            self.sent.read().await.clone()
        }
    }

    impl DomainPort for RecordingEmail {}

    #[async_trait]
    impl EmailSender for RecordingEmail {
        async fn send(&self, message: &OutboundEmail) -> Result<DeliveryReceipt, PortError> {
            if self.failing_addresses.read().await.contains(&message.to) {
                return Err(PortError::unavailable("mock-email", "mailbox unavailable"));
            }
            self.sent.write().await.push(message.clone());
            Ok(DeliveryReceipt::sent("mock-email", None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{ClientId, Money};
    use domain_client::NewClient;
    use domain_policy::{NewPolicyInstance, NewPolicyTemplate, PolicyType, PremiumFrequency};
    use rust_decimal_macros::dec;

    fn client(email: Option<&str>) -> Client {
        Client::new(NewClient {
            first_name: "Farah".into(),
            last_name: "Khan".into(),
            email: email.map(String::from),
            phone: "9000000001".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_birthday_email_needs_address() {
        let settings = Settings::default();
        assert!(birthday_email(&client(None), &settings).is_none());

        let email = birthday_email(&client(Some("farah@example.com")), &settings).unwrap();
        assert_eq!(email.subject, "Happy Birthday, Farah!");
        assert!(email.text_body.contains(&settings.agent_name));
    }

    #[test]
    fn test_renewal_email_mentions_policy() {
        let template = PolicyTemplate::new(NewPolicyTemplate {
            name: "Car Shield".into(),
            insurer: "ICICI Lombard".into(),
            policy_type: PolicyType::Motor,
            description: None,
            default_premium: Money::inr(dec!(12500)),
            default_sum_insured: None,
            default_term_months: 12,
            premium_frequency: PremiumFrequency::Annual,
        })
        .unwrap();
        let policy = PolicyInstance::from_template(
            &template,
            NewPolicyInstance {
                policy_number: "MOT-55".into(),
                client_id: ClientId::new(),
                start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                end_date: None,
                term_months: None,
                premium: None,
                sum_insured: None,
                premium_frequency: None,
                notes: None,
            },
        )
        .unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 4, 23).unwrap();
        let email = renewal_email(
            &client(Some("farah@example.com")),
            &policy,
            Some(&template),
            &Settings::default(),
            today,
        )
        .unwrap();
        assert_eq!(email.subject, "Renewal reminder: policy MOT-55 expires on 30 Apr 2025");
        assert!(email.text_body.contains("in 7 days"));
        assert!(email.text_body.contains("₹12,500.00"));
        assert!(email.text_body.contains("Car Shield (ICICI Lombard)"));
    }
}
