//! SMTP email sender

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

use core_kernel::{DomainPort, PortError};
use domain_automation::{DeliveryReceipt, EmailSender, OutboundEmail};

use crate::error::ExternalError;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: Option<String>,
    /// Upgrade the connection with STARTTLS; otherwise connect over implicit TLS
    pub starttls: bool,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            host: host.into(),
            port: 587,
            from_email: username.clone(),
            username,
            password: password.into(),
            from_name: None,
            starttls: true,
        }
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer").field("from", &self.from.to_string()).finish()
    }
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, ExternalError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        }
        .map_err(|e| ExternalError::Smtp(e.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();
        let from = mailbox(config.from_name, &config.from_email)?;
        Ok(Self { transport, from })
    }

    fn build(&self, email: &OutboundEmail) -> Result<Message, ExternalError> {
        Message::builder()
            .from(self.from.clone())
            .to(mailbox(email.to_name.clone(), &email.to)?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.text_body.clone())
            .map_err(|e| ExternalError::InvalidMessage(e.to_string()))
    }
}

fn mailbox(name: Option<String>, email: &str) -> Result<Mailbox, ExternalError> {
    let address: Address = email
        .trim()
        .parse()
        .map_err(|e| ExternalError::InvalidMessage(format!("invalid email address '{}': {}", email, e)))?;
    Ok(Mailbox::new(name, address))
}

impl DomainPort for SmtpMailer {}

#[async_trait]
impl EmailSender for SmtpMailer {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &OutboundEmail) -> Result<DeliveryReceipt, PortError> {
        let email = self.build(message)?;
        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| ExternalError::Smtp(e.to_string()))?;
        info!(subject = %message.subject, "Email sent");
        Ok(DeliveryReceipt::sent(
            "smtp",
            response.first_line().map(str::to_string),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        let mut config = SmtpConfig::new("smtp.example.com", "agent@example.com", "secret");
        config.from_name = Some("Priya Nair".into());
        SmtpMailer::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_builds_plain_text_message() {
        let message = mailer()
            .build(&OutboundEmail {
                to: "client@example.com".into(),
                to_name: Some("Rahul Verma".into()),
                subject: "Happy Birthday, Rahul!".into(),
                text_body: "Dear Rahul".into(),
            })
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Rahul Verma"));
        assert!(raw.contains("<client@example.com>"));
        assert!(raw.contains("<agent@example.com>"));
        assert!(raw.contains("Subject: Happy Birthday, Rahul!"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_validation_error() {
        let result = mailer().build(&OutboundEmail {
            to: "not-an-address".into(),
            to_name: None,
            subject: "x".into(),
            text_body: "y".into(),
        });
        let error: PortError = result.unwrap_err().into();
        assert!(matches!(error, PortError::Validation { .. }));
    }
}
