//! Senders that only log
//!
//! Wired in when MSG91 or SMTP credentials are absent, so automation runs
//! still produce a full report in development.

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, PortError};
use domain_automation::{DeliveryReceipt, EmailSender, OutboundEmail, OutboundWhatsApp, WhatsAppSender};

#[derive(Debug, Clone, Default)]
pub struct LogOnlyWhatsApp;

impl DomainPort for LogOnlyWhatsApp {}

#[async_trait]
impl WhatsAppSender for LogOnlyWhatsApp {
    async fn send(&self, message: &OutboundWhatsApp) -> Result<DeliveryReceipt, PortError> {
        info!(
            to = %message.to,
            template = %message.template_name,
            preview = %message.preview,
            "WhatsApp not configured, message logged"
        );
        Ok(DeliveryReceipt::logged("log-only"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogOnlyEmail;

impl DomainPort for LogOnlyEmail {}

#[async_trait]
impl EmailSender for LogOnlyEmail {
    async fn send(&self, message: &OutboundEmail) -> Result<DeliveryReceipt, PortError> {
        info!(to = %message.to, subject = %message.subject, "SMTP not configured, email logged");
        Ok(DeliveryReceipt::logged("log-only"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_only_receipts_are_dry_run() {
        let receipt = LogOnlyEmail
            .send(&OutboundEmail {
                to: "a@example.com".into(),
                to_name: None,
                subject: "s".into(),
                text_body: "b".into(),
            })
            .await
            .unwrap();
        assert!(receipt.dry_run);
        assert_eq!(receipt.provider, "log-only");
    }
}
