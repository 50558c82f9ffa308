//! Automation Domain - Settings, WhatsApp templates and scheduled reminders
//!
//! Covers everything the agent's CRM sends on its own:
//! - Agent settings, including which automations run and when
//! - WhatsApp templates and `{{placeholder}}` rendering
//! - Birthday greetings and renewal reminders, planned per local date
//! - The runner that sends them over WhatsApp and email and logs the result
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_automation::{AutomationRunner, JobKind};
//!
//! let runner = AutomationRunner::new(ports, timezone);
//! let report = runner.run(JobKind::All, None, false).await?;
//! println!("{} sent, {} failed", report.sent, report.failed);
//! ```

pub mod channels;
pub mod error;
pub mod ports;
pub mod reminders;
pub mod render;
pub mod runner;
pub mod settings;
pub mod whatsapp_template;

pub use channels::{
    birthday_email, renewal_email, DeliveryReceipt, EmailSender, OutboundEmail, OutboundWhatsApp,
    WhatsAppSender,
};
pub use error::AutomationError;
pub use ports::{SettingsPort, WhatsAppTemplatePort};
pub use reminders::{ReminderJob, ReminderKind, ReminderPlanner};
pub use render::{extract_placeholders, render, Variables, MESSAGE_DATE_FORMAT};
pub use runner::{
    AutomationPorts, AutomationRunner, Channel, ChannelAttempt, JobKind, JobOutcome,
    OutcomeStatus, RunReport, TemplateMessageRequest, TemplateMessageResult,
};
pub use settings::{Settings, SettingsUpdate, DEFAULT_COUNTRY_CODE, DEFAULT_REMINDER_DAYS};
pub use whatsapp_template::{
    NewWhatsAppTemplate, RenderedTemplate, TemplatePurpose, WhatsAppTemplate,
    WhatsAppTemplateUpdate,
};
