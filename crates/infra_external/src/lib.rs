//! External integrations
//!
//! Adapters for the services the CRM talks to over the network:
//!
//! - [`CloudinaryStore`] keeps uploaded documents (`DocumentStorePort`)
//! - [`Msg91WhatsApp`] sends WhatsApp template messages (`WhatsAppSender`)
//! - [`SmtpMailer`] sends plain-text email (`EmailSender`)
//!
//! When an integration is not configured the binaries wire in
//! [`LogOnlyWhatsApp`] or [`LogOnlyEmail`], which log the message and report
//! a dry-run receipt.

pub mod cloudinary;
pub mod error;
pub mod log_only;
pub mod msg91;
pub mod smtp;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};
pub use error::ExternalError;
pub use log_only::{LogOnlyEmail, LogOnlyWhatsApp};
pub use msg91::{Msg91Config, Msg91WhatsApp};
pub use smtp::{SmtpConfig, SmtpMailer};
