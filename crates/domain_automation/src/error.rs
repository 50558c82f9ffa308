//! Automation domain errors

use core_kernel::{CalendarError, PortError};
use domain_client::ClientError;
use thiserror::Error;

/// Errors that can occur while configuring or running automation
#[derive(Debug, Error)]
pub enum AutomationError {
    /// A placeholder in the template has no value
    #[error("Missing value for template variable '{0}'")]
    MissingVariable(String),

    /// The template body uses a placeholder that is not declared
    #[error("Template body uses undeclared variable '{0}'")]
    UndeclaredVariable(String),

    /// Invalid settings or template data
    #[error("Validation error: {0}")]
    Validation(String),

    /// The channel or job is switched off in settings
    #[error("{0} is disabled in settings")]
    Disabled(String),

    /// The template exists but is not active
    #[error("WhatsApp template '{0}' is inactive")]
    TemplateInactive(String),

    /// Unknown job kind on the command line or in a request
    #[error("Unknown automation job '{0}' (expected birthdays, renewals or all)")]
    UnknownJob(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl AutomationError {
    pub fn validation(message: impl Into<String>) -> Self {
        AutomationError::Validation(message.into())
    }
}
