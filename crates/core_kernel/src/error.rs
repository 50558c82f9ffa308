//! Kernel errors
//!
//! Failures of the shared building blocks: identifier parsing, money
//! arithmetic and calendar math. Domain crates wrap the money and calendar
//! cases in their own error enums; callers that only touch the kernel use
//! `CoreError` directly.

use thiserror::Error;

use crate::calendar::CalendarError;
use crate::money::MoneyError;
use crate::ports::PortError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// An identifier that is neither `<PREFIX>-<uuid>` nor a bare UUID
    #[error("expected a UUID, optionally prefixed with '{prefix}-'")]
    InvalidId { prefix: &'static str, value: String },

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

impl CoreError {
    pub fn invalid_id(prefix: &'static str, value: impl Into<String>) -> Self {
        CoreError::InvalidId {
            prefix,
            value: value.into(),
        }
    }
}

impl From<CoreError> for PortError {
    fn from(err: CoreError) -> Self {
        PortError::validation(err.to_string())
    }
}
