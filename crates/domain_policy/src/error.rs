//! Policy domain errors
//!
//! This module defines all error types that can occur while building,
//! renewing or cancelling policy templates and instances.

use core_kernel::{CalendarError, MoneyError, PortError};
use thiserror::Error;

use crate::instance::PolicyStatus;

/// Errors that can occur in the policy domain
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Invalid state transition attempted
    #[error("Cannot move policy from {from} to {to}")]
    InvalidStateTransition {
        from: PolicyStatus,
        to: PolicyStatus,
    },

    /// Term outside the supported range
    #[error("Invalid term: {0} months (must be 1 to 600)")]
    InvalidTerm(u32),

    /// Policy period is empty or reversed
    #[error("End date {end} must be after start date {start}")]
    InvalidPeriod {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// The template has been retired
    #[error("Policy template '{0}' is inactive")]
    TemplateInactive(String),

    /// Required field is missing
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Date arithmetic failed
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Amounts in different currencies were combined
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl PolicyError {
    /// Creates a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PolicyError::Validation(message.into())
    }

    /// Whether the error is about the policy's lifecycle state rather than its data
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            PolicyError::InvalidStateTransition { .. } | PolicyError::TemplateInactive(_)
        )
    }
}

impl From<PolicyError> for PortError {
    fn from(err: PolicyError) -> Self {
        if err.is_state_conflict() {
            PortError::conflict(err.to_string())
        } else {
            PortError::validation(err.to_string())
        }
    }
}
