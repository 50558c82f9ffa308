//! Client domain errors
//!
//! Errors raised while building or changing leads, clients, documents and
//! activity records.

use core_kernel::PortError;
use thiserror::Error;

use crate::lead::LeadStatus;

/// Errors that can occur in the client domain
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid data provided
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// One or more validation rules failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The requested lead status change is not allowed
    #[error("Cannot move lead from {from} to {to}")]
    InvalidStatusTransition { from: LeadStatus, to: LeadStatus },

    /// The lead was already converted into a client
    #[error("Lead already converted")]
    AlreadyConverted,

    /// The lead is closed as lost and must be reopened first
    #[error("Lead is marked lost; reopen it before converting")]
    LeadLost,

    /// The uploaded file type is not accepted
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The uploaded file is larger than allowed
    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },
}

impl ClientError {
    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        ClientError::InvalidData(message.into())
    }

    /// Creates a ValidationFailed error from validation errors
    pub fn validation_failed(errors: Vec<String>) -> Self {
        ClientError::ValidationFailed(errors.join("; "))
    }
}

impl From<ClientError> for PortError {
    fn from(err: ClientError) -> Self {
        PortError::validation(err.to_string())
    }
}
