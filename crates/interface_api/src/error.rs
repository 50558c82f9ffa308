//! API error handling

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::PortError;
use domain_automation::AutomationError;
use domain_client::ClientError;
use domain_policy::PolicyError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Vec<String>>,
    },

    /// An external service (storage, WhatsApp, SMTP) failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "conflict",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::UnsupportedMediaType(_) => "unsupported_media_type",
            ApiError::Validation { .. } => "validation_error",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Internal(_) => "internal_error",
            ApiError::Database(_) => "database_error",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let (message, details) = match self {
            ApiError::Validation { message, details } => (message, details),
            ApiError::NotFound(m)
            | ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::Conflict(m)
            | ApiError::PayloadTooLarge(m)
            | ApiError::UnsupportedMediaType(m)
            | ApiError::Upstream(m)
            | ApiError::Internal(m)
            | ApiError::Database(m) => (m, None),
        };
        let body = ErrorResponse {
            error: kind.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{} {} not found", entity_type, id))
            }
            PortError::Validation { message, field } => ApiError::Validation {
                message,
                details: field.map(|f| vec![f]),
            },
            PortError::Conflict { message } => ApiError::Conflict(message),
            PortError::Connection { message, .. } => ApiError::Upstream(message),
            PortError::Unauthorized { message } => ApiError::Upstream(message),
            PortError::RateLimited { retry_after_secs } => ApiError::Upstream(format!(
                "rate limited by provider, retry after {}s",
                retry_after_secs
            )),
            PortError::ServiceUnavailable { service, message } => {
                ApiError::Upstream(format!("{}: {}", service, message))
            }
            PortError::Internal { message, .. } => ApiError::Database(message),
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidStatusTransition { .. }
            | ClientError::AlreadyConverted
            | ClientError::LeadLost => ApiError::Conflict(err.to_string()),
            ClientError::UnsupportedContentType(_) => ApiError::UnsupportedMediaType(err.to_string()),
            ClientError::FileTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            ClientError::ValidationFailed(ref joined) => ApiError::Validation {
                message: "validation failed".to_string(),
                details: Some(joined.split("; ").map(str::to_string).collect()),
            },
            ClientError::InvalidData(message) => ApiError::validation(message),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        if err.is_state_conflict() {
            ApiError::Conflict(err.to_string())
        } else {
            ApiError::validation(err.to_string())
        }
    }
}

impl From<AutomationError> for ApiError {
    fn from(err: AutomationError) -> Self {
        match err {
            AutomationError::Port(port) => port.into(),
            AutomationError::Client(client) => client.into(),
            AutomationError::Disabled(_) | AutomationError::TemplateInactive(_) => {
                ApiError::Conflict(err.to_string())
            }
            AutomationError::UnknownJob(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match e.message {
                    Some(ref message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        details.sort();
        ApiError::Validation {
            message: "request validation failed".to_string(),
            details: Some(details),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hashing(message) => ApiError::Internal(message),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        if err.status() == StatusCode::UNPROCESSABLE_ENTITY {
            ApiError::validation(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_errors_map_to_statuses() {
        let cases = [
            (PortError::not_found("Client", "CLI-1"), StatusCode::NOT_FOUND),
            (PortError::conflict("dup"), StatusCode::CONFLICT),
            (PortError::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (PortError::unavailable("msg91", "down"), StatusCode::BAD_GATEWAY),
            (PortError::RateLimited { retry_after_secs: 5 }, StatusCode::BAD_GATEWAY),
            (PortError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (port, status) in cases {
            assert_eq!(ApiError::from(port).status(), status);
        }
    }

    #[test]
    fn test_upload_errors() {
        let too_large: ApiError = ClientError::FileTooLarge { size: 20, limit: 10 }.into();
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bad_type: ApiError = ClientError::UnsupportedContentType("text/html".into()).into();
        assert_eq!(bad_type.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_lead_rule_violations_are_conflicts() {
        let err: ApiError = ClientError::AlreadyConverted.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_failures_carry_details() {
        let err: ApiError = ClientError::validation_failed(vec!["name is required".into(), "phone is invalid".into()]).into();
        match err {
            ApiError::Validation { details: Some(details), .. } => assert_eq!(details.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ApiError::Upstream("x".into()).kind(), "upstream_error");
        assert_eq!(ApiError::Database("x".into()).kind(), "database_error");
    }
}
