//! Errors from outbound HTTP and SMTP calls
//!
//! Provider responses are mapped to `PortError` by status:
//! - 401/403 -> `PortError::Unauthorized`
//! - 404 -> `PortError::NotFound`
//! - 429 -> `PortError::RateLimited`
//! - 5xx and other rejections -> `PortError::ServiceUnavailable`
//! - timeouts and transport failures -> `PortError::Connection`

use core_kernel::PortError;
use reqwest::StatusCode;
use thiserror::Error;

/// Retry hint used when a 429 carries no `Retry-After` header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ExternalError {
    /// The provider answered with a non-success status
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
        retry_after_secs: Option<u64>,
    },

    /// The provider answered 2xx but reported a failure in the body
    #[error("{service} rejected the request: {message}")]
    Rejected { service: &'static str, message: String },

    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    #[error("{service} transport error: {message}")]
    Transport { service: &'static str, message: String },

    #[error("{service} sent an unreadable response: {message}")]
    InvalidResponse { service: &'static str, message: String },

    /// An address or message that cannot be sent as given
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

impl ExternalError {
    pub fn from_reqwest(service: &'static str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ExternalError::Timeout { service }
        } else if error.is_decode() {
            ExternalError::InvalidResponse {
                service,
                message: error.to_string(),
            }
        } else {
            ExternalError::Transport {
                service,
                message: error.to_string(),
            }
        }
    }

    /// Reads the body of a failed response into a `Status` error
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let body = response.text().await.unwrap_or_default();
        ExternalError::Status {
            service,
            status,
            body: truncate(&body, 500),
            retry_after_secs,
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

impl From<ExternalError> for PortError {
    fn from(error: ExternalError) -> Self {
        match error {
            ExternalError::Status {
                service,
                status,
                body,
                retry_after_secs,
            } => match status.as_u16() {
                401 | 403 => PortError::Unauthorized {
                    message: format!("{} rejected the credentials: {}", service, body),
                },
                404 => PortError::not_found(service, body),
                429 => PortError::RateLimited {
                    retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
                },
                _ => PortError::unavailable(service, format!("{}: {}", status, body)),
            },
            ExternalError::Rejected { service, message } => PortError::unavailable(service, message),
            ExternalError::Timeout { service } => {
                PortError::connection(format!("{} request timed out", service))
            }
            ExternalError::Transport { service, message } => {
                PortError::connection(format!("{}: {}", service, message))
            }
            ExternalError::InvalidResponse { service, message } => {
                PortError::unavailable(service, message)
            }
            ExternalError::InvalidMessage(message) => PortError::validation(message),
            ExternalError::Smtp(message) => PortError::unavailable("smtp", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ExternalError {
        ExternalError::Status {
            service: "msg91",
            status: StatusCode::from_u16(code).unwrap(),
            body: "nope".into(),
            retry_after_secs: None,
        }
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(PortError::from(status(401)), PortError::Unauthorized { .. }));
        assert!(matches!(PortError::from(status(403)), PortError::Unauthorized { .. }));
        assert!(PortError::from(status(404)).is_not_found());
        assert!(matches!(
            PortError::from(status(429)),
            PortError::RateLimited { retry_after_secs: 60 }
        ));
        assert!(matches!(PortError::from(status(502)), PortError::ServiceUnavailable { .. }));
        assert!(matches!(PortError::from(status(400)), PortError::ServiceUnavailable { .. }));
    }

    #[test]
    fn test_timeout_is_transient() {
        let error: PortError = ExternalError::Timeout { service: "cloudinary" }.into();
        assert!(error.is_transient());
    }

    #[test]
    fn test_truncate_long_bodies() {
        let body = "x".repeat(600);
        assert_eq!(truncate(&body, 500).chars().count(), 501);
        assert_eq!(truncate("short", 500), "short");
    }
}
