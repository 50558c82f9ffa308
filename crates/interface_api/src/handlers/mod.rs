//! Request handlers

pub mod activities;
pub mod auth;
pub mod automation;
pub mod clients;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod leads;
pub mod policies;
pub mod policy_templates;
pub mod settings;
pub mod whatsapp_templates;

use std::fmt::Display;
use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use tracing::warn;
use validator::Validate;

use domain_client::Activity;

use crate::error::ApiError;
use crate::AppState;

/// Parses a path id, with or without its display prefix
pub(crate) fn parse_id<T>(raw: &str, entity: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid {} id '{}': {}", entity, raw, e)))
}

pub(crate) fn validated<T: Validate>(body: T) -> Result<T, ApiError> {
    body.validate()?;
    Ok(body)
}

/// Body of an endpoint whose JSON payload is optional
///
/// A request without a JSON content type gets the defaults; a JSON body that
/// does not parse is rejected.
pub(crate) fn optional_body<T: Default>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

/// Writes an activity log entry; a failure is logged, never returned
pub(crate) async fn record_activity(state: &AppState, activity: Activity) {
    let activity_type = activity.activity_type;
    if let Err(e) = state.ports.activities.record(activity).await {
        warn!(activity = %activity_type, error = %e, "Failed to record activity");
    }
}
