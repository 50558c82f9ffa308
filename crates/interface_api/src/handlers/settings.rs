//! Agent settings handlers

use axum::{extract::State, Json};
use serde_json::json;
use tracing::info;

use domain_automation::Settings;
use domain_client::{Activity, ActivityType};

use crate::dto::settings::UpdateSettingsRequest;
use crate::error::ApiError;
use crate::handlers::{record_activity, validated};
use crate::AppState;

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.ports.settings.get_settings().await?))
}

/// Partial update; omitted fields keep their stored values
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<Settings>, ApiError> {
    let update = validated(request)?.into();
    let settings = state.ports.settings.get_settings().await?.apply(update)?;
    let settings = state.ports.settings.save_settings(settings).await?;
    info!(
        birthdays = settings.birthday_automation_enabled,
        renewals = settings.renewal_automation_enabled,
        "Settings updated"
    );

    record_activity(
        &state,
        Activity::new(ActivityType::SettingsUpdated, "Settings updated").with_metadata(json!({
            "birthday_automation_enabled": settings.birthday_automation_enabled,
            "renewal_automation_enabled": settings.renewal_automation_enabled,
            "renewal_reminder_days": settings.renewal_reminder_days,
        })),
    )
    .await;
    Ok(Json(settings))
}
