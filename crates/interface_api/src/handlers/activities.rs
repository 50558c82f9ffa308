//! Activity feed handler

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use domain_client::{Activity, ActivityQuery, ActivityType, EntityType};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<u32>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub activity_type: Option<ActivityType>,
}

/// Most recent activity first
pub async fn list_activities(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    if params.entity_id.is_some() && params.entity_type.is_none() {
        return Err(ApiError::BadRequest(
            "entity_id requires entity_type".to_string(),
        ));
    }
    let query = ActivityQuery {
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        activity_type: params.activity_type,
        limit: params.limit,
    };
    Ok(Json(state.ports.activities.list_recent(query).await?))
}
