//! Policy template handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use core_kernel::PolicyTemplateId;
use domain_client::{Activity, ActivityType, EntityType};
use domain_policy::PolicyTemplate;

use crate::dto::policy::{CreatePolicyTemplateRequest, TemplateListParams, UpdatePolicyTemplateRequest};
use crate::error::ApiError;
use crate::handlers::{parse_id, record_activity, validated};
use crate::AppState;

pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<TemplateListParams>,
) -> Result<Json<Vec<PolicyTemplate>>, ApiError> {
    let templates = state.ports.policy_templates.list_templates(params.active_only).await?;
    Ok(Json(templates))
}

pub async fn create_template(
    State(state): State<AppState>,
    Json(request): Json<CreatePolicyTemplateRequest>,
) -> Result<(StatusCode, Json<PolicyTemplate>), ApiError> {
    let template = PolicyTemplate::new(validated(request)?.into_new(state.currency))?;
    let template = state.ports.policy_templates.create_template(template).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::PolicyTemplateCreated,
            format!("Policy template created: {} ({})", template.name, template.insurer),
        )
        .for_entity(EntityType::PolicyTemplate, template.id),
    )
    .await;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PolicyTemplate>, ApiError> {
    let id: PolicyTemplateId = parse_id(&id, "policy template")?;
    Ok(Json(state.ports.policy_templates.get_template(id).await?))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePolicyTemplateRequest>,
) -> Result<Json<PolicyTemplate>, ApiError> {
    let id: PolicyTemplateId = parse_id(&id, "policy template")?;
    let update = validated(request)?.into_update(state.currency);
    let template = state.ports.policy_templates.get_template(id).await?.apply(update)?;
    let template = state.ports.policy_templates.update_template(template).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::PolicyTemplateUpdated,
            format!("Policy template updated: {}", template.name),
        )
        .for_entity(EntityType::PolicyTemplate, template.id)
        .with_metadata(json!({ "is_active": template.is_active })),
    )
    .await;
    Ok(Json(template))
}

/// Deletes an unused template; templates with policies must be deactivated instead
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: PolicyTemplateId = parse_id(&id, "policy template")?;
    let template = state.ports.policy_templates.get_template(id).await?;
    state.ports.policy_templates.delete_template(id).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::PolicyTemplateDeleted,
            format!("Policy template deleted: {}", template.name),
        )
        .for_entity(EntityType::PolicyTemplate, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
