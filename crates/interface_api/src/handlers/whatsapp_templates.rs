//! WhatsApp template handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use core_kernel::WhatsAppTemplateId;
use domain_automation::{OutboundWhatsApp, TemplateMessageRequest, WhatsAppTemplate};
use domain_client::{Activity, ActivityType, EntityType};

use crate::dto::whatsapp::{
    CreateWhatsAppTemplateRequest, PreviewTemplateRequest, UpdateWhatsAppTemplateRequest,
    WhatsAppTemplateListParams,
};
use crate::error::ApiError;
use crate::handlers::{parse_id, record_activity, validated};
use crate::AppState;

pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<WhatsAppTemplateListParams>,
) -> Result<Json<Vec<WhatsAppTemplate>>, ApiError> {
    let templates = state
        .ports
        .whatsapp_templates
        .list_templates(params.active_only)
        .await?;
    Ok(Json(templates))
}

pub async fn create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateWhatsAppTemplateRequest>,
) -> Result<(StatusCode, Json<WhatsAppTemplate>), ApiError> {
    let template = WhatsAppTemplate::new(validated(request)?.into())?;
    let template = state.ports.whatsapp_templates.create_template(template).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::WhatsAppTemplateCreated,
            format!("WhatsApp template created: {}", template.name),
        )
        .for_entity(EntityType::WhatsAppTemplate, template.id)
        .with_metadata(json!({ "purpose": template.purpose })),
    )
    .await;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WhatsAppTemplate>, ApiError> {
    let id: WhatsAppTemplateId = parse_id(&id, "WhatsApp template")?;
    Ok(Json(state.ports.whatsapp_templates.get_template(id).await?))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateWhatsAppTemplateRequest>,
) -> Result<Json<WhatsAppTemplate>, ApiError> {
    let id: WhatsAppTemplateId = parse_id(&id, "WhatsApp template")?;
    let update = validated(request)?.into();
    let template = state.ports.whatsapp_templates.get_template(id).await?.apply(update)?;
    let template = state.ports.whatsapp_templates.update_template(template).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::WhatsAppTemplateUpdated,
            format!("WhatsApp template updated: {}", template.name),
        )
        .for_entity(EntityType::WhatsAppTemplate, template.id)
        .with_metadata(json!({ "is_active": template.is_active })),
    )
    .await;
    Ok(Json(template))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: WhatsAppTemplateId = parse_id(&id, "WhatsApp template")?;
    let template = state.ports.whatsapp_templates.get_template(id).await?;
    state.ports.whatsapp_templates.delete_template(id).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::WhatsAppTemplateDeleted,
            format!("WhatsApp template deleted: {}", template.name),
        )
        .for_entity(EntityType::WhatsAppTemplate, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Renders the template for a client; nothing is sent
pub async fn preview_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PreviewTemplateRequest>,
) -> Result<Json<OutboundWhatsApp>, ApiError> {
    let template_id: WhatsAppTemplateId = parse_id(&id, "WhatsApp template")?;
    let request = TemplateMessageRequest {
        client_id: request.client_id,
        template_id,
        policy_id: request.policy_id,
        variables: request.variables,
    };
    Ok(Json(state.runner.preview_template_message(&request).await?))
}
