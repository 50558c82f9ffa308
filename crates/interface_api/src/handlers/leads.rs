//! Lead handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::info;

use core_kernel::{LeadId, Page};
use domain_client::{Activity, ActivityType, Client, EntityType, Lead};

use crate::dto::lead::*;
use crate::error::ApiError;
use crate::handlers::{optional_body, parse_id, record_activity, validated};
use crate::AppState;

/// Lists leads, filtered by status, source or search text
pub async fn list_leads(
    State(state): State<AppState>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<Page<Lead>>, ApiError> {
    let page = state.ports.leads.list_leads(params.into()).await?;
    Ok(Json(page))
}

pub async fn create_lead(
    State(state): State<AppState>,
    Json(request): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let lead = Lead::new(validated(request)?.into())?;
    let lead = state.ports.leads.create_lead(lead).await?;
    info!(lead_id = %lead.id, "Lead created");

    record_activity(
        &state,
        Activity::new(ActivityType::LeadCreated, format!("New lead: {}", lead.name))
            .for_entity(EntityType::Lead, lead.id)
            .with_metadata(json!({ "source": lead.source.as_str() })),
    )
    .await;
    Ok((StatusCode::CREATED, Json(lead)))
}

pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    let id: LeadId = parse_id(&id, "lead")?;
    Ok(Json(state.ports.leads.get_lead(id).await?))
}

/// Updates lead fields; a status change must follow the pipeline rules
pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLeadRequest>,
) -> Result<Json<Lead>, ApiError> {
    let id: LeadId = parse_id(&id, "lead")?;
    let update = validated(request)?;
    let current = state.ports.leads.get_lead(id).await?;
    let previous_status = current.status;

    let lead = current.apply(update.into())?;
    let lead = state.ports.leads.update_lead(lead).await?;

    let mut metadata = json!({});
    if lead.status != previous_status {
        metadata = json!({ "from": previous_status.as_str(), "to": lead.status.as_str() });
    }
    record_activity(
        &state,
        Activity::new(ActivityType::LeadUpdated, format!("Lead updated: {}", lead.name))
            .for_entity(EntityType::Lead, lead.id)
            .with_metadata(metadata),
    )
    .await;
    Ok(Json(lead))
}

pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: LeadId = parse_id(&id, "lead")?;
    let lead = state.ports.leads.get_lead(id).await?;
    state.ports.leads.delete_lead(id).await?;

    record_activity(
        &state,
        Activity::new(ActivityType::LeadDeleted, format!("Lead deleted: {}", lead.name))
            .for_entity(EntityType::Lead, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Turns a lead into a client and marks the lead converted
pub async fn convert_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Result<Json<ConvertLeadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let id: LeadId = parse_id(&id, "lead")?;
    let details = validated(optional_body(request)?)?;
    let mut lead = state.ports.leads.get_lead(id).await?;

    let client = Client::new(lead.to_new_client(details.into())?)?;
    lead.mark_converted(client.id)?;
    let client = state.ports.leads.convert_lead(lead, client).await?;
    info!(lead_id = %id, client_id = %client.id, "Lead converted");

    record_activity(
        &state,
        Activity::new(
            ActivityType::LeadConverted,
            format!("Lead converted to client: {}", client.full_name()),
        )
        .for_entity(EntityType::Client, client.id)
        .with_metadata(json!({ "lead_id": id })),
    )
    .await;
    Ok((StatusCode::CREATED, Json(client)))
}
