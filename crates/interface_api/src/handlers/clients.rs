//! Client handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use core_kernel::{ClientId, Page};
use domain_client::{Activity, ActivityType, Client, EntityType};

use crate::dto::client::*;
use crate::error::ApiError;
use crate::handlers::{parse_id, record_activity, validated};
use crate::AppState;

pub async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<ClientListParams>,
) -> Result<Json<Page<Client>>, ApiError> {
    Ok(Json(state.ports.clients.list_clients(params.into()).await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = Client::new(validated(request)?.into())?;
    let client = state.ports.clients.create_client(client).await?;
    info!(client_id = %client.id, "Client created");

    record_activity(
        &state,
        Activity::new(
            ActivityType::ClientCreated,
            format!("New client: {}", client.full_name()),
        )
        .for_entity(EntityType::Client, client.id),
    )
    .await;
    Ok((StatusCode::CREATED, Json(client)))
}

/// Reads a client with their policies and documents
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClientDetailResponse>, ApiError> {
    let id: ClientId = parse_id(&id, "client")?;
    let client = state.ports.clients.get_client(id).await?;
    let policies = state.ports.policies.list_for_client(id).await?;
    let documents = state.ports.documents.list_for_client(id).await?;

    Ok(Json(ClientDetailResponse {
        client,
        policies,
        documents,
    }))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<Client>, ApiError> {
    let id: ClientId = parse_id(&id, "client")?;
    let update = validated(request)?;
    let client = state.ports.clients.get_client(id).await?.apply(update.into())?;
    let client = state.ports.clients.update_client(client).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::ClientUpdated,
            format!("Client updated: {}", client.full_name()),
        )
        .for_entity(EntityType::Client, client.id),
    )
    .await;
    Ok(Json(client))
}

/// Deletes a client and their document records
///
/// Refused while the client still has policies.
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ClientId = parse_id(&id, "client")?;
    let client = state.ports.clients.get_client(id).await?;

    let policy_count = state.ports.policies.count_for_client(id).await?;
    if policy_count > 0 {
        return Err(ApiError::Conflict(format!(
            "client still has {} policies; delete them first",
            policy_count
        )));
    }

    // Document rows cascade with the client; stored files go afterwards
    let documents = state.ports.documents.list_for_client(id).await?;
    state.ports.clients.delete_client(id).await?;
    info!(client_id = %id, "Client deleted");

    match state.ports.document_store {
        Some(ref store) => {
            for document in &documents {
                if let Err(e) = store.delete(&document.storage_key).await {
                    warn!(document_id = %document.id, error = %e, "Could not remove stored file");
                }
            }
        }
        None if !documents.is_empty() => {
            warn!(client_id = %id, count = documents.len(), "Document storage is not configured, stored files kept");
        }
        None => {}
    }

    record_activity(
        &state,
        Activity::new(
            ActivityType::ClientDeleted,
            format!("Client deleted: {}", client.full_name()),
        )
        .for_entity(EntityType::Client, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
