//! Upload and document handlers
//!
//! Files go to external storage; only their metadata is kept in the
//! database. Accepted fields on `POST /upload`: `file` (required) and the
//! text fields `client_id`, `policy_id` and `folder`.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use core_kernel::{ClientId, DocumentId, PolicyInstanceId};
use domain_client::{Activity, ActivityType, Document, DocumentStorePort, EntityType, FileUpload};

use crate::error::ApiError;
use crate::handlers::{parse_id, record_activity};
use crate::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn document_store(state: &AppState) -> Result<Arc<dyn DocumentStorePort>, ApiError> {
    state
        .ports
        .document_store
        .clone()
        .ok_or_else(|| ApiError::Upstream("document storage is not configured".to_string()))
}

/// Text value of an optional form field; blank means absent
fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Stores an uploaded file and records its metadata
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let mut file: Option<FileUpload> = None;
    let mut client_id: Option<ClientId> = None;
    let mut policy_id: Option<PolicyInstanceId> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await?;
                file = Some(FileUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                    folder: None,
                });
            }
            "client_id" => {
                if let Some(raw) = non_blank(field.text().await?) {
                    client_id = Some(parse_id(&raw, "client")?);
                }
            }
            "policy_id" => {
                if let Some(raw) = non_blank(field.text().await?) {
                    policy_id = Some(parse_id(&raw, "policy")?);
                }
            }
            "folder" => folder = non_blank(field.text().await?),
            other => warn!(field = other, "Ignoring unexpected upload field"),
        }
    }

    let mut file = file.ok_or_else(|| ApiError::BadRequest("multipart field 'file' is required".to_string()))?;
    file.validate(state.config.max_upload_bytes)?;

    if let Some(id) = policy_id {
        let policy = state.ports.policies.get_policy(id).await?;
        match client_id {
            Some(client) if client != policy.client_id => {
                return Err(ApiError::validation("policy does not belong to this client"));
            }
            _ => client_id = Some(policy.client_id),
        }
    }
    if let Some(id) = client_id {
        state.ports.clients.get_client(id).await?;
    }
    file.folder = folder.or_else(|| client_id.map(|id| format!("clients/{}", id.as_uuid())));

    let store = document_store(&state)?;
    let stored = store.upload(&file).await?;
    let document = Document::from_stored(&file, stored, client_id, policy_id);
    let storage_key = document.storage_key.clone();

    let document = match state.ports.documents.save_document(document).await {
        Ok(document) => document,
        Err(e) => {
            if let Err(cleanup) = store.delete(&storage_key).await {
                warn!(storage_key = %storage_key, error = %cleanup, "Orphaned stored file");
            }
            return Err(e.into());
        }
    };
    info!(document_id = %document.id, size = document.size_bytes, "Document uploaded");

    record_activity(
        &state,
        Activity::new(
            ActivityType::DocumentUploaded,
            format!("Document uploaded: {}", document.file_name),
        )
        .for_entity(EntityType::Document, document.id)
        .with_metadata(json!({
            "client_id": document.client_id,
            "policy_id": document.policy_id,
            "content_type": document.content_type,
        })),
    )
    .await;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_client_documents(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let id: ClientId = parse_id(&id, "client")?;
    state.ports.clients.get_client(id).await?;
    Ok(Json(state.ports.documents.list_for_client(id).await?))
}

/// Removes the stored file, then its metadata
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: DocumentId = parse_id(&id, "document")?;
    let document = state.ports.documents.get_document(id).await?;

    match state.ports.document_store.as_ref() {
        Some(store) => store.delete(&document.storage_key).await?,
        None => warn!(storage_key = %document.storage_key, "Document storage is not configured, stored file kept"),
    }
    state.ports.documents.delete_document(id).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::DocumentDeleted,
            format!("Document deleted: {}", document.file_name),
        )
        .for_entity(EntityType::Document, id)
        .with_metadata(json!({ "client_id": document.client_id })),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
