//! Automation triggers
//!
//! The same jobs the `crm-automation` binary runs from cron, exposed so the
//! agent can run them on demand or preview them with `dry_run`.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use domain_automation::{JobKind, RunReport, TemplateMessageResult};

use crate::dto::automation::{RunJobRequest, SendWhatsAppRequest};
use crate::error::ApiError;
use crate::handlers::optional_body;
use crate::AppState;

async fn run_job(
    state: &AppState,
    kind: JobKind,
    request: Result<Json<RunJobRequest>, JsonRejection>,
) -> Result<Json<RunReport>, ApiError> {
    let request = optional_body(request)?;
    let report = state.runner.run(kind, request.date, request.dry_run).await?;
    info!(
        job = kind.as_str(),
        matched = report.matched,
        sent = report.sent,
        failed = report.failed,
        dry_run = report.dry_run,
        "Automation job finished"
    );
    Ok(Json(report))
}

pub async fn run_birthdays(
    State(state): State<AppState>,
    request: Result<Json<RunJobRequest>, JsonRejection>,
) -> Result<Json<RunReport>, ApiError> {
    run_job(&state, JobKind::Birthdays, request).await
}

pub async fn run_renewals(
    State(state): State<AppState>,
    request: Result<Json<RunJobRequest>, JsonRejection>,
) -> Result<Json<RunReport>, ApiError> {
    run_job(&state, JobKind::Renewals, request).await
}

/// Sends one template message to a client
pub async fn send_whatsapp(
    State(state): State<AppState>,
    Json(request): Json<SendWhatsAppRequest>,
) -> Result<Json<TemplateMessageResult>, ApiError> {
    let result = state.runner.send_template_message(&request.into()).await?;
    Ok(Json(result))
}
