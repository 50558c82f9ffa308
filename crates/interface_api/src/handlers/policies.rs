//! Policy handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::info;

use core_kernel::{Page, PolicyInstanceId};
use domain_client::{Activity, ActivityType, EntityType};
use domain_policy::PolicyInstance;

use crate::dto::policy::{CreatePolicyRequest, PolicyListParams, RenewPolicyRequest, UpdatePolicyRequest};
use crate::error::ApiError;
use crate::handlers::{optional_body, parse_id, record_activity, validated};
use crate::AppState;

/// Lists policies by client, template, status or upcoming expiry
pub async fn list_policies(
    State(state): State<AppState>,
    Query(params): Query<PolicyListParams>,
) -> Result<Json<Page<PolicyInstance>>, ApiError> {
    let query = params.into_query(state.timezone.today());
    Ok(Json(state.ports.policies.list_policies(query).await?))
}

/// Issues a policy to a client from a template
pub async fn create_policy(
    State(state): State<AppState>,
    Json(request): Json<CreatePolicyRequest>,
) -> Result<(StatusCode, Json<PolicyInstance>), ApiError> {
    let request = validated(request)?;
    let template = state.ports.policy_templates.get_template(request.template_id).await?;
    let client = state.ports.clients.get_client(request.client_id).await?;

    let policy = PolicyInstance::from_template(&template, request.into_new(state.currency))?;
    let policy = state.ports.policies.create_policy(policy).await?;
    info!(policy_id = %policy.id, policy_number = %policy.policy_number, "Policy created");

    record_activity(
        &state,
        Activity::new(
            ActivityType::PolicyCreated,
            format!(
                "Policy {} ({}) issued to {}",
                policy.policy_number,
                template.name,
                client.full_name()
            ),
        )
        .for_entity(EntityType::Policy, policy.id)
        .with_metadata(json!({ "client_id": client.id, "template_id": template.id })),
    )
    .await;
    Ok((StatusCode::CREATED, Json(policy)))
}

pub async fn get_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PolicyInstance>, ApiError> {
    let id: PolicyInstanceId = parse_id(&id, "policy")?;
    Ok(Json(state.ports.policies.get_policy(id).await?))
}

pub async fn update_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePolicyRequest>,
) -> Result<Json<PolicyInstance>, ApiError> {
    let id: PolicyInstanceId = parse_id(&id, "policy")?;
    let update = validated(request)?.into_update(state.currency);
    let policy = state.ports.policies.get_policy(id).await?.apply(update)?;
    let policy = state.ports.policies.update_policy(policy).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::PolicyUpdated,
            format!("Policy {} updated", policy.policy_number),
        )
        .for_entity(EntityType::Policy, policy.id),
    )
    .await;
    Ok(Json(policy))
}

pub async fn delete_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: PolicyInstanceId = parse_id(&id, "policy")?;
    let policy = state.ports.policies.get_policy(id).await?;
    state.ports.policies.delete_policy(id).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::PolicyDeleted,
            format!("Policy {} deleted", policy.policy_number),
        )
        .for_entity(EntityType::Policy, id)
        .with_metadata(json!({ "client_id": policy.client_id })),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Renews an active or expired policy into a new active one
pub async fn renew_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Result<Json<RenewPolicyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PolicyInstance>), ApiError> {
    let id: PolicyInstanceId = parse_id(&id, "policy")?;
    let request = validated(optional_body(request)?)?;
    let mut policy = state.ports.policies.get_policy(id).await?;

    let renewed = policy.renew(request.into_request(state.currency))?;
    let old_number = policy.policy_number.clone();
    let renewed = state.ports.policies.save_renewal(policy, renewed).await?;
    info!(from = %old_number, to = %renewed.policy_number, "Policy renewed");

    record_activity(
        &state,
        Activity::new(
            ActivityType::PolicyRenewed,
            format!("Policy {} renewed as {}", old_number, renewed.policy_number),
        )
        .for_entity(EntityType::Policy, renewed.id)
        .with_metadata(json!({
            "renewed_from": id,
            "start_date": renewed.start_date,
            "end_date": renewed.end_date,
        })),
    )
    .await;
    Ok((StatusCode::CREATED, Json(renewed)))
}

pub async fn cancel_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PolicyInstance>, ApiError> {
    let id: PolicyInstanceId = parse_id(&id, "policy")?;
    let mut policy = state.ports.policies.get_policy(id).await?;
    policy.cancel()?;
    let policy = state.ports.policies.update_policy(policy).await?;

    record_activity(
        &state,
        Activity::new(
            ActivityType::PolicyCancelled,
            format!("Policy {} cancelled", policy.policy_number),
        )
        .for_entity(EntityType::Policy, policy.id),
    )
    .await;
    Ok(Json(policy))
}
