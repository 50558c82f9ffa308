//! Login and current-user handlers

use axum::{extract::State, Extension, Json};
use chrono::DateTime;
use tracing::{info, warn};

use crate::auth::{authenticate, Claims};
use crate::dto::auth::{LoginRequest, LoginResponse, MeResponse};
use crate::error::ApiError;
use crate::handlers::validated;
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = validated(request)?;
    let token = authenticate(&state.config, &request.email, &request.password).map_err(|e| {
        warn!(email = %request.email, error = %e, "Login failed");
        e
    })?;
    info!(email = %request.email, "Agent logged in");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.config.jwt_expiration_secs,
    }))
}

pub async fn me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    Json(MeResponse {
        email: claims.sub,
        roles: claims.roles,
        expires_at: DateTime::from_timestamp(claims.exp, 0),
    })
}
