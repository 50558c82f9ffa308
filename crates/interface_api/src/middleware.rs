//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::{bearer_token, validate_token, Claims};
use crate::error::ApiError;
use crate::AppState;

/// Authentication middleware
///
/// Validates the bearer token and stores its claims in the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let claims = bearer_token(header)
        .and_then(|token| validate_token(token, &state.config.jwt_secret))
        .map_err(|e| {
            warn!(uri = %request.uri(), error = %e, "Rejected unauthenticated request");
            ApiError::from(e)
        })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Audit logging middleware
///
/// Logs method, URI, user, status and duration of every API request.
pub async fn audit_middleware(
    State(_state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user = request
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Instant::now();
    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        user = %user,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "API request"
    );

    response
}

/// Drops cached dashboard statistics after any successful write
pub async fn dashboard_invalidation(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mutating = !matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    );
    let response = next.run(request).await;

    if mutating && response.status().is_success() {
        debug!("Invalidating dashboard cache");
        state.dashboard_cache.clear();
    }
    response
}
