use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::auth::Claims;
use crate::error::AppError;

use super::AppState;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn authenticate(state: &AppState, req: &Request<Body>) -> Result<Claims, AppError> {
    let token = extract_bearer_token(req)
        .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;

    state.jwt_validator.validate(token)
}

/// Authentication middleware for user-facing routes.
///
/// Validates the bearer token and makes the claims available to handlers via
/// request extensions.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &req)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Authorization middleware for the administrative surface.
///
/// Every notification management operation requires the administrator role.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &req)?;

    if !claims.is_admin() {
        tracing::warn!(account_id = %claims.account_id(), "Non-admin caller rejected");
        return Err(AppError::Auth("Administrator role required".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
