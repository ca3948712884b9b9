use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use stockbook_auth::{TokenCache, TokenValidator};
use stockbook_core::OwnerId;

use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<dyn TokenValidator>,
    pub sessions: Arc<dyn TokenCache>,
}

/// Resolves the bearer token to an owner id, consulting the session cache
/// before falling back to full JWT validation. Hits refresh the cache
/// entry so active sessions stay warm.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let owner = match state.sessions.get(token) {
        Some(owner) => {
            state.sessions.put(token, &owner);
            owner
        }
        None => {
            let claims = state
                .validator
                .validate(token)
                .map_err(|_e| StatusCode::UNAUTHORIZED)?;
            let owner = OwnerId::new(claims.sub);
            state.sessions.put(token, &owner);
            owner
        }
    };

    req.extensions_mut().insert(CallerContext::new(owner));

    Ok(next.run(req).await)
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
