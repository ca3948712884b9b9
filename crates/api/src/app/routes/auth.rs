use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use stockbook_auth::TokenCache;

use crate::middleware;

const SIGNED_OUT: &str = "signed out";

pub fn router() -> Router {
    Router::new().route("/logout", post(logout))
}

/// Drops the caller's session-cache entry. The token itself stays valid
/// until it expires; the next request just pays for full validation again.
pub async fn logout(
    Extension(sessions): Extension<Arc<dyn TokenCache>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Ok(token) = middleware::extract_bearer(&headers) {
        sessions.remove(token);
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": SIGNED_OUT })),
    )
        .into_response()
}
