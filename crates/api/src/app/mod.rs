//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/service wiring and the session cache
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use stockbook_auth::Hs256TokenValidator;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(jwt_secret: String) -> Router {
    let sessions = services::build_session_cache();
    let auth_state = middleware::AuthState {
        validator: Arc::new(Hs256TokenValidator::new(jwt_secret.as_bytes())),
        sessions: sessions.clone(),
    };

    let services = Arc::new(services::build_services().await);

    // Caller-scoped routes: the bearer token resolves the owner id.
    let api = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ))
            .layer(Extension(services))
            .layer(Extension(sessions)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
}
