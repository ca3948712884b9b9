use axum::{routing::get, Router};

pub mod auth;
pub mod category;
pub mod item;
pub mod record;
pub mod system;

/// Router for all authenticated (caller-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/category", category::router())
        .nest("/item", item::router())
        .nest("/item-record", record::router())
        .nest("/auth", auth::router())
}
