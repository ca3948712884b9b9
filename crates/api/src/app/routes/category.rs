use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

const CATEGORY_CREATED: &str = "custom category created";
const CATEGORY_UPDATED: &str = "custom category updated";
const CATEGORY_DELETED: &str = "custom category deleted";

pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(list_categories)
                .post(create_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/items", get(category_items))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.list_categories(caller.owner()).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(rows.iter().map(dto::category_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn category_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::CategoryItemsQuery>,
) -> axum::response::Response {
    match services.category_items(caller.owner(), query.category_id).await {
        Ok(items) => (
            StatusCode::OK,
            Json(items.iter().map(dto::item_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::CategoryRequest>,
) -> axum::response::Response {
    match services.create_category(caller.owner(), &body.name).await {
        Ok(_created) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "message": CATEGORY_CREATED })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::CategoryKeyQuery>,
    Json(body): Json<dto::CategoryRequest>,
) -> axum::response::Response {
    match services
        .rename_category(caller.owner(), query.category_id, &body.name)
        .await
    {
        Ok(_row) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": CATEGORY_UPDATED })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::CategoryKeyQuery>,
) -> axum::response::Response {
    match services.delete_category(caller.owner(), query.category_id).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "message": CATEGORY_DELETED })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
