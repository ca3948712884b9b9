use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockbook_core::ItemId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

const ITEM_CREATED: &str = "item created";
const ITEM_UPDATED: &str = "item updated";
const ITEM_DELETED: &str = "item deleted";

pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(list_items)
                .post(create_item)
                .put(update_item)
                .delete(delete_item),
        )
        .route("/:item_id/records", get(item_records))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::ItemRequest>,
) -> axum::response::Response {
    match services
        .create_item(caller.owner(), &body.category_name, &body.name, body.quantity)
        .await
    {
        Ok(_row) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "message": ITEM_CREATED })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ItemListQuery>,
) -> axum::response::Response {
    match services.list_items(caller.owner(), &query.category_name).await {
        Ok(items) => (
            StatusCode::OK,
            Json(items.iter().map(dto::item_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ItemKeyQuery>,
    Json(body): Json<dto::ItemRequest>,
) -> axum::response::Response {
    match services
        .update_item(
            caller.owner(),
            query.item_id,
            &body.name,
            &body.category_name,
            body.quantity,
        )
        .await
    {
        Ok(_row) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": ITEM_UPDATED })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ItemKeyQuery>,
) -> axum::response::Response {
    match services.delete_item(caller.owner(), query.item_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": ITEM_DELETED })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn item_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(item_id): Path<String>,
) -> axum::response::Response {
    let item_id: ItemId = match item_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id")
        }
    };

    match services.item_records(caller.owner(), item_id).await {
        Ok(views) => (
            StatusCode::OK,
            Json(views.iter().map(dto::record_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
