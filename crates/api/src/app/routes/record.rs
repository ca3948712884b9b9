use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockbook_store::RecordKind;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

const RECORD_DELETED: &str = "stock record deleted";

pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(get_record).post(create_record).delete(delete_record),
        )
        .route("/all", get(history))
}

pub async fn create_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::ItemRecordRequest>,
) -> axum::response::Response {
    match services.post_record(caller.owner(), body.into_post_stock()).await {
        Ok(posted) => {
            let direction = match posted.record.kind {
                RecordKind::In => "stocked in",
                RecordKind::Out => "stocked out",
            };
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "message": format!("{} {direction}", posted.item.name),
                })),
            )
                .into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::RecordKeyQuery>,
) -> axum::response::Response {
    match services.record(caller.owner(), query.record_id).await {
        Ok(view) => (StatusCode::OK, Json(dto::record_to_json(&view))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.history(caller.owner()).await {
        Ok(views) => (
            StatusCode::OK,
            Json(views.iter().map(dto::record_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::RecordKeyQuery>,
) -> axum::response::Response {
    match services.delete_record(caller.owner(), query.record_id).await {
        Ok(deleted) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "message": RECORD_DELETED,
                "deleted_record_ids": deleted.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
