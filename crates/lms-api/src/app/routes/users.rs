use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::services::AppServices;
use crate::app::dto;

pub fn router() -> Router {
    Router::new().route("/:id/stats", get(user_stats))
}

pub async fn user_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let stats = services.catalog().user_stats(&id);
    (StatusCode::OK, Json(dto::stats_to_json(&stats))).into_response()
}
