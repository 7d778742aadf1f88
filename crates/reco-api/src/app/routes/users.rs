use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/:id/next_course", get(next_course))
}

pub async fn next_course(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match services.next_course(&id).await {
        Some(recommendation) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "user_id": id,
                "recommended_course": {
                    "course_id": recommendation.course_id,
                    "title": recommendation.title,
                    "reason": recommendation.reason,
                }
            })),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "user_id": id,
                "message": "No recommendations available at this time",
            })),
        )
            .into_response(),
    }
}
