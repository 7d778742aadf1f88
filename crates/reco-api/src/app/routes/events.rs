use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/lesson_completed", post(lesson_completed))
}

pub async fn lesson_completed(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LessonCompletedEnvelope>,
) -> axum::response::Response {
    let event = match dto::parse_event(body.event, Utc::now()) {
        Ok(event) => event,
        Err(message) => {
            return errors::json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_event", message);
        }
    };

    match services.ingest(event) {
        Ok(stored) => {
            let payload = stored.payload;
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "message": "Event received and processed",
                    "event_id": stored.event_id,
                    "user_id": payload.get("user_id"),
                    "lesson_id": payload.get("lesson_id"),
                    "course_id": payload.get("course_id"),
                })),
            )
                .into_response()
        }
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            format!("{e}"),
        ),
    }
}
