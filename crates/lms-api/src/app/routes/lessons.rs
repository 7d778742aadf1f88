use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use campus_core::AggregateId;
use campus_lms::{
    CourseId, CreateLesson, DeleteLesson, LessonCommand, LessonId, UpdateLesson,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_lesson).get(list_lessons))
        .route(
            "/:id",
            get(get_lesson).put(update_lesson).delete(delete_lesson),
        )
        .route("/:id/complete", post(complete_lesson))
}

fn parse_lesson_id(id: &str) -> Result<LessonId, axum::response::Response> {
    id.parse::<AggregateId>().map(LessonId::new).map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid lesson id")
    })
}

pub async fn create_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateLessonRequest>,
) -> axum::response::Response {
    let course_id: CourseId = match body.course_id.parse::<AggregateId>() {
        Ok(v) => CourseId::new(v),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid course id");
        }
    };
    let lesson_id = LessonId::new(AggregateId::new());

    let cmd = LessonCommand::CreateLesson(CreateLesson {
        lesson_id,
        course_id,
        title: body.title,
        content: body.content,
        order: body.order,
        occurred_at: Utc::now(),
    });

    if let Err(e) = services.dispatch_lesson(&cmd) {
        return errors::dispatch_error_to_response(e);
    }

    match services.catalog().lesson(&lesson_id) {
        Some(row) => (StatusCode::CREATED, Json(dto::lesson_to_json(&row))).into_response(),
        None => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "projection_lag",
            "lesson not visible after create",
        ),
    }
}

pub async fn list_lessons(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LessonListQuery>,
) -> axum::response::Response {
    let lessons = match query.course_id {
        Some(course_id) => {
            let course_id = match course_id.parse::<AggregateId>() {
                Ok(v) => CourseId::new(v),
                Err(_) => {
                    return errors::json_error(
                        StatusCode::BAD_REQUEST,
                        "invalid_id",
                        "invalid course id",
                    );
                }
            };
            services.catalog().lessons_for_course(&course_id)
        }
        None => services.catalog().lessons(),
    };

    let items = lessons.iter().map(dto::lesson_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(items)).into_response()
}

pub async fn get_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let lesson_id = match parse_lesson_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().lesson(&lesson_id) {
        Some(row) => (StatusCode::OK, Json(dto::lesson_to_json(&row))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "lesson not found"),
    }
}

pub async fn update_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateLessonRequest>,
) -> axum::response::Response {
    let lesson_id = match parse_lesson_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = LessonCommand::UpdateLesson(UpdateLesson {
        lesson_id,
        title: body.title,
        content: body.content,
        order: body.order,
        occurred_at: Utc::now(),
    });

    if let Err(e) = services.dispatch_lesson(&cmd) {
        return errors::dispatch_error_to_response(e);
    }

    match services.catalog().lesson(&lesson_id) {
        Some(row) => (StatusCode::OK, Json(dto::lesson_to_json(&row))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "lesson not found"),
    }
}

pub async fn delete_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let lesson_id = match parse_lesson_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = LessonCommand::DeleteLesson(DeleteLesson {
        lesson_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch_lesson(&cmd) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn complete_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<dto::CompleteLessonRequest>>,
) -> axum::response::Response {
    let lesson_id = match parse_lesson_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let user_id = body
        .and_then(|Json(b)| b.user_id)
        .or_else(|| {
            headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        });

    let Some(user_id) = user_id else {
        return errors::json_error(StatusCode::BAD_REQUEST, "missing_user_id", "User ID is required");
    };

    match services.complete_lesson(lesson_id, user_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Lesson completed successfully" })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
