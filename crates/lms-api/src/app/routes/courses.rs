use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use campus_core::AggregateId;
use campus_lms::{CourseCommand, CourseId, CreateCourse, DeleteCourse, UpdateCourse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_course).get(list_courses))
        .route(
            "/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
}

fn parse_course_id(id: &str) -> Result<CourseId, axum::response::Response> {
    id.parse::<AggregateId>().map(CourseId::new).map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid course id")
    })
}

pub async fn create_course(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateCourseRequest>,
) -> axum::response::Response {
    let course_id = CourseId::new(AggregateId::new());

    let cmd = CourseCommand::CreateCourse(CreateCourse {
        course_id,
        title: body.title,
        description: body.description,
        instructor_id: body.instructor_id,
        occurred_at: Utc::now(),
    });

    if let Err(e) = services.dispatch_course(&cmd) {
        return errors::dispatch_error_to_response(e);
    }

    match services.catalog().course(&course_id) {
        Some(row) => {
            (StatusCode::CREATED, Json(dto::course_to_json(&row, None))).into_response()
        }
        None => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "projection_lag",
            "course not visible after create",
        ),
    }
}

pub async fn list_courses(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services
        .catalog()
        .courses()
        .iter()
        .map(|c| dto::course_to_json(c, None))
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(items)).into_response()
}

pub async fn get_course(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::CourseDetailQuery>,
) -> axum::response::Response {
    let course_id = match parse_course_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().course(&course_id) {
        Some(row) => {
            let completion = query
                .user_id
                .map(|user_id| services.catalog().completion_percentage(&course_id, &user_id));
            (StatusCode::OK, Json(dto::course_to_json(&row, completion))).into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "course not found"),
    }
}

pub async fn update_course(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateCourseRequest>,
) -> axum::response::Response {
    let course_id = match parse_course_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = CourseCommand::UpdateCourse(UpdateCourse {
        course_id,
        title: body.title,
        description: body.description,
        occurred_at: Utc::now(),
    });

    if let Err(e) = services.dispatch_course(&cmd) {
        return errors::dispatch_error_to_response(e);
    }

    match services.catalog().course(&course_id) {
        Some(row) => (StatusCode::OK, Json(dto::course_to_json(&row, None))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "course not found"),
    }
}

pub async fn delete_course(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let course_id = match parse_course_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = CourseCommand::DeleteCourse(DeleteCourse {
        course_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch_course(&cmd) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
