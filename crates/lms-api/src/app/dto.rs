//! Request DTOs and JSON mapping helpers.

use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use campus_infra::projections::{CourseReadModel, LessonReadModel, UserStats};

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub course_id: String,
    pub title: String,
    pub content: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteLessonRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CourseDetailQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LessonListQuery {
    pub course_id: Option<String>,
}

pub fn course_to_json(course: &CourseReadModel, completion_percentage: Option<f64>) -> JsonValue {
    json!({
        "id": course.course_id.to_string(),
        "title": course.title,
        "description": course.description,
        "instructor_id": course.instructor_id,
        "created_at": course.created_at,
        "completion_percentage": completion_percentage,
    })
}

pub fn lesson_to_json(lesson: &LessonReadModel) -> JsonValue {
    json!({
        "id": lesson.lesson_id.to_string(),
        "course_id": lesson.course_id.to_string(),
        "title": lesson.title,
        "content": lesson.content,
        "order": lesson.order,
        "created_at": lesson.created_at,
    })
}

pub fn stats_to_json(stats: &UserStats) -> JsonValue {
    json!({
        "user_id": stats.user_id,
        "total_lessons_completed": stats.total_lessons_completed,
        "total_courses_enrolled": stats.total_courses_enrolled,
        "courses": stats
            .courses
            .iter()
            .map(|c| json!({
                "course_id": c.course_id.to_string(),
                "title": c.title,
                "completion_percentage": c.completion_percentage,
            }))
            .collect::<Vec<_>>(),
    })
}
