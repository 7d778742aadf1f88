//! Learning-platform domain module (event-sourced).
//!
//! This crate contains the business rules for courses and lessons,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod course;
pub mod lesson;

pub use course::{
    Course, CourseCommand, CourseCreated, CourseDeleted, CourseEvent, CourseId, CourseUpdated,
    CreateCourse, DeleteCourse, UpdateCourse,
};
pub use lesson::{
    CompleteLesson, CreateLesson, DeleteLesson, Lesson, LessonCommand, LessonCompleted,
    LessonCreated, LessonDeleted, LessonEvent, LessonId, LessonUpdated, UpdateLesson,
};

/// Stream type tag for course aggregates.
pub const COURSE_AGGREGATE_TYPE: &str = "lms.course";
/// Stream type tag for lesson aggregates.
pub const LESSON_AGGREGATE_TYPE: &str = "lms.lesson";
