pub mod catalog;

pub use catalog::{
    CatalogProjection, CourseCompletionStat, CourseReadModel, LessonReadModel, UserStats,
};
