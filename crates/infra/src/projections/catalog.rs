//! Course/lesson catalog projection and its query surface.
//!
//! One projection manages the three denormalized tables of the upstream
//! service: courses, lessons, completions. Mapping per event:
//!
//! - `Created` → insert row
//! - `Updated` → patch only the fields present in the payload
//! - `Deleted` → remove the row for that aggregate id (completions stay)
//! - `Completed` → append one completion row (accumulate, never dedup)

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use campus_events::{EventEnvelope, ProjectionError, Projector};
use campus_lms::{
    COURSE_AGGREGATE_TYPE, CourseEvent, CourseId, LESSON_AGGREGATE_TYPE, LessonEvent, LessonId,
};

use crate::read_model::{CompletionLog, CompletionRecord, ReadModelStore};

/// Queryable course row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseReadModel {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Queryable lesson row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonReadModel {
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub title: String,
    pub content: Option<String>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-course completion summary for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseCompletionStat {
    pub course_id: CourseId,
    pub title: String,
    pub completion_percentage: f64,
}

/// Aggregated learning stats for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub user_id: String,
    pub total_lessons_completed: usize,
    pub total_courses_enrolled: usize,
    pub courses: Vec<CourseCompletionStat>,
}

/// Projection maintaining the course/lesson/completion read models.
pub struct CatalogProjection<CS, LS, CL>
where
    CS: ReadModelStore<CourseId, CourseReadModel>,
    LS: ReadModelStore<LessonId, LessonReadModel>,
    CL: CompletionLog,
{
    courses: CS,
    lessons: LS,
    completions: CL,
}

impl<CS, LS, CL> CatalogProjection<CS, LS, CL>
where
    CS: ReadModelStore<CourseId, CourseReadModel>,
    LS: ReadModelStore<LessonId, LessonReadModel>,
    CL: CompletionLog,
{
    pub fn new(courses: CS, lessons: LS, completions: CL) -> Self {
        Self {
            courses,
            lessons,
            completions,
        }
    }

    // --- queries ------------------------------------------------------

    pub fn course(&self, course_id: &CourseId) -> Option<CourseReadModel> {
        self.courses.get(course_id)
    }

    /// All courses, oldest first.
    pub fn courses(&self) -> Vec<CourseReadModel> {
        let mut rows = self.courses.list();
        rows.sort_by_key(|c| (c.created_at, *c.course_id.0.as_uuid()));
        rows
    }

    pub fn lesson(&self, lesson_id: &LessonId) -> Option<LessonReadModel> {
        self.lessons.get(lesson_id)
    }

    /// All lessons, ordered by (course, order, created_at).
    pub fn lessons(&self) -> Vec<LessonReadModel> {
        let mut rows = self.lessons.list();
        rows.sort_by_key(|l| (*l.course_id.0.as_uuid(), l.order, l.created_at));
        rows
    }

    /// Lessons of one course, ordered by their position.
    pub fn lessons_for_course(&self, course_id: &CourseId) -> Vec<LessonReadModel> {
        let mut rows: Vec<_> = self
            .lessons
            .list()
            .into_iter()
            .filter(|l| l.course_id == *course_id)
            .collect();
        rows.sort_by_key(|l| (l.order, l.created_at));
        rows
    }

    /// Completion percentage of a course for one user.
    ///
    /// Duplicate completions of the same lesson collapse to one; a course
    /// with no lessons is 0% complete. The result is rounded to two
    /// decimals.
    pub fn completion_percentage(&self, course_id: &CourseId, user_id: &str) -> f64 {
        let lesson_count = self.lessons_for_course(course_id).len();
        if lesson_count == 0 {
            return 0.0;
        }

        let mut completed: Vec<LessonId> = self
            .completions
            .all()
            .into_iter()
            .filter(|r| r.course_id == *course_id && r.user_id == user_id)
            .map(|r| r.lesson_id)
            .collect();
        completed.sort_by_key(|id| *id.0.as_uuid());
        completed.dedup();

        round2(completed.len() as f64 / lesson_count as f64 * 100.0)
    }

    /// Aggregated stats for one user across every course they have
    /// completions in. Courses whose read-model row has been deleted are
    /// not reported, though their completion rows still count toward
    /// `total_lessons_completed`.
    pub fn user_stats(&self, user_id: &str) -> UserStats {
        let completions = self.completions.for_user(user_id);

        let mut lesson_ids: Vec<LessonId> = completions.iter().map(|r| r.lesson_id).collect();
        lesson_ids.sort_by_key(|id| *id.0.as_uuid());
        lesson_ids.dedup();

        let mut course_ids: Vec<CourseId> = completions.iter().map(|r| r.course_id).collect();
        course_ids.sort_by_key(|id| *id.0.as_uuid());
        course_ids.dedup();

        let mut courses: Vec<(CourseReadModel, CourseCompletionStat)> = course_ids
            .into_iter()
            .filter_map(|course_id| {
                let row = self.courses.get(&course_id)?;
                let stat = CourseCompletionStat {
                    course_id,
                    title: row.title.clone(),
                    completion_percentage: self.completion_percentage(&course_id, user_id),
                };
                Some((row, stat))
            })
            .collect();
        courses.sort_by_key(|(row, _)| (row.created_at, *row.course_id.0.as_uuid()));

        let courses: Vec<CourseCompletionStat> =
            courses.into_iter().map(|(_, stat)| stat).collect();

        UserStats {
            user_id: user_id.to_string(),
            total_lessons_completed: lesson_ids.len(),
            total_courses_enrolled: courses.len(),
            courses,
        }
    }

    // --- event application --------------------------------------------

    fn apply_course_event(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        let ev: CourseEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let course_id = match &ev {
            CourseEvent::CourseCreated(e) => e.course_id,
            CourseEvent::CourseUpdated(e) => e.course_id,
            CourseEvent::CourseDeleted(e) => e.course_id,
        };
        if course_id.0 != envelope.aggregate_id() {
            return Err(ProjectionError::InvalidEvent(
                "event course_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            CourseEvent::CourseCreated(e) => {
                self.courses.upsert(
                    e.course_id,
                    CourseReadModel {
                        course_id: e.course_id,
                        title: e.title,
                        description: e.description,
                        instructor_id: e.instructor_id,
                        created_at: e.occurred_at,
                        updated_at: None,
                    },
                );
            }
            CourseEvent::CourseUpdated(e) => {
                if let Some(mut row) = self.courses.get(&e.course_id) {
                    if let Some(title) = e.title {
                        row.title = title;
                    }
                    if let Some(description) = e.description {
                        row.description = Some(description);
                    }
                    row.updated_at = Some(e.occurred_at);
                    self.courses.upsert(e.course_id, row);
                }
            }
            CourseEvent::CourseDeleted(e) => {
                self.courses.remove(&e.course_id);
            }
        }

        Ok(())
    }

    fn apply_lesson_event(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        let ev: LessonEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let lesson_id = match &ev {
            LessonEvent::LessonCreated(e) => e.lesson_id,
            LessonEvent::LessonUpdated(e) => e.lesson_id,
            LessonEvent::LessonDeleted(e) => e.lesson_id,
            LessonEvent::LessonCompleted(e) => e.lesson_id,
        };
        if lesson_id.0 != envelope.aggregate_id() {
            return Err(ProjectionError::InvalidEvent(
                "event lesson_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            LessonEvent::LessonCreated(e) => {
                self.lessons.upsert(
                    e.lesson_id,
                    LessonReadModel {
                        lesson_id: e.lesson_id,
                        course_id: e.course_id,
                        title: e.title,
                        content: e.content,
                        order: e.order,
                        created_at: e.occurred_at,
                        updated_at: None,
                    },
                );
            }
            LessonEvent::LessonUpdated(e) => {
                if let Some(mut row) = self.lessons.get(&e.lesson_id) {
                    if let Some(title) = e.title {
                        row.title = title;
                    }
                    if let Some(content) = e.content {
                        row.content = Some(content);
                    }
                    if let Some(order) = e.order {
                        row.order = order;
                    }
                    row.updated_at = Some(e.occurred_at);
                    self.lessons.upsert(e.lesson_id, row);
                }
            }
            LessonEvent::LessonDeleted(e) => {
                self.lessons.remove(&e.lesson_id);
            }
            LessonEvent::LessonCompleted(e) => {
                self.completions.append(CompletionRecord {
                    user_id: e.user_id,
                    lesson_id: e.lesson_id,
                    course_id: e.course_id,
                    completed_at: e.completed_at,
                });
            }
        }

        Ok(())
    }
}

impl<CS, LS, CL> Projector for CatalogProjection<CS, LS, CL>
where
    CS: ReadModelStore<CourseId, CourseReadModel>,
    LS: ReadModelStore<LessonId, LessonReadModel>,
    CL: CompletionLog,
{
    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        match envelope.aggregate_type() {
            t if t == COURSE_AGGREGATE_TYPE => self.apply_course_event(envelope),
            t if t == LESSON_AGGREGATE_TYPE => self.apply_lesson_event(envelope),
            _ => Ok(()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
