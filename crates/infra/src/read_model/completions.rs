use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use campus_lms::{CourseId, LessonId};

/// One completion fact per committed `LessonCompleted` event.
///
/// Duplicates are legal: the same (user, lesson) pair may appear any number
/// of times. Deduplication happens at query time, never at write time.
/// Rows are kept when their lesson or course is deleted (no cascade).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub user_id: String,
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub completed_at: DateTime<Utc>,
}

/// Append-only log of completion rows.
pub trait CompletionLog: Send + Sync {
    fn append(&self, record: CompletionRecord);
    fn all(&self) -> Vec<CompletionRecord>;

    fn for_user(&self, user_id: &str) -> Vec<CompletionRecord> {
        self.all()
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect()
    }
}

impl<L> CompletionLog for Arc<L>
where
    L: CompletionLog + ?Sized,
{
    fn append(&self, record: CompletionRecord) {
        (**self).append(record)
    }

    fn all(&self) -> Vec<CompletionRecord> {
        (**self).all()
    }
}

/// In-memory completion log for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCompletionLog {
    inner: RwLock<Vec<CompletionRecord>>,
}

impl InMemoryCompletionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompletionLog for InMemoryCompletionLog {
    fn append(&self, record: CompletionRecord) {
        if let Ok(mut rows) = self.inner.write() {
            rows.push(record);
        }
    }

    fn all(&self) -> Vec<CompletionRecord> {
        match self.inner.read() {
            Ok(rows) => rows.clone(),
            Err(_) => vec![],
        }
    }
}
