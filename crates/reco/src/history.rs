//! Learner history: the downstream read model fed by relayed events.
//!
//! Each relayed completion lands as one integration event in the local
//! event store (stream per learner, derived from the external user id) and
//! is projected into one history row. Rows are an independent copy of the
//! upstream facts: ids are opaque strings with no foreign keys back to the
//! learning platform, and a completion existing upstream with no row here
//! is an accepted inconsistency of the best-effort relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use campus_core::AggregateId;
use campus_events::{Event, EventEnvelope, ProjectionError, Projector};

/// Stream type tag for learner streams.
pub const LEARNER_AGGREGATE_TYPE: &str = "reco.learner";

/// Derive the learner's stream id from the external user id.
///
/// UUIDv5 keeps the mapping deterministic: every relayed completion for the
/// same user appends to the same stream.
pub fn learner_stream_id(user_id: &str) -> AggregateId {
    AggregateId::from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, user_id.as_bytes()))
}

/// Integration event: a lesson completion relayed from the learning
/// platform. Ids are the upstream's, carried as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerLessonCompleted {
    pub user_id: String,
    pub lesson_id: String,
    pub course_id: String,
    pub completed_at: DateTime<Utc>,
}

impl Event for LearnerLessonCompleted {
    fn event_type(&self) -> &'static str {
        "reco.learner.lesson_completed"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

/// One history row per received completion event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerHistoryRecord {
    pub user_id: String,
    pub lesson_id: String,
    pub course_id: String,
    pub completed_at: DateTime<Utc>,
}

/// Append-only learner history store.
pub trait LearnerHistoryStore: Send + Sync {
    fn append(&self, record: LearnerHistoryRecord);

    /// History rows for one user, most recent completion first.
    fn for_user(&self, user_id: &str) -> Vec<LearnerHistoryRecord>;
}

impl<S> LearnerHistoryStore for Arc<S>
where
    S: LearnerHistoryStore + ?Sized,
{
    fn append(&self, record: LearnerHistoryRecord) {
        (**self).append(record)
    }

    fn for_user(&self, user_id: &str) -> Vec<LearnerHistoryRecord> {
        (**self).for_user(user_id)
    }
}

/// In-memory learner history for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLearnerHistoryStore {
    inner: RwLock<Vec<LearnerHistoryRecord>>,
}

impl InMemoryLearnerHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LearnerHistoryStore for InMemoryLearnerHistoryStore {
    fn append(&self, record: LearnerHistoryRecord) {
        if let Ok(mut rows) = self.inner.write() {
            rows.push(record);
        }
    }

    fn for_user(&self, user_id: &str) -> Vec<LearnerHistoryRecord> {
        let mut rows: Vec<_> = match self.inner.read() {
            Ok(rows) => rows.iter().filter(|r| r.user_id == user_id).cloned().collect(),
            Err(_) => return vec![],
        };
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        rows
    }
}

/// Projection mapping relayed completion events to history rows.
pub struct LearnerHistoryProjection<S>
where
    S: LearnerHistoryStore,
{
    store: S,
}

impl<S> LearnerHistoryProjection<S>
where
    S: LearnerHistoryStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> Projector for LearnerHistoryProjection<S>
where
    S: LearnerHistoryStore,
{
    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != LEARNER_AGGREGATE_TYPE {
            return Ok(());
        }

        let ev: LearnerLessonCompleted = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        self.store.append(LearnerHistoryRecord {
            user_id: ev.user_id,
            lesson_id: ev.lesson_id,
            course_id: ev.course_id,
            completed_at: ev.completed_at,
        });

        Ok(())
    }
}
