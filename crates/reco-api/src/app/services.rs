//! Composition root: event store, history projection, recommendation engine.

use std::sync::Arc;

use uuid::Uuid;

use campus_core::ExpectedVersion;
use campus_events::Projector;
use campus_infra::event_store::{
    EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent,
};
use campus_reco::{
    HttpLmsClient, InMemoryLearnerHistoryStore, LEARNER_AGGREGATE_TYPE, LearnerHistoryProjection,
    LearnerLessonCompleted, Recommendation, RecommendationEngine, RecommendationsConfig,
    learner_stream_id,
};

pub struct AppServices {
    store: Arc<InMemoryEventStore>,
    history: Arc<InMemoryLearnerHistoryStore>,
    projection: LearnerHistoryProjection<Arc<InMemoryLearnerHistoryStore>>,
    engine: RecommendationEngine<HttpLmsClient, Arc<InMemoryLearnerHistoryStore>>,
}

pub fn build_services() -> AppServices {
    AppServices::new(HttpLmsClient::from_env(), RecommendationsConfig::from_env())
}

impl AppServices {
    pub fn new(gateway: HttpLmsClient, config: RecommendationsConfig) -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let history = Arc::new(InMemoryLearnerHistoryStore::new());
        let projection = LearnerHistoryProjection::new(history.clone());
        let engine = RecommendationEngine::new(gateway, history.clone(), config);

        Self {
            store,
            history,
            projection,
            engine,
        }
    }

    /// Record a relayed completion event.
    ///
    /// The event is appended to the learner's stream (no rehydrated writer,
    /// so no version expectation) and then projected synchronously into the
    /// history read model.
    pub fn ingest(
        &self,
        event: LearnerLessonCompleted,
    ) -> Result<StoredEvent, EventStoreError> {
        let stream_id = learner_stream_id(&event.user_id);
        let uncommitted =
            UncommittedEvent::from_typed(stream_id, LEARNER_AGGREGATE_TYPE, Uuid::now_v7(), &event)?;

        let committed = self.store.append(vec![uncommitted], ExpectedVersion::Any)?;

        for stored in &committed {
            if let Err(e) = self.projection.apply(&stored.to_envelope()) {
                tracing::error!(
                    user_id = %event.user_id,
                    "learner history projection failed: {e}"
                );
            }
        }

        committed.into_iter().next().ok_or_else(|| {
            EventStoreError::InvalidAppend("append committed no events".to_string())
        })
    }

    pub async fn next_course(&self, user_id: &str) -> Option<Recommendation> {
        self.engine.next_course(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_reco::LearnerHistoryStore;
    use chrono::Utc;

    fn services() -> AppServices {
        AppServices::new(
            HttpLmsClient::new("http://localhost:0"),
            RecommendationsConfig::default(),
        )
    }

    fn completion(user_id: &str, lesson_id: &str) -> LearnerLessonCompleted {
        LearnerLessonCompleted {
            user_id: user_id.to_string(),
            lesson_id: lesson_id.to_string(),
            course_id: "c1".to_string(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn ingest_appends_to_the_learner_stream() {
        let s = services();

        let first = s.ingest(completion("user-1", "l1")).unwrap();
        let second = s.ingest(completion("user-1", "l2")).unwrap();

        // One stream per user, sequence numbers advance.
        assert_eq!(first.aggregate_id, learner_stream_id("user-1"));
        assert_eq!(first.sequence_number, 1);
        assert_eq!(second.sequence_number, 2);
    }

    #[test]
    fn ingest_projects_into_history_synchronously() {
        let s = services();
        s.ingest(completion("user-1", "l1")).unwrap();
        s.ingest(completion("user-1", "l1")).unwrap();

        // Duplicates are two independent rows, and the log matches.
        assert_eq!(s.history.for_user("user-1").len(), 2);
        let stream = s.store.load_stream(learner_stream_id("user-1")).unwrap();
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn different_users_get_independent_streams() {
        let s = services();
        let a = s.ingest(completion("user-a", "l1")).unwrap();
        let b = s.ingest(completion("user-b", "l1")).unwrap();

        assert_ne!(a.aggregate_id, b.aggregate_id);
        assert_eq!(a.sequence_number, 1);
        assert_eq!(b.sequence_number, 1);
    }
}
