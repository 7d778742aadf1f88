//! Composition root: event store, projection, dispatcher, relay.
//!
//! Everything is constructed once at process start and shared by reference
//! through the router; there is no process-wide mutable registry.

use std::sync::Arc;

use campus_infra::command_dispatcher::{CommandDispatcher, DispatchError};
use campus_infra::event_store::{InMemoryEventStore, StoredEvent};
use campus_infra::projections::{CatalogProjection, CourseReadModel, LessonReadModel};
use campus_infra::read_model::{InMemoryCompletionLog, InMemoryReadModelStore};
use campus_lms::{
    COURSE_AGGREGATE_TYPE, CompleteLesson, Course, CourseCommand, CourseId, LESSON_AGGREGATE_TYPE,
    Lesson, LessonCommand, LessonCompleted, LessonEvent, LessonId,
};

use crate::relay::{CompletionEvent, CompletionRelay, HttpCompletionRelay};

pub type Catalog = CatalogProjection<
    Arc<InMemoryReadModelStore<CourseId, CourseReadModel>>,
    Arc<InMemoryReadModelStore<LessonId, LessonReadModel>>,
    Arc<InMemoryCompletionLog>,
>;

pub struct AppServices {
    dispatcher: CommandDispatcher<Arc<InMemoryEventStore>>,
    catalog: Arc<Catalog>,
    relay: Arc<dyn CompletionRelay>,
}

pub fn build_services() -> AppServices {
    AppServices::new(Arc::new(HttpCompletionRelay::from_env()))
}

impl AppServices {
    pub fn new(relay: Arc<dyn CompletionRelay>) -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let catalog = Arc::new(CatalogProjection::new(
            Arc::new(InMemoryReadModelStore::new()),
            Arc::new(InMemoryReadModelStore::new()),
            Arc::new(InMemoryCompletionLog::new()),
        ));
        let dispatcher = CommandDispatcher::new(store).with_projector(catalog.clone());

        Self {
            dispatcher,
            catalog,
            relay,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn dispatch_course(
        &self,
        command: &CourseCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch::<Course>(COURSE_AGGREGATE_TYPE, command, |id| {
                Course::empty(CourseId::new(id))
            })
    }

    pub fn dispatch_lesson(
        &self,
        command: &LessonCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch::<Lesson>(LESSON_AGGREGATE_TYPE, command, |id| {
                Lesson::empty(LessonId::new(id))
            })
    }

    /// Complete a lesson and forward the committed event downstream.
    ///
    /// The relay call is out-of-band: it shares no transaction with the
    /// local commit, and its failure is logged and swallowed. The caller
    /// sees success as soon as the completion is committed locally.
    pub async fn complete_lesson(
        &self,
        lesson_id: LessonId,
        user_id: String,
    ) -> Result<(), DispatchError> {
        let command = LessonCommand::CompleteLesson(CompleteLesson {
            lesson_id,
            user_id,
            occurred_at: chrono::Utc::now(),
        });
        let committed = self.dispatch_lesson(&command)?;

        for completed in completions_in(&committed) {
            let event = CompletionEvent {
                user_id: completed.user_id.clone(),
                lesson_id: completed.lesson_id.to_string(),
                course_id: completed.course_id.to_string(),
                completed_at: completed.completed_at,
            };
            if let Err(e) = self.relay.lesson_completed(&event).await {
                tracing::warn!(
                    lesson_id = %event.lesson_id,
                    "failed to relay lesson completion: {e}"
                );
            }
        }

        Ok(())
    }
}

fn completions_in(committed: &[StoredEvent]) -> Vec<LessonCompleted> {
    committed
        .iter()
        .filter_map(|stored| {
            match serde_json::from_value::<LessonEvent>(stored.payload.clone()) {
                Ok(LessonEvent::LessonCompleted(e)) => Some(e),
                Ok(_) => None,
                Err(e) => {
                    tracing::error!("failed to decode committed lesson event: {e}");
                    None
                }
            }
        })
        .collect()
}
