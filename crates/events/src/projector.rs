//! Synchronous projection seam (CQRS read-model consumers).

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::EventEnvelope;

/// Error raised by a projector while applying a committed event.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Failed to deserialize the envelope payload into the projector's
    /// event type.
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    /// The envelope metadata does not match the event payload (e.g. the
    /// payload targets a different aggregate than the envelope claims).
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

/// A projector maps committed events to read-model mutations.
///
/// Projectors implement the **CQRS read model pattern**: they transform
/// events (write model) into queryable state (read model). Read models are
/// **disposable** - events are the source of truth and a read model can be
/// rebuilt by replaying the log from scratch.
///
/// ## Invocation contract
///
/// Projectors are invoked by the command dispatcher **synchronously**, in
/// commit order, exactly once per committed event - there is no queue and no
/// background worker between append and projection. A read issued after a
/// successful command therefore observes the updated read model within the
/// same service.
///
/// Events the projector does not recognize (foreign `aggregate_type`) must
/// be ignored, not rejected, so multiple projectors can share one dispatcher.
///
/// ## Persistence
///
/// This trait doesn't define how read models are stored. Implementations
/// here keep state behind in-memory store traits; a SQL-backed store can be
/// swapped in without touching the projection logic.
pub trait Projector: Send + Sync {
    /// Apply a single committed event, updating the read model.
    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError>;
}

impl<P> Projector for std::sync::Arc<P>
where
    P: Projector + ?Sized,
{
    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        (**self).apply(envelope)
    }
}
