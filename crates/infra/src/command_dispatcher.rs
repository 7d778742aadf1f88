//! Command execution pipeline (application-level orchestration).
//!
//! The dispatcher orchestrates one command end-to-end:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (one aggregate stream)
//!   ↓
//! 2. Rehydrate aggregate (fold historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Append to store at the loaded version (optimistic concurrency check)
//!   ↓
//! 5. Invoke registered projectors synchronously, in commit order
//! ```
//!
//! Creation commands take the same path: a fresh stream loads empty, the
//! empty aggregate is rehydrated from nothing, and the append expects
//! version 0. Double-creation is rejected by the aggregate itself.
//!
//! On a concurrency conflict the whole load-apply-append cycle is retried a
//! bounded number of times before the conflict is surfaced to the caller.
//! Because the window between load and append is where conflicts are
//! *detected* (nothing is locked across it), a retry re-reads the stream and
//! re-applies the command against the latest state.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use campus_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use campus_events::{Command, EventEnvelope, Projector};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Bounded retry budget for optimistic-concurrency conflicts.
const MAX_DISPATCH_ATTEMPTS: u32 = 3;

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure that survived the retry budget.
    Concurrency(String),
    /// Domain validation failure (deterministic, nothing persisted).
    Validation(String),
    /// Domain invariant failure (deterministic, nothing persisted).
    InvariantViolation(String),
    /// The command targets an aggregate that does not exist (or is deleted).
    NotFound,
    /// Failed to deserialize historical event payloads into the aggregate
    /// event type.
    Deserialize(String),
    /// Persisting to the event store failed.
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Composed once at process start (the composition root) with the event
/// store and the full list of projectors, then shared by reference across
/// the request handlers. Projectors run synchronously inside `dispatch`, so
/// a read issued right after a successful command observes the updated read
/// model.
pub struct CommandDispatcher<S> {
    store: S,
    projectors: Vec<Arc<dyn Projector>>,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projectors: Vec::new(),
        }
    }

    /// Register a projector to be invoked for every committed event.
    pub fn with_projector(mut self, projector: Arc<dyn Projector>) -> Self {
        self.projectors.push(projector);
        self
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Dispatch a command through the full event-sourcing pipeline, retrying
    /// the load-apply-append cycle on concurrency conflicts.
    ///
    /// The target stream is taken from the command itself
    /// (`Command::target_aggregate_id`). `make_aggregate` constructs the
    /// empty aggregate instance used for rehydration; it is called once per
    /// attempt.
    ///
    /// Returns the committed `StoredEvent`s (with assigned sequence
    /// numbers). Commands that decide zero events commit nothing and invoke
    /// no projector.
    pub fn dispatch<A>(
        &self,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Command: Command,
        A::Event: campus_events::Event + Serialize + DeserializeOwned,
    {
        let aggregate_id = command.target_aggregate_id();

        let mut attempt = 1;
        loop {
            match self.dispatch_once::<A>(aggregate_id, aggregate_type, command, &make_aggregate) {
                Err(DispatchError::Concurrency(msg)) if attempt < MAX_DISPATCH_ATTEMPTS => {
                    tracing::warn!(
                        %aggregate_id,
                        attempt,
                        "concurrency conflict, retrying command: {msg}"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn dispatch_once<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: &impl Fn(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: campus_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        // 5) Project committed events synchronously, in commit order. The
        // events are already durable at this point; a projector failure
        // degrades the read model but does not fail the command.
        for stored in &committed {
            let envelope: EventEnvelope<JsonValue> = stored.to_envelope();
            for projector in &self.projectors {
                if let Err(e) = projector.apply(&envelope) {
                    tracing::error!(
                        %aggregate_id,
                        sequence_number = stored.sequence_number,
                        "projection apply failed: {e}"
                    );
                }
            }
        }

        Ok(committed)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Ensure the stream belongs to the requested aggregate and is
    // monotonically increasing by sequence number, even if a buggy backend
    // returns something else.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!("loaded stream contains wrong aggregate_id at index {idx}"),
            )));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!(
                    "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                    e.sequence_number
                ),
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}
