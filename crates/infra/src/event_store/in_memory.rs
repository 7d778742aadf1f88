use std::collections::HashMap;
use std::sync::RwLock;

use campus_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// In-memory append-only event store.
///
/// The version check and the append happen under one write lock, so two
/// racing appends against the same expected version resolve to exactly one
/// winner. Not optimized for large streams.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        // All events must target the same aggregate stream.
        let aggregate_id = events[0].aggregate_id;
        let aggregate_type = events[0].aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        let stream = streams.entry(aggregate_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // Enforce aggregate type stability across the stream.
        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        // Assign sequence numbers and append (append-only).
        let mut next = current + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn uncommitted(aggregate_id: AggregateId, event_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: "lms.course".to_string(),
            event_type: event_type.to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({"event_type": event_type}),
        }
    }

    #[test]
    fn first_append_creates_stream_at_version_one() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let committed = store
            .append(vec![uncommitted(id, "created")], ExpectedVersion::Exact(0))
            .unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);
        assert_eq!(store.load_stream(id).unwrap().len(), 1);
    }

    #[test]
    fn append_assigns_contiguous_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let committed = store
            .append(
                vec![
                    uncommitted(id, "created"),
                    uncommitted(id, "updated"),
                    uncommitted(id, "updated"),
                ],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let seqs: Vec<u64> = committed.iter().map(|e| e.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn version_mismatch_fails_and_appends_nothing() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(vec![uncommitted(id, "created")], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![uncommitted(id, "updated")], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(id).unwrap().len(), 1);
    }

    #[test]
    fn only_one_of_two_writers_at_same_version_wins() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![uncommitted(id, "created")], ExpectedVersion::Exact(0))
            .unwrap();

        // Both writers loaded the stream at version 1.
        let first = store.append(vec![uncommitted(id, "updated")], ExpectedVersion::Exact(1));
        let second = store.append(vec![uncommitted(id, "updated")], ExpectedVersion::Exact(1));

        assert!(first.is_ok());
        assert!(matches!(second, Err(EventStoreError::Concurrency(_))));
        assert_eq!(store.load_stream(id).unwrap().len(), 2);
    }

    #[test]
    fn any_expected_version_always_appends() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(vec![uncommitted(id, "received")], ExpectedVersion::Any)
            .unwrap();
        let committed = store
            .append(vec![uncommitted(id, "received")], ExpectedVersion::Any)
            .unwrap();

        assert_eq!(committed[0].sequence_number, 2);
    }

    #[test]
    fn aggregate_type_is_stable_per_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![uncommitted(id, "created")], ExpectedVersion::Exact(0))
            .unwrap();

        let mut foreign = uncommitted(id, "created");
        foreign.aggregate_type = "lms.lesson".to_string();
        let err = store
            .append(vec![foreign], ExpectedVersion::Exact(1))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn streams_are_independent() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        store
            .append(vec![uncommitted(a, "created")], ExpectedVersion::Exact(0))
            .unwrap();
        store
            .append(vec![uncommitted(b, "created")], ExpectedVersion::Exact(0))
            .unwrap();

        assert_eq!(store.load_stream(a).unwrap().len(), 1);
        assert_eq!(store.load_stream(b).unwrap().len(), 1);
        assert_eq!(store.load_stream(a).unwrap()[0].sequence_number, 1);
        assert_eq!(store.load_stream(b).unwrap()[0].sequence_number, 1);
    }

    #[test]
    fn load_missing_stream_returns_empty() {
        let store = InMemoryEventStore::new();
        assert!(store.load_stream(AggregateId::new()).unwrap().is_empty());
    }
}
