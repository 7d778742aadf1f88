use campus_core::AggregateId;

/// A command targets a specific aggregate.
///
/// Commands represent **intent** - a request to perform an action on an
/// aggregate. They are **transient** (not persisted) and are transformed into
/// events (which are persisted).
///
/// ## Command vs Event
///
/// - **Command**: Intent to do something (e.g., "Complete lesson X")
/// - **Event**: Fact that something happened (e.g., "LessonCompleted { ... }")
///
/// Commands are rejected if invalid (validation errors). Events represent
/// accepted changes.
///
/// ## Aggregate Targeting
///
/// Commands must specify which aggregate they target via
/// `target_aggregate_id()`. This enables:
/// - **Routing**: Infrastructure can route commands to the correct stream
/// - **Isolation**: Each command operates on one aggregate (the transaction
///   boundary)
/// - **Concurrency**: Different aggregates can process commands concurrently
///   without coordination
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
