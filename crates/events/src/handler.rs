/// Execute an aggregate command deterministically (no IO, no async).
///
/// The canonical event-sourced lifecycle in one step:
///
/// 1. **Decide**: calls `aggregate.handle(command)` to get events (pure, no
///    mutation)
/// 2. **Evolve**: applies each event to the aggregate via
///    `aggregate.apply(event)`
///
/// This mutates the aggregate in place and skips persistence/projection -
/// use it in tests and inline workflows. For the full pipeline (optimistic
/// concurrency, event store, projectors) use the command dispatcher.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: campus_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
