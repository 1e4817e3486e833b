//! Aggregate trait for state that evolves through decided events.

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` validates the command against the
///   current state and returns events. It must not mutate anything.
/// - **State mutation**: `apply(&mut self, event)` evolves state and cannot fail.
///
/// Callers must only `apply` events produced by `handle` on the same state;
/// `apply` assumes every precondition was already checked.
pub trait Aggregate {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations should bump their `version()` by one per applied event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Number of events applied so far.
    fn version(&self) -> u64;

    /// Decide, then apply every resulting event. Returns the applied events.
    ///
    /// On error nothing is applied.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}
