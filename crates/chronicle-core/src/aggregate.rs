//! Aggregate root abstraction.
//!
//! An aggregate embeds an [`AggregateBase`] holding its id, the version of
//! the last applied event and the events raised but not yet committed. The
//! concrete type supplies a single transition function, [`AggregateRoot::on`],
//! that dispatches over its event sum type; replay and command handling both
//! go through it.

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::event::{DomainEvent, Event, EventMetadata};

/// Bookkeeping shared by every aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBase<E> {
    id: Uuid,
    version: i64,
    uncommitted_events: Vec<Event<E>>,
}

impl<E> AggregateBase<E> {
    /// Creates the base of an aggregate with no history.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the aggregate identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the version of the last applied event, pending ones included.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Returns events raised since the aggregate was loaded or last saved.
    #[must_use]
    pub fn uncommitted_events(&self) -> &[Event<E>] {
        &self.uncommitted_events
    }
}

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Send + Sync + Sized {
    /// The event payload sum type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Name of the aggregate type, used in logs.
    const AGGREGATE_TYPE: &'static str;

    /// Creates an empty aggregate (version 0) for the given id.
    fn new(id: Uuid) -> Self;

    /// Returns the embedded bookkeeping.
    fn base(&self) -> &AggregateBase<Self::Event>;

    /// Returns the embedded bookkeeping mutably.
    fn base_mut(&mut self) -> &mut AggregateBase<Self::Event>;

    /// Pure state transition for one event.
    ///
    /// Implementations must validate before mutating: on `Err` the aggregate's
    /// own fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` when the event cannot be applied to the current
    /// state (for example a second creation event).
    fn on(&mut self, event: &Event<Self::Event>) -> Result<(), DomainError>;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid {
        self.base().id
    }

    /// Returns the current version, including pending events.
    fn version(&self) -> i64 {
        self.base().version
    }

    /// Returns the version last read from or written to the store.
    #[allow(clippy::cast_possible_wrap)]
    fn persisted_version(&self) -> i64 {
        let base = self.base();
        base.version - base.uncommitted_events.len() as i64
    }

    /// Returns `true` for an aggregate with neither history nor pending events.
    fn is_new(&self) -> bool {
        self.base().version == 0 && self.base().uncommitted_events.is_empty()
    }

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Event<Self::Event>] {
        &self.base().uncommitted_events
    }

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self) {
        self.base_mut().uncommitted_events.clear();
    }

    /// Applies a new event and queues it for persistence.
    ///
    /// The event is queued only if [`on`](Self::on) succeeds, so the state and
    /// the pending buffer never diverge.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::OutOfOrderEvent` unless the event carries the
    /// next version, or whatever `on` rejects the event with.
    fn apply(&mut self, event: Event<Self::Event>) -> Result<(), DomainError> {
        ensure_next(self.aggregate_id(), self.version(), &event)?;
        self.on(&event)?;
        let base = self.base_mut();
        base.version = event.metadata.version;
        base.uncommitted_events.push(event);
        Ok(())
    }

    /// Builds the next event for `kind` and [`apply`](Self::apply)s it.
    ///
    /// # Errors
    ///
    /// Returns whatever `apply` returns.
    fn raise(
        &mut self,
        kind: Self::Event,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let metadata =
            EventMetadata::new(self.aggregate_id(), self.version() + 1, correlation_id, clock);
        self.apply(Event { metadata, kind })
    }

    /// Replays historical events without queueing them.
    ///
    /// Stops at the first failure; the partially folded aggregate must then be
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::OutOfOrderEvent` for a repeated, reordered or
    /// skipped version, or whatever `on` rejects an event with.
    fn load<I>(&mut self, events: I) -> Result<(), DomainError>
    where
        I: IntoIterator<Item = Event<Self::Event>>,
    {
        for event in events {
            ensure_next(self.aggregate_id(), self.version(), &event)?;
            self.on(&event)?;
            self.base_mut().version = event.metadata.version;
        }
        Ok(())
    }
}

/// Streams are gapless: the only acceptable event is the one at `current + 1`.
fn ensure_next<E>(aggregate_id: Uuid, current: i64, event: &Event<E>) -> Result<(), DomainError> {
    if event.metadata.aggregate_id != aggregate_id {
        return Err(DomainError::Validation(format!(
            "event {} belongs to aggregate {}, not {aggregate_id}",
            event.metadata.event_id, event.metadata.aggregate_id
        )));
    }
    let found = event.metadata.version;
    if found != current + 1 {
        return Err(DomainError::OutOfOrderEvent {
            aggregate_id,
            current,
            found,
        });
    }
    Ok(())
}
