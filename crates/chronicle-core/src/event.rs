//! Domain event abstractions.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate/stream this event belongs to.
    pub aggregate_id: Uuid,
    /// Monotonically increasing version within the aggregate stream.
    pub version: i64,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Causation ID linking this event to the event/command that caused it.
    pub causation_id: Uuid,
    /// Timestamp of event creation, at microsecond precision.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Builds metadata for a new event caused directly by a command.
    ///
    /// The clock reading is cut to microseconds, the finest precision the
    /// durable store keeps.
    #[must_use]
    pub fn new(aggregate_id: Uuid, version: i64, correlation_id: Uuid, clock: &dyn Clock) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            aggregate_id,
            version,
            correlation_id,
            causation_id: correlation_id,
            occurred_at: clock.now().trunc_subsecs(6),
        }
    }
}

/// Trait implemented by the payload sum type of a bounded context.
///
/// `event_type` must be stable across releases: it is written into every
/// record and resolved through the context's
/// [`EventRegistry`](crate::registry::EventRegistry) on replay.
pub trait DomainEvent: Send + Sync + std::fmt::Debug + Clone + 'static {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Serializes the variant's payload, without any type tag.
    ///
    /// # Errors
    ///
    /// Returns the codec error if the payload cannot be represented as JSON.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;
}

/// An immutable, versioned fact about one aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: E,
}

impl<E: DomainEvent> Event<E> {
    /// Returns the type tag of the payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    /// Returns the version of this event within its stream.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.metadata.version
    }

    /// Returns the owning aggregate.
    #[must_use]
    pub fn aggregate_id(&self) -> Uuid {
        self.metadata.aggregate_id
    }
}
