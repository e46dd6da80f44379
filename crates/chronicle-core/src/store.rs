//! Event store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event.
///
/// `data` holds the serialized `{ "t": <type>, "d": <payload> }` envelope; the
/// store never looks inside it. `event_type` duplicates the envelope tag so
/// backends can index on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name.
    pub event_type: String,
    /// Version within the aggregate stream.
    pub version: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
    /// Serialized envelope.
    pub data: String,
}

/// Inclusive version bounds for a partial stream read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionRange {
    /// Lowest version to return, if bounded.
    pub min: Option<i64>,
    /// Highest version to return, if bounded.
    pub max: Option<i64>,
}

impl VersionRange {
    /// The whole stream.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Every version from `min` onwards.
    #[must_use]
    pub fn starting_at(min: i64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Versions between `min` and `max`, both included.
    #[must_use]
    pub fn between(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Returns `true` if `version` falls inside the range.
    #[must_use]
    pub fn contains(&self, version: i64) -> bool {
        self.min.is_none_or(|min| version >= min) && self.max.is_none_or(|max| version <= max)
    }
}

/// Durable, append-only event log keyed by aggregate id.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Load the events of an aggregate within `range`, ordered by version.
    ///
    /// An aggregate without history yields an empty vector.
    async fn load_range(
        &self,
        aggregate_id: Uuid,
        range: VersionRange,
    ) -> Result<Vec<Record>, DomainError>;

    /// Append a batch atomically with optimistic concurrency.
    ///
    /// Fails with `DomainError::ConcurrencyConflict` and writes nothing when
    /// the first record's version is not above the highest persisted one.
    /// An empty batch is a no-op.
    async fn append(&self, aggregate_id: Uuid, records: &[Record]) -> Result<(), DomainError>;

    /// Load all events for a given aggregate, ordered by version.
    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<Record>, DomainError> {
        self.load_range(aggregate_id, VersionRange::all()).await
    }
}

/// Checks that a batch is addressed to `aggregate_id` and strictly ascending.
///
/// Shared by store implementations before they touch storage.
///
/// # Errors
///
/// Returns `DomainError::Validation` describing the first offending record.
pub fn validate_batch(aggregate_id: Uuid, records: &[Record]) -> Result<(), DomainError> {
    if let Some(stray) = records.iter().find(|r| r.aggregate_id != aggregate_id) {
        return Err(DomainError::Validation(format!(
            "record {} belongs to aggregate {}, not {aggregate_id}",
            stray.event_id, stray.aggregate_id
        )));
    }
    if let Some(pair) = records.windows(2).find(|w| w[1].version <= w[0].version) {
        return Err(DomainError::Validation(format!(
            "record versions must be strictly increasing: {} followed by {}",
            pair[0].version, pair[1].version
        )));
    }
    if let Some(first) = records.first().filter(|r| r.version < 1) {
        return Err(DomainError::Validation(format!(
            "record versions start at 1, got {}",
            first.version
        )));
    }
    Ok(())
}
