//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict: the store already holds a version at
    /// or beyond the first version of the batch.
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: attempted version {attempted}, persisted version {persisted} (reload and retry)"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The first version of the rejected batch.
        attempted: i64,
        /// The highest version already persisted.
        persisted: i64,
    },

    /// An event type tag has no registered decoder.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// An event type tag was registered twice.
    #[error("event type already registered: {0}")]
    DuplicateEventType(String),

    /// An event payload could not be encoded or decoded.
    #[error("serialization of event version {version} failed: {source}")]
    Serialization {
        /// Version of the offending event or record.
        version: i64,
        /// Underlying codec error.
        #[source]
        source: serde_json::Error,
    },

    /// An event was applied whose version does not follow the aggregate's.
    #[error("out-of-order event on aggregate {aggregate_id}: current version {current}, event version {found}")]
    OutOfOrderEvent {
        /// The aggregate being folded.
        aggregate_id: Uuid,
        /// Version of the aggregate before the event.
        current: i64,
        /// Version carried by the event.
        found: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation was cancelled before any durable write was issued.
    #[error("operation cancelled")]
    Cancelled,

    /// The message broker refused a publication.
    #[error("broker error: {0}")]
    Broker(String),

    /// An infrastructure/persistence error, propagated unchanged.
    #[error("infrastructure error: {0}")]
    Infrastructure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DomainError {
    /// Returns `true` when reloading the aggregate and retrying the command may
    /// succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_concurrency_conflict_is_retryable() {
        let conflict = DomainError::ConcurrencyConflict {
            aggregate_id: Uuid::new_v4(),
            attempted: 1,
            persisted: 2,
        };
        assert!(conflict.is_retryable());
        assert!(!DomainError::Infrastructure("connection refused".into()).is_retryable());
        assert!(!DomainError::UnknownEventType("x".into()).is_retryable());
        assert!(!DomainError::Cancelled.is_retryable());
    }

    #[test]
    fn test_concurrency_conflict_message_names_versions() {
        let aggregate_id = Uuid::new_v4();
        let message = DomainError::ConcurrencyConflict {
            aggregate_id,
            attempted: 1,
            persisted: 2,
        }
        .to_string();

        assert!(message.contains(&aggregate_id.to_string()));
        assert!(message.contains("attempted version 1"));
        assert!(message.contains("persisted version 2"));
    }

    #[test]
    fn test_infrastructure_error_keeps_source_message() {
        let err = DomainError::Infrastructure("connection refused".into());
        assert_eq!(err.to_string(), "infrastructure error: connection refused");
    }
}
