//! In-memory event store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, Record, VersionRange, validate_batch};
use uuid::Uuid;

type Streams = HashMap<Uuid, Vec<Record>>;

/// Event store holding every stream in process memory.
///
/// The concurrency check and the insert happen under one write lock, so a
/// batch is either fully visible or not at all. Clones share the same
/// streams.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<Streams>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of streams holding at least one event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn stream_count(&self) -> Result<usize, DomainError> {
        Ok(self.streams.read().map_err(poisoned)?.len())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> DomainError {
    DomainError::Infrastructure("in-memory event store lock poisoned".into())
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load_range(
        &self,
        aggregate_id: Uuid,
        range: VersionRange,
    ) -> Result<Vec<Record>, DomainError> {
        let streams = self.streams.read().map_err(poisoned)?;
        Ok(streams
            .get(&aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|r| range.contains(r.version))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn append(&self, aggregate_id: Uuid, records: &[Record]) -> Result<(), DomainError> {
        validate_batch(aggregate_id, records)?;
        let Some(first) = records.first() else {
            return Ok(());
        };

        let mut streams = self.streams.write().map_err(poisoned)?;
        let stream = streams.entry(aggregate_id).or_default();
        let persisted = stream.last().map_or(0, |r| r.version);
        if first.version <= persisted {
            tracing::debug!(
                %aggregate_id,
                attempted = first.version,
                persisted,
                "append rejected"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                attempted: first.version,
                persisted,
            });
        }
        stream.extend_from_slice(records);
        Ok(())
    }
}
