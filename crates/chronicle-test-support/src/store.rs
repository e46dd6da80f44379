//! `EventStore` doubles.

use std::sync::Mutex;

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, Record, VersionRange};
use uuid::Uuid;

/// An event store that records every `append` call. Returns the configured
/// history (filtered by range) from every load and always accepts appends
/// without checking versions.
#[derive(Debug)]
pub struct RecordingEventStore {
    history: Vec<Record>,
    appended: Mutex<Vec<(Uuid, Vec<Record>)>>,
}

impl RecordingEventStore {
    /// Create a recording store that will return `history` from every load.
    #[must_use]
    pub fn new(history: Vec<Record>) -> Self {
        Self {
            history,
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all batches that were appended.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_records(&self) -> Vec<(Uuid, Vec<Record>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn load_range(
        &self,
        _aggregate_id: Uuid,
        range: VersionRange,
    ) -> Result<Vec<Record>, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|r| range.contains(r.version))
            .cloned()
            .collect())
    }

    async fn append(&self, aggregate_id: Uuid, records: &[Record]) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, records.to_vec()));
        Ok(())
    }
}

/// A store with no history that discards whatever is appended.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn load_range(
        &self,
        _aggregate_id: Uuid,
        _range: VersionRange,
    ) -> Result<Vec<Record>, DomainError> {
        Ok(vec![])
    }

    async fn append(&self, _aggregate_id: Uuid, _records: &[Record]) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A store whose every call fails as if the database were unreachable.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn load_range(
        &self,
        _aggregate_id: Uuid,
        _range: VersionRange,
    ) -> Result<Vec<Record>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append(&self, _aggregate_id: Uuid, _records: &[Record]) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
