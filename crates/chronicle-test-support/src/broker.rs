//! `MessageBroker` doubles.

use std::sync::Mutex;

use async_trait::async_trait;
use chronicle_core::broker::MessageBroker;
use chronicle_core::error::DomainError;
use chronicle_core::store::Record;

/// A broker that keeps every published record in order.
#[derive(Debug, Default)]
pub struct RecordingBroker {
    published: Mutex<Vec<Record>>,
}

impl RecordingBroker {
    /// Creates an empty recording broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published records.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<Record> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageBroker for RecordingBroker {
    async fn publish(&self, record: &Record) -> Result<(), DomainError> {
        self.published.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// A broker that refuses every publication.
#[derive(Debug)]
pub struct FailingBroker;

#[async_trait]
impl MessageBroker for FailingBroker {
    async fn publish(&self, _record: &Record) -> Result<(), DomainError> {
        Err(DomainError::Broker("exchange unavailable".into()))
    }
}
