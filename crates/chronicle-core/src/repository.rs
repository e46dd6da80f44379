//! Aggregate repository: replay, persistence and publication.
//!
//! [`Repository::load`] rebuilds an aggregate from its stored history;
//! [`Repository::save`] commits its pending events as one batch and then
//! publishes them. Publication is best-effort: once the append succeeded, a
//! broker failure is logged and the save still succeeds.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::broker::MessageBroker;
use crate::error::DomainError;
use crate::registry::EventRegistry;
use crate::store::{EventStore, Record};

/// Loads and saves aggregates of type `A`.
pub struct Repository<A: AggregateRoot> {
    store: Arc<dyn EventStore>,
    broker: Arc<dyn MessageBroker>,
    registry: Arc<EventRegistry<A::Event>>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: AggregateRoot> Clone for Repository<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            broker: Arc::clone(&self.broker),
            registry: Arc::clone(&self.registry),
            _aggregate: PhantomData,
        }
    }
}

impl<A: AggregateRoot> std::fmt::Debug for Repository<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("aggregate_type", &A::AGGREGATE_TYPE)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<A: AggregateRoot> Repository<A> {
    /// Creates a repository over a store, a broker and the aggregate's
    /// event registry.
    #[must_use]
    pub fn new(
        store: Arc<dyn EventStore>,
        broker: Arc<dyn MessageBroker>,
        registry: Arc<EventRegistry<A::Event>>,
    ) -> Self {
        Self {
            store,
            broker,
            registry,
            _aggregate: PhantomData,
        }
    }

    /// Returns the registry used to encode and decode events.
    #[must_use]
    pub fn registry(&self) -> &EventRegistry<A::Event> {
        &self.registry
    }

    /// Rebuilds the aggregate from its full history.
    ///
    /// An id without history yields an empty aggregate at version 0.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged, `DomainError::UnknownEventType` or
    /// `DomainError::Serialization` for an undecodable record, or whatever the
    /// aggregate's transition function rejects during replay.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::AGGREGATE_TYPE))]
    pub async fn load(&self, aggregate_id: Uuid) -> Result<A, DomainError> {
        let records = self.store.load(aggregate_id).await?;
        self.replay(aggregate_id, &records)
    }

    /// Like [`load`](Self::load), but gives up with `DomainError::Cancelled`
    /// as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled`, or whatever `load` returns.
    pub async fn load_cancellable(
        &self,
        aggregate_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<A, DomainError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DomainError::Cancelled),
            loaded = self.load(aggregate_id) => loaded,
        }
    }

    /// Commits the aggregate's pending events as a single batch, then
    /// publishes each of them.
    ///
    /// Clears the pending events on success. Saving an aggregate with nothing
    /// pending is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` when another writer got
    /// there first, a serialization error, or the store's error unchanged.
    /// Publish failures are never returned.
    pub async fn save(&self, aggregate: &mut A) -> Result<(), DomainError> {
        self.save_cancellable(aggregate, &CancellationToken::new())
            .await
    }

    /// Like [`save`](Self::save), but returns `DomainError::Cancelled`
    /// without writing if `cancel` has fired before the append is issued.
    ///
    /// Once the append has been issued it runs to completion; a caller that
    /// abandons the returned future must reload to learn the outcome.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled`, or whatever `save` returns.
    #[tracing::instrument(
        skip(self, aggregate, cancel),
        fields(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate.aggregate_id(),
            event_count = aggregate.uncommitted_events().len()
        )
    )]
    pub async fn save_cancellable(
        &self,
        aggregate: &mut A,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        if aggregate.uncommitted_events().is_empty() {
            return Ok(());
        }

        let records = aggregate
            .uncommitted_events()
            .iter()
            .map(|event| self.registry.marshal(event))
            .collect::<Result<Vec<Record>, DomainError>>()?;

        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        self.store.append(aggregate.aggregate_id(), &records).await?;
        aggregate.clear_uncommitted_events();
        tracing::debug!(version = aggregate.version(), "events committed");

        self.publish(&records).await;
        Ok(())
    }

    fn replay(&self, aggregate_id: Uuid, records: &[Record]) -> Result<A, DomainError> {
        let events = records
            .iter()
            .map(|record| self.registry.unmarshal(record))
            .collect::<Result<Vec<_>, DomainError>>()?;
        let mut aggregate = A::new(aggregate_id);
        aggregate.load(events)?;
        tracing::debug!(
            %aggregate_id,
            version = aggregate.version(),
            replayed = records.len(),
            "aggregate replayed"
        );
        Ok(aggregate)
    }

    async fn publish(&self, records: &[Record]) {
        for record in records {
            if let Err(e) = self.broker.publish(record).await {
                tracing::warn!(
                    aggregate_id = %record.aggregate_id,
                    version = record.version,
                    event_type = %record.event_type,
                    error = %e,
                    "failed to publish committed event"
                );
            }
        }
    }
}
