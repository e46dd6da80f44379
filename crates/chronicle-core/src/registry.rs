//! Event type registry and record serializer.
//!
//! Every bounded context builds one [`EventRegistry`] at startup, binding each
//! stable type tag to a decoder for its payload. Records carry the payload in
//! a two-field envelope, `{ "t": <type tag>, "d": <payload> }`, so stores and
//! brokers can move events around without knowing any payload shape.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::event::{DomainEvent, Event, EventMetadata};
use crate::store::Record;

/// Wire envelope stored in [`Record::data`].
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    t: String,
    d: serde_json::Value,
}

type Decoder<E> = Box<dyn Fn(serde_json::Value) -> Result<E, serde_json::Error> + Send + Sync>;

/// Maps type tags to payload decoders for one event sum type.
pub struct EventRegistry<E> {
    decoders: HashMap<String, Decoder<E>>,
}

impl<E> std::fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("EventRegistry").field("event_types", &tags).finish()
    }
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }
}

impl<E: DomainEvent> EventRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `event_type` to payload type `T`, lifted into `E` by `wrap`.
    ///
    /// Typically `wrap` is the enum variant constructor, e.g.
    /// `registry.bind("storage.created", StorageEventKind::Created)`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateEventType` if the tag is already bound.
    pub fn bind<T, F>(&mut self, event_type: &str, wrap: F) -> Result<&mut Self, DomainError>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> E + Send + Sync + 'static,
    {
        if self.decoders.contains_key(event_type) {
            return Err(DomainError::DuplicateEventType(event_type.to_owned()));
        }
        self.decoders.insert(
            event_type.to_owned(),
            Box::new(move |data| serde_json::from_value::<T>(data).map(&wrap)),
        );
        Ok(self)
    }

    /// Returns `true` if a decoder is bound for `event_type`.
    #[must_use]
    pub fn is_bound(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Encodes an event into a store record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` if the event's tag was never
    /// bound (it could not be read back), or `DomainError::Serialization` if
    /// the payload fails to encode.
    pub fn marshal(&self, event: &Event<E>) -> Result<Record, DomainError> {
        let event_type = event.event_type();
        if !self.is_bound(event_type) {
            return Err(DomainError::UnknownEventType(event_type.to_owned()));
        }
        let meta = &event.metadata;
        let serialization = |source| DomainError::Serialization {
            version: meta.version,
            source,
        };
        let envelope = Envelope {
            t: event_type.to_owned(),
            d: event.kind.to_payload().map_err(serialization)?,
        };
        let data = serde_json::to_string(&envelope).map_err(serialization)?;

        Ok(Record {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            event_type: event_type.to_owned(),
            version: meta.version,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
            data,
        })
    }

    /// Decodes a store record back into a concrete event.
    ///
    /// The envelope tag is authoritative; the record's `event_type` column is
    /// not consulted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` (carrying the record's version) if
    /// the envelope or payload is malformed, or
    /// `DomainError::UnknownEventType` if the tag has no decoder.
    pub fn unmarshal(&self, record: &Record) -> Result<Event<E>, DomainError> {
        let serialization = |source| DomainError::Serialization {
            version: record.version,
            source,
        };
        let envelope: Envelope = serde_json::from_str(&record.data).map_err(serialization)?;
        let decode = self
            .decoders
            .get(&envelope.t)
            .ok_or_else(|| DomainError::UnknownEventType(envelope.t.clone()))?;
        let kind = decode(envelope.d).map_err(serialization)?;

        Ok(Event {
            metadata: EventMetadata {
                event_id: record.event_id,
                aggregate_id: record.aggregate_id,
                version: record.version,
                correlation_id: record.correlation_id,
                causation_id: record.causation_id,
                occurred_at: record.occurred_at,
            },
            kind,
        })
    }
}
