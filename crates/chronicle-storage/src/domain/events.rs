//! Domain events for the Storage context.

use chronicle_core::error::DomainError;
use chronicle_core::event::DomainEvent;
use chronicle_core::registry::EventRegistry;
use serde::{Deserialize, Serialize};

/// Event type identifier for `StorageCreated`.
pub const STORAGE_CREATED_EVENT_TYPE: &str = "storage.created";
/// Event type identifier for `NameSet`.
pub const NAME_SET_EVENT_TYPE: &str = "storage.name_set";
/// Event type identifier for `LocationSet`.
pub const LOCATION_SET_EVENT_TYPE: &str = "storage.location_set";
/// Event type identifier for `StorageRemoved`.
pub const STORAGE_REMOVED_EVENT_TYPE: &str = "storage.removed";

/// Emitted once, as the first event of every storage stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCreated {}

/// Emitted when a storage is named or renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSet {
    /// The new display name.
    pub name: String,
}

/// Emitted when a storage is placed or moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSet {
    /// The new physical location.
    pub location: String,
}

/// Emitted when a storage is taken out of service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRemoved {
    /// Why the storage was removed.
    pub reason: String,
}

/// Event payload variants for the Storage context.
///
/// Serialized without a variant tag: the tag travels in the record envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StorageEventKind {
    /// The storage has been created.
    Created(StorageCreated),
    /// The storage has been (re)named.
    NameSet(NameSet),
    /// The storage has been (re)located.
    LocationSet(LocationSet),
    /// The storage has been removed.
    Removed(StorageRemoved),
}

impl DomainEvent for StorageEventKind {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => STORAGE_CREATED_EVENT_TYPE,
            Self::NameSet(_) => NAME_SET_EVENT_TYPE,
            Self::LocationSet(_) => LOCATION_SET_EVENT_TYPE,
            Self::Removed(_) => STORAGE_REMOVED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Builds the registry binding every storage event type to its payload.
///
/// # Errors
///
/// Returns `DomainError::DuplicateEventType` if two variants share a tag.
pub fn registry() -> Result<EventRegistry<StorageEventKind>, DomainError> {
    let mut registry = EventRegistry::new();
    registry
        .bind(STORAGE_CREATED_EVENT_TYPE, StorageEventKind::Created)?
        .bind(NAME_SET_EVENT_TYPE, StorageEventKind::NameSet)?
        .bind(LOCATION_SET_EVENT_TYPE, StorageEventKind::LocationSet)?
        .bind(STORAGE_REMOVED_EVENT_TYPE, StorageEventKind::Removed)?;
    Ok(registry)
}
