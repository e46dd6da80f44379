//! Aggregate roots for the Storage context.

use chronicle_core::aggregate::{AggregateBase, AggregateRoot};
use chronicle_core::clock::Clock;
use chronicle_core::error::DomainError;
use chronicle_core::event::Event;
use uuid::Uuid;

use super::events::{LocationSet, NameSet, StorageCreated, StorageEventKind, StorageRemoved};

/// The aggregate root for a storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Storage {
    base: AggregateBase<StorageEventKind>,
    created: bool,
    name: String,
    location: String,
    removed: bool,
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

impl Storage {
    /// Returns `true` once the creation event has been applied.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.created
    }

    /// Returns the current name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns `true` if the storage has been removed.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Creates the storage, producing `StorageCreated`, `NameSet` and
    /// `LocationSet` events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the storage already exists or
    /// either field is blank.
    pub fn create(
        &mut self,
        name: &str,
        location: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        require_text("storage name", name)?;
        require_text("storage location", location)?;
        self.raise(
            StorageEventKind::Created(StorageCreated {}),
            correlation_id,
            clock,
        )?;
        self.raise(
            StorageEventKind::NameSet(NameSet {
                name: name.to_owned(),
            }),
            correlation_id,
            clock,
        )?;
        self.raise(
            StorageEventKind::LocationSet(LocationSet {
                location: location.to_owned(),
            }),
            correlation_id,
            clock,
        )
    }

    /// Renames the storage, producing a `NameSet` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank or the storage
    /// does not accept changes.
    pub fn rename(
        &mut self,
        name: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        require_text("storage name", name)?;
        self.raise(
            StorageEventKind::NameSet(NameSet {
                name: name.to_owned(),
            }),
            correlation_id,
            clock,
        )
    }

    /// Moves the storage, producing a `LocationSet` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the location is blank or the
    /// storage does not accept changes.
    pub fn relocate(
        &mut self,
        location: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        require_text("storage location", location)?;
        self.raise(
            StorageEventKind::LocationSet(LocationSet {
                location: location.to_owned(),
            }),
            correlation_id,
            clock,
        )
    }

    /// Removes the storage, producing a `StorageRemoved` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no reason is given or the storage
    /// does not accept changes.
    pub fn remove(
        &mut self,
        reason: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        require_text("removal reason", reason)?;
        self.raise(
            StorageEventKind::Removed(StorageRemoved {
                reason: reason.to_owned(),
            }),
            correlation_id,
            clock,
        )
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        let id = self.aggregate_id();
        if !self.created {
            return Err(DomainError::Validation(format!(
                "storage {id} has not been created"
            )));
        }
        if self.removed {
            return Err(DomainError::Validation(format!(
                "storage {id} has been removed"
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for Storage {
    type Event = StorageEventKind;

    const AGGREGATE_TYPE: &'static str = "storage";

    fn new(id: Uuid) -> Self {
        Self {
            base: AggregateBase::new(id),
            created: false,
            name: String::new(),
            location: String::new(),
            removed: false,
        }
    }

    fn base(&self) -> &AggregateBase<StorageEventKind> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AggregateBase<StorageEventKind> {
        &mut self.base
    }

    fn on(&mut self, event: &Event<StorageEventKind>) -> Result<(), DomainError> {
        match &event.kind {
            StorageEventKind::Created(_) => {
                if self.created {
                    return Err(DomainError::Validation(format!(
                        "storage {} already exists",
                        self.aggregate_id()
                    )));
                }
                self.created = true;
            }
            StorageEventKind::NameSet(payload) => {
                self.ensure_active()?;
                self.name.clone_from(&payload.name);
            }
            StorageEventKind::LocationSet(payload) => {
                self.ensure_active()?;
                self.location.clone_from(&payload.location);
            }
            StorageEventKind::Removed(_) => {
                self.ensure_active()?;
                self.removed = true;
            }
        }
        Ok(())
    }
}
