//! Command handlers for the Storage context.
//!
//! Each handler loads the aggregate through the repository, executes the
//! command against it and saves the resulting events.

use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::clock::Clock;
use chronicle_core::command::Command;
use chronicle_core::error::DomainError;
use chronicle_core::repository::Repository;
use uuid::Uuid;

use crate::domain::aggregates::Storage;
use crate::domain::commands::{CreateStorage, RelocateStorage, RemoveStorage, RenameStorage};

/// Result of a successfully handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The aggregate version after the save.
    pub version: i64,
}

async fn load_existing(
    storage_id: Uuid,
    repo: &Repository<Storage>,
) -> Result<Storage, DomainError> {
    let storage = repo.load(storage_id).await?;
    if !storage.exists() {
        return Err(DomainError::AggregateNotFound(storage_id));
    }
    Ok(storage)
}

async fn commit(
    mut storage: Storage,
    repo: &Repository<Storage>,
) -> Result<StorageCommandResult, DomainError> {
    repo.save(&mut storage).await?;
    Ok(StorageCommandResult {
        aggregate_id: storage.aggregate_id(),
        version: storage.version(),
    })
}

/// Handles the `CreateStorage` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the storage already exists or a field
/// is blank, `DomainError::ConcurrencyConflict` if another writer created it
/// first, or any store error.
#[tracing::instrument(
    skip_all,
    fields(
        command = command.command_type(),
        storage_id = %command.aggregate_id(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_create_storage(
    command: &CreateStorage,
    clock: &dyn Clock,
    repo: &Repository<Storage>,
) -> Result<StorageCommandResult, DomainError> {
    let mut storage = repo.load(command.storage_id).await?;
    storage.create(&command.name, &command.location, command.correlation_id, clock)?;
    commit(storage, repo).await
}

/// Handles the `RenameStorage` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown storage,
/// `DomainError::Validation` for a blank name or removed storage, or any
/// store error.
#[tracing::instrument(
    skip_all,
    fields(
        command = command.command_type(),
        storage_id = %command.aggregate_id(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_rename_storage(
    command: &RenameStorage,
    clock: &dyn Clock,
    repo: &Repository<Storage>,
) -> Result<StorageCommandResult, DomainError> {
    let mut storage = load_existing(command.storage_id, repo).await?;
    storage.rename(&command.name, command.correlation_id, clock)?;
    commit(storage, repo).await
}

/// Handles the `RelocateStorage` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown storage,
/// `DomainError::Validation` for a blank location or removed storage, or any
/// store error.
#[tracing::instrument(
    skip_all,
    fields(
        command = command.command_type(),
        storage_id = %command.aggregate_id(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_relocate_storage(
    command: &RelocateStorage,
    clock: &dyn Clock,
    repo: &Repository<Storage>,
) -> Result<StorageCommandResult, DomainError> {
    let mut storage = load_existing(command.storage_id, repo).await?;
    storage.relocate(&command.location, command.correlation_id, clock)?;
    commit(storage, repo).await
}

/// Handles the `RemoveStorage` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown storage,
/// `DomainError::Validation` without a reason or for an already removed
/// storage, or any store error.
#[tracing::instrument(
    skip_all,
    fields(
        command = command.command_type(),
        storage_id = %command.aggregate_id(),
        correlation_id = %command.correlation_id()
    )
)]
pub async fn handle_remove_storage(
    command: &RemoveStorage,
    clock: &dyn Clock,
    repo: &Repository<Storage>,
) -> Result<StorageCommandResult, DomainError> {
    let mut storage = load_existing(command.storage_id, repo).await?;
    storage.remove(&command.reason, command.correlation_id, clock)?;
    commit(storage, repo).await
}
