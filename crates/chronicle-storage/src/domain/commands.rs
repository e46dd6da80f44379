//! Commands for the Storage context.

use chronicle_core::command::Command;
use uuid::Uuid;

/// Command to create a storage.
#[derive(Debug, Clone)]
pub struct CreateStorage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The storage identifier.
    pub storage_id: Uuid,
    /// Initial display name.
    pub name: String,
    /// Initial physical location.
    pub location: String,
}

/// Command to rename a storage.
#[derive(Debug, Clone)]
pub struct RenameStorage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The storage identifier.
    pub storage_id: Uuid,
    /// New display name.
    pub name: String,
}

/// Command to move a storage.
#[derive(Debug, Clone)]
pub struct RelocateStorage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The storage identifier.
    pub storage_id: Uuid,
    /// New physical location.
    pub location: String,
}

/// Command to remove a storage.
#[derive(Debug, Clone)]
pub struct RemoveStorage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The storage identifier.
    pub storage_id: Uuid,
    /// Why the storage is being removed.
    pub reason: String,
}

macro_rules! impl_command {
    ($($command:ty => $name:literal),+ $(,)?) => {
        $(
            impl Command for $command {
                fn command_type(&self) -> &'static str {
                    $name
                }

                fn correlation_id(&self) -> Uuid {
                    self.correlation_id
                }

                fn aggregate_id(&self) -> Uuid {
                    self.storage_id
                }
            }
        )+
    };
}

impl_command! {
    CreateStorage => "storage.create",
    RenameStorage => "storage.rename",
    RelocateStorage => "storage.relocate",
    RemoveStorage => "storage.remove",
}
