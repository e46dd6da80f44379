//! Commands: requests to change exactly one aggregate.

use uuid::Uuid;

/// A request addressed to one aggregate.
///
/// Handlers record these accessors as span fields; the correlation id is
/// copied onto every event the command raises.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable name such as `storage.rename`.
    fn command_type(&self) -> &'static str;

    /// The aggregate the command targets.
    fn aggregate_id(&self) -> Uuid;

    /// Correlation id stamped onto the resulting events.
    fn correlation_id(&self) -> Uuid;
}
