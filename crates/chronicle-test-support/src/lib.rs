//! Shared test doubles for Chronicle crates.

mod broker;
mod clock;
mod store;

pub use broker::{FailingBroker, RecordingBroker};
pub use clock::FixedClock;
pub use store::{EmptyEventStore, FailingEventStore, RecordingEventStore};
