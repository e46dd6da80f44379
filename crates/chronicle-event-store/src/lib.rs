//! Event store backends for Chronicle.
//!
//! [`memory::InMemoryEventStore`] serves tests and single-process tools;
//! [`postgres::PgEventStore`] is the durable backend.

pub mod config;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use config::StoreConfig;
pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;
