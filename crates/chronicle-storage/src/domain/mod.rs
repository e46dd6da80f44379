//! Domain model for the Storage context.

pub mod aggregates;
pub mod commands;
pub mod events;
