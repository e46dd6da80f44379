//! Chronicle Core: event-sourcing building blocks.
//!
//! This crate defines events, aggregates, the event type registry, the
//! repository, and the contracts that storage and messaging backends
//! implement. It contains no database code.

pub mod aggregate;
pub mod broker;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod registry;
pub mod repository;
pub mod store;
