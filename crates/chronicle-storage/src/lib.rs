//! Chronicle: Storage bounded context.
//!
//! Storages are the shelves, rooms and depots of the library domain. The
//! context is small on purpose: every command goes through the core
//! repository, so it doubles as an end-to-end exercise of load, replay,
//! optimistic save and publication.

pub mod application;
pub mod domain;
