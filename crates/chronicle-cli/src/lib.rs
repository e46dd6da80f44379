//! Chronicle operator tooling.
//!
//! The `chronicle` binary is a thin `clap` front-end over these modules.

pub mod commands;
pub mod config;
pub mod error;
pub mod telemetry;
