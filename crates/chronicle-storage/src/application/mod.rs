//! Application services for the Storage context.

pub mod command_handlers;
