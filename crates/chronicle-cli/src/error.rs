//! Chronicle CLI error types.

use chronicle_core::error::DomainError;
use thiserror::Error;

/// Startup and command errors for the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The store or a core operation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A stream failed verification.
    #[error("stream {aggregate_id} is invalid: {reason}")]
    InvalidStream {
        /// The stream that was checked.
        aggregate_id: uuid::Uuid,
        /// The first problem found.
        reason: String,
    },

    /// Writing command output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}
