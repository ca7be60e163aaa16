//! Host error types.

use eventview_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the host.
#[derive(Debug, Error)]
pub enum HostError {
    /// An environment variable holds an invalid value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A command, commit or read model failed.
    #[error(transparent)]
    Domain(#[from] DomainError),
}
