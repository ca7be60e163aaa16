//! View manager fault types.

use eventview_core::error::DomainError;
use thiserror::Error;

/// Why a view manager operation failed.
#[derive(Debug, Error)]
pub enum ViewManagerError {
    /// The manager returned an error.
    #[error(transparent)]
    Failed(#[from] DomainError),

    /// The manager panicked; the payload message is kept when it is a string.
    #[error("view manager panicked: {0}")]
    Panicked(String),
}
