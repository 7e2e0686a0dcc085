//! Error types shared across testwright crates

use thiserror::Error;

/// Result type alias using the shared Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the shared collaborator boundaries
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Automation session error: {0}")]
    Session(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
