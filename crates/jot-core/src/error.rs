//! Error types for jot-core

use thiserror::Error;

use crate::auth::AuthError;
use crate::remote::RemoteError;

/// Result type alias using jot-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in jot-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local input validation failed; no remote call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend row/query failure
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Sign-in, sign-up or sign-out failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A write for the same entity is still outstanding
    #[error("A request is already in flight for {0}")]
    Busy(String),

    /// Operation not valid in the current state
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
