//! Error types for the joinery manager service

use thiserror::Error;

/// Result type alias for the joinery manager
pub type Result<T> = std::result::Result<T, Error>;

/// Service-level errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing key pair could not be loaded or generated.
    /// Fatal at startup — no authenticated traffic can be served without it.
    #[error("Key initialization failed: {0}")]
    KeyInit(String),

    /// Certificate issuance rejected (invalid input)
    #[error("Certificate issuance failed: {0}")]
    Issuance(String),

    /// Certificate store failure (persistence)
    #[error("Certificate store error: {0}")]
    Store(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
