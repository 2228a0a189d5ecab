//! Common error types for MCAT

use thiserror::Error;

/// Common result type for MCAT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the catalog
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource (or a referenced relation) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed required input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Reclassify a unique-constraint violation as `Conflict`.
    ///
    /// Application-level pre-checks catch the common case; this covers the
    /// window where a concurrent writer inserts the same key first.
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => Error::Conflict(message.into()),
            _ => Error::Database(err),
        }
    }
}
