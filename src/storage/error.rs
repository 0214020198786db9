//! Storage error definitions.

use std::time::Duration;

use thiserror::Error;

/// Errors from the quote store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database file could not be opened or created.
    #[error("failed to open quote store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Schema creation failed.
    #[error("failed to create schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// Write deadline passed; nothing was committed.
    #[error("write timeout after {0:?}")]
    WriteTimeout(Duration),

    /// Any other failure while inserting.
    #[error("write failed: {0}")]
    Write(String),

    /// Failure while reading rows back.
    #[error("read failed: {0}")]
    Read(String),

    /// A thread panicked while holding the connection.
    #[error("connection lock poisoned")]
    Poisoned,
}

impl StorageError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::Open { .. } => "open",
            StorageError::Schema(_) => "schema",
            StorageError::WriteTimeout(_) => "timeout",
            StorageError::Write(_) => "write",
            StorageError::Read(_) => "read",
            StorageError::Poisoned => "poisoned",
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
