//! Ledger error types.

use crate::store::StorageError;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Durable storage rejected the operation
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// An entry could not be serialized or parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage did not answer in time
    #[error("Storage {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// No entry with this ID
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Export format not recognized
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
