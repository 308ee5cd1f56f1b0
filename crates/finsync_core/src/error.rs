//! Error types for the local entity store.
//!
//! Every variant is a storage-layer failure: the triggering local operation
//! failed and the caller must be told, since dropping it would leave the UI
//! believing in state that was never persisted.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the local entity store.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] finsync_storage::StorageError),

    /// I/O error outside the backend (directory, lock file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Entity or journal payload could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// A complete journal frame failed validation.
    #[error("journal corruption at offset {offset}: {message}")]
    JournalCorruption {
        /// Offset of the offending frame.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Another process holds the store directory.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a journal corruption error.
    pub fn journal_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_display_names_offset() {
        let err = CoreError::journal_corruption(42, "bad crc");
        assert_eq!(err.to_string(), "journal corruption at offset 42: bad crc");
    }

    #[test]
    fn storage_errors_convert() {
        let err: CoreError = finsync_storage::StorageError::Injected("disk full".into()).into();
        assert!(matches!(err, CoreError::Storage(_)));
    }
}
