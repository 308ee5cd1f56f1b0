//! Error types for the sync engine.

use finsync_core::CoreError;
use finsync_remote::{MappingError, RemoteError};
use std::fmt;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// The gateway call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    /// Pull phase select.
    Select,
    /// Push phase batch upsert.
    Upsert,
    /// Remote delete.
    Delete,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "select",
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        })
    }
}

/// Errors that can occur during sync operations.
///
/// Being offline is not an error; see [`crate::SyncOutcome::Offline`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// The local store failed. Fatal to the operation.
    #[error("storage failure: {0}")]
    Storage(#[from] CoreError),

    /// The remote refused or did not answer. The run stopped and nothing was
    /// marked synced; the next trigger retries.
    #[error("remote {operation} on {table} failed: {message}")]
    RemoteRejected {
        /// Table of the failed call.
        table: &'static str,
        /// The failed call.
        operation: RemoteOperation,
        /// Reason given by the gateway.
        message: String,
    },

    /// A record could not be converted between local and wire form.
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),
}

impl SyncError {
    /// Wraps a gateway error for `table`.
    pub fn remote(table: &'static str, operation: RemoteOperation, err: RemoteError) -> Self {
        match err {
            RemoteError::Mapping(mapping) => Self::Mapping(mapping),
            other => Self::RemoteRejected {
                table,
                operation,
                message: other.to_string(),
            },
        }
    }

    /// Returns true for local store failures.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true for remote failures.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_keep_table_and_operation() {
        let err = SyncError::remote(
            "wallets",
            RemoteOperation::Upsert,
            RemoteError::rejected(500, "boom"),
        );
        assert!(err.is_remote());
        assert_eq!(
            err.to_string(),
            "remote upsert on wallets failed: remote rejected request (500): boom"
        );
    }

    #[test]
    fn mapping_errors_stay_mapping_errors() {
        let err = SyncError::remote(
            "categories",
            RemoteOperation::Select,
            RemoteError::Mapping(MappingError::new("categories", "type", "gift")),
        );
        assert!(matches!(err, SyncError::Mapping(_)));
        assert!(!err.is_remote());
    }

    #[test]
    fn storage_classification() {
        let err = SyncError::from(CoreError::StoreLocked);
        assert!(err.is_storage());
        assert!(!err.is_remote());
    }
}
