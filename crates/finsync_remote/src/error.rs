//! Error types for remote table access.

use thiserror::Error;

/// Result type for gateway operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A wire value that has no local counterpart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot map {table}.{field} value {value:?}")]
pub struct MappingError {
    /// Remote table.
    pub table: &'static str,
    /// Wire field.
    pub field: &'static str,
    /// Offending value.
    pub value: String,
}

impl MappingError {
    /// Creates a mapping error.
    pub fn new(table: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self {
            table,
            field,
            value: value.into(),
        }
    }
}

/// Errors returned by a [`crate::RemoteGateway`].
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a failure.
    #[error("remote rejected request ({status}): {message}")]
    Rejected {
        /// HTTP-like status code.
        status: u16,
        /// Message returned by the remote.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A wire row could not be mapped to a local entity.
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl RemoteError {
    /// Creates a rejection.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the request may not have reached the remote at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RemoteError::rejected(409, "duplicate key");
        assert_eq!(err.to_string(), "remote rejected request (409): duplicate key");

        let err = RemoteError::from(MappingError::new("categories", "type", "gift"));
        assert_eq!(err.to_string(), "cannot map categories.type value \"gift\"");
    }

    #[test]
    fn transport_classification() {
        assert!(RemoteError::Transport("reset".into()).is_transport());
        assert!(!RemoteError::rejected(500, "boom").is_transport());
    }
}
