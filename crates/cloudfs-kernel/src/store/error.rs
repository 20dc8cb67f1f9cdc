//! Object store error types.

use strum::{AsRefStr, Display};
use thiserror::Error;

/// The primitive store call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum StoreOp {
    List,
    GetObject,
    PutObject,
    DeleteObject,
    CopyObject,
    HeadObject,
}

/// Errors reported by an [`ObjectStore`](super::ObjectStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key does not exist in the bucket.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Transport, authentication, or server failure.
    #[error("{op} failed for {key}: {message}")]
    Request {
        op: StoreOp,
        key: String,
        message: String,
    },

    /// The client could not be constructed.
    #[error("store client setup failed: {0}")]
    Setup(String),
}

impl StoreError {
    /// Create a NotFound error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a Request error.
    pub fn request(op: StoreOp, key: impl Into<String>, message: impl ToString) -> Self {
        Self::Request {
            op,
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Returns true if the store reported the key as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Store result type.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_names() {
        assert_eq!(StoreOp::GetObject.to_string(), "get_object");
        assert_eq!(StoreOp::List.as_ref(), "list");
    }

    #[test]
    fn test_request_message() {
        let err = StoreError::request(StoreOp::PutObject, "a/b.txt", "503 slow down");
        assert_eq!(err.to_string(), "put_object failed for a/b.txt: 503 slow down");
        assert!(!err.is_not_found());
        assert!(StoreError::not_found("x").is_not_found());
    }
}
