//! VFS error types.

use std::io;
use thiserror::Error;

use crate::config::ConfigError;
use crate::store::{StoreError, StoreOp};

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid path for the operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A store request failed; carries enough context to find the object.
    #[error("{op} {bucket}/{key}: {source}")]
    Store {
        op: StoreOp,
        key: String,
        bucket: String,
        #[source]
        source: StoreError,
    },

    /// The store client could not be built.
    #[error("store setup failed for bucket {bucket}: {source}")]
    Setup {
        bucket: String,
        #[source]
        source: StoreError,
    },

    /// The operation is not implemented by this filesystem.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// I/O error (writing to a caller's sink).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Wrap a store failure with its operation, key, and bucket.
    pub fn store(
        op: StoreOp,
        key: impl Into<String>,
        bucket: impl Into<String>,
        source: StoreError,
    ) -> Self {
        Self::Store {
            op,
            key: key.into(),
            bucket: bucket.into(),
            source,
        }
    }

    /// Returns true if the object was absent, whether reported directly or
    /// wrapped in store context.
    pub fn is_not_found(&self) -> bool {
        match self {
            VfsError::NotFound(_) => true,
            VfsError::Store { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Unsupported(op) => io::Error::new(io::ErrorKind::Unsupported, op),
            VfsError::Io(e) => e,
            e @ VfsError::Store { .. } if e.is_not_found() => {
                io::Error::new(io::ErrorKind::NotFound, e)
            }
            other => io::Error::other(other),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_context() {
        let err = VfsError::store(
            StoreOp::GetObject,
            "upload/a.jpg",
            "cms",
            StoreError::request(StoreOp::GetObject, "upload/a.jpg", "timed out"),
        );
        let shown = err.to_string();
        assert!(shown.contains("cms/upload/a.jpg"));
        assert!(shown.contains("get_object"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_wrapped_not_found() {
        let err = VfsError::store(
            StoreOp::GetObject,
            "gone",
            "cms",
            StoreError::not_found("gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(io::Error::from(err).kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_io_conversion() {
        let unsupported: io::Error = VfsError::Unsupported("move_directory").into();
        assert_eq!(unsupported.kind(), io::ErrorKind::Unsupported);

        let missing: io::Error = VfsError::not_found("~/x").into();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }
}
