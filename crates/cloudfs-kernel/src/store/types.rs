//! Request and response types for object store calls.

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::time::SystemTime;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::{StoreError, StoreOp, StoreResult};

/// One object from a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time as reported by the store.
    pub last_modified: SystemTime,
}

/// Result of a prefix + delimiter listing.
///
/// `objects` holds keys with no delimiter after the prefix. Deeper keys are
/// folded into `common_prefixes`, each ending with the delimiter
/// (`upload/28/`), the way S3 reports them.
#[derive(Debug, Clone, Default)]
pub struct ListOutput {
    pub objects: Vec<ObjectInfo>,
    pub common_prefixes: Vec<String>,
}

/// Metadata from a HEAD request.
#[derive(Debug, Clone)]
pub struct HeadObjectOutput {
    pub size: u64,
    pub last_modified: SystemTime,
    pub content_type: Option<String>,
}

/// Streaming object body. Dropping it releases the underlying response.
pub type ObjectBody = Pin<Box<dyn AsyncRead + Send>>;

/// Result of a GET request.
pub struct GetObjectOutput {
    pub content_length: u64,
    pub last_modified: SystemTime,
    pub body: ObjectBody,
}

impl fmt::Debug for GetObjectOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetObjectOutput")
            .field("content_length", &self.content_length)
            .field("last_modified", &self.last_modified)
            .field("body", &"<stream>")
            .finish()
    }
}

impl GetObjectOutput {
    /// Drain the body into memory.
    pub async fn into_bytes(mut self, key: &str) -> StoreResult<Vec<u8>> {
        let mut data = Vec::with_capacity(self.content_length as usize);
        self.body
            .read_to_end(&mut data)
            .await
            .map_err(|e| StoreError::request(StoreOp::GetObject, key, e))?;
        Ok(data)
    }
}

/// Canned access control applied to written objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ObjectAcl {
    #[default]
    Private,
    PublicRead,
}

impl ObjectAcl {
    /// Value for the `x-amz-acl` header.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ObjectAcl::Private => "private",
            ObjectAcl::PublicRead => "public-read",
        }
    }
}

/// Options for put and copy requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// MIME type for the `Content-Type` header.
    pub content_type: Option<String>,
    /// Canned ACL.
    pub acl: ObjectAcl,
    /// Value for the `Cache-Control` header.
    pub cache_control: Option<String>,
    /// User metadata (`x-amz-meta-*`).
    pub metadata: BTreeMap<String, String>,
}

impl PutOptions {
    /// Create empty options (private, no headers).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the canned ACL.
    pub fn with_acl(mut self, acl: ObjectAcl) -> Self {
        self.acl = acl;
        self
    }

    /// Set the cache-control header.
    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Add a user metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
