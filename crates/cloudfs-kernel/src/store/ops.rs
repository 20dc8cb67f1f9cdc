//! Object store client trait.
//!
//! The minimal S3-shaped surface the filesystem adapter needs. Keys are
//! plain strings; the store has no notion of directories.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::StoreResult;
use super::types::{GetObjectOutput, HeadObjectOutput, ListOutput, PutOptions};

/// Operations against one bucket of an S3-compatible store.
///
/// Implementations own retries, signing, and transport. Every call is
/// independent; implementations must be safe to share across tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this client is bound to (used in error context).
    fn bucket(&self) -> &str;

    /// List keys under `prefix`, folding anything past the next `delimiter`
    /// into common prefixes.
    async fn list(&self, prefix: &str, delimiter: char) -> StoreResult<ListOutput>;

    /// Fetch an object as a stream.
    async fn get_object(&self, key: &str) -> StoreResult<GetObjectOutput>;

    /// Create or replace an object.
    async fn put_object(&self, key: &str, body: Bytes, options: &PutOptions) -> StoreResult<()>;

    /// Delete an object. Deleting an absent key succeeds.
    async fn delete_object(&self, key: &str) -> StoreResult<()>;

    /// Server-side copy, applying `options` to the destination.
    async fn copy_object(&self, src: &str, dst: &str, options: &PutOptions) -> StoreResult<()>;

    /// Metadata-only probe. Absent keys yield `StoreError::NotFound`.
    async fn head_object(&self, key: &str) -> StoreResult<HeadObjectOutput>;
}
