//! Filesystem contract exposed to hosts.
//!
//! All operations take `~/`-rooted virtual paths. Mutations publish a
//! lifecycle event once the store has accepted them.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use super::types::{DirectoryEntry, FileEntry, Presence, ReadStats};
use super::VfsResult;
use crate::flows::{FsFlow, Subscription};

/// Host-facing filesystem operations.
#[async_trait]
pub trait FileSystem: Send + Sync {
    // ========================================================================
    // Listing and metadata
    // ========================================================================

    /// Files directly under `parent`. Zero-byte objects are never reported.
    async fn get_files(&self, parent: &str) -> VfsResult<Vec<FileEntry>>;

    /// Metadata for one file.
    async fn get_file(&self, path: &str) -> VfsResult<FileEntry>;

    /// Directories directly under `parent`.
    async fn get_directories(&self, parent: &str) -> VfsResult<Vec<DirectoryEntry>>;

    /// Descriptor for a directory. Does not consult the store.
    fn get_directory(&self, path: &str) -> DirectoryEntry;

    /// Probe for a file, distinguishing absence from store failure.
    async fn probe_file(&self, path: &str) -> VfsResult<Presence>;

    /// Probe for a directory's sentinel object.
    async fn probe_directory(&self, path: &str) -> VfsResult<Presence>;

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Upload a whole file, replacing any existing content.
    async fn write_file(&self, path: &str, data: Bytes) -> VfsResult<()>;

    async fn delete_file(&self, path: &str) -> VfsResult<()>;

    async fn copy_file(&self, from: &str, to: &str) -> VfsResult<()>;

    /// Copy then delete the source. Not atomic: a failed delete leaves both.
    /// Moving a file onto itself only checks that it exists.
    async fn move_file(&self, from: &str, to: &str) -> VfsResult<()>;

    async fn create_directory(&self, path: &str) -> VfsResult<()>;

    /// Remove a directory and everything below it.
    async fn delete_directory(&self, path: &str) -> VfsResult<()>;

    async fn move_directory(&self, from: &str, to: &str) -> VfsResult<()>;

    // ========================================================================
    // Reading
    // ========================================================================

    /// Download a whole file into a seekable buffer.
    async fn open_file(&self, path: &str) -> VfsResult<Cursor<Vec<u8>>>;

    /// Stream a file into `sink` without buffering all of it.
    async fn read_file_contents(
        &self,
        path: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> VfsResult<ReadStats>;

    /// Search is not supported; always empty.
    async fn search_files(&self, query: &str, scopes: &[String]) -> Vec<FileEntry>;

    // ========================================================================
    // Events and display
    // ========================================================================

    /// Subscribe to lifecycle events matching `pattern`.
    fn subscribe(&self, pattern: &str) -> Subscription<FsFlow>;

    /// Public URL for a path.
    fn public_url(&self, path: &str) -> String;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Returns true if the file exists. Store failures read as absent.
    async fn file_exists(&self, path: &str) -> bool {
        match self.probe_file(path).await {
            Ok(presence) => presence.is_present(),
            Err(e) => {
                tracing::debug!(path, error = %e, "file probe failed, reporting absent");
                false
            }
        }
    }

    /// Returns true if the directory's sentinel exists. Store failures read as absent.
    async fn directory_exists(&self, path: &str) -> bool {
        match self.probe_directory(path).await {
            Ok(presence) => presence.is_present(),
            Err(e) => {
                tracing::debug!(path, error = %e, "directory probe failed, reporting absent");
                false
            }
        }
    }

    /// Buffer a reader fully, then upload it. Returns the byte count.
    async fn write_from_reader(
        &self,
        path: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> VfsResult<u64> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let len = data.len() as u64;
        self.write_file(path, Bytes::from(data)).await?;
        Ok(len)
    }
}
