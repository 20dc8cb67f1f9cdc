//! Filesystem emulation over a flat object store.
//!
//! Files are objects keyed by their virtual path minus the `~/` marker.
//! Directories have no object of their own; a zero-byte sentinel
//! (`<dir>/__empty`) marks one as existing, and listings rely on the store's
//! common-prefix aggregation at `/`.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::{VfsError, VfsResult};
use super::ops::FileSystem;
use super::path::{
    directory_key, list_prefix, sentinel_key, to_store_key, to_virtual_path, DELIMITER,
};
use super::types::{DirectoryEntry, FileEntry, Presence, ReadStats};
use crate::config::{CloudFsConfig, ConfigProvider};
use crate::flows::{FlowBus, FsFlow, Subscription, DEFAULT_FLOW_CAPACITY};
use crate::mime::{self, GuessMime, MimeLookup};
use crate::store::{ObjectAcl, ObjectStore, PutOptions, S3Store, StoreError, StoreOp};

/// Chunk size for streamed reads.
pub const READ_CHUNK_SIZE: usize = 32 * 1024;

/// [`FileSystem`] over any [`ObjectStore`].
///
/// Holds no per-call state; share it behind an `Arc`.
pub struct ObjectStoreFs {
    store: Arc<dyn ObjectStore>,
    mime: Arc<dyn MimeLookup>,
    flows: FlowBus<FsFlow>,
    acl: ObjectAcl,
    cache_control: String,
    public_base_url: String,
}

impl std::fmt::Debug for ObjectStoreFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreFs")
            .field("bucket", &self.store.bucket())
            .field("acl", &self.acl)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreFs {
    /// Wrap an existing store client.
    pub fn new(store: Arc<dyn ObjectStore>, config: &CloudFsConfig) -> Self {
        Self {
            store,
            mime: Arc::new(GuessMime),
            flows: FlowBus::new(DEFAULT_FLOW_CAPACITY),
            acl: if config.public_read {
                ObjectAcl::PublicRead
            } else {
                ObjectAcl::Private
            },
            cache_control: config.cache_control(),
            public_base_url: config.public_base_url(),
        }
    }

    /// Connect to the S3 bucket named by `config`.
    pub fn connect(config: &CloudFsConfig) -> VfsResult<Self> {
        let store = S3Store::from_config(config).map_err(|source| VfsError::Setup {
            bucket: config.bucket.clone(),
            source,
        })?;
        Ok(Self::new(Arc::new(store), config))
    }

    /// Read configuration from `provider` and connect.
    pub fn from_provider(provider: &dyn ConfigProvider) -> VfsResult<Self> {
        let config = CloudFsConfig::from_provider(provider)?;
        Self::connect(&config)
    }

    /// Replace the content-type lookup.
    pub fn with_mime(mut self, mime: Arc<dyn MimeLookup>) -> Self {
        self.mime = mime;
        self
    }

    /// Event bus that mutations publish to.
    pub fn flows(&self) -> &FlowBus<FsFlow> {
        &self.flows
    }

    /// Underlying store client.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn bucket(&self) -> &str {
        self.store.bucket()
    }

    fn wrap(&self, op: StoreOp, key: &str, source: StoreError) -> VfsError {
        VfsError::store(op, key, self.store.bucket(), source)
    }

    fn put_options(&self) -> PutOptions {
        PutOptions::new()
            .with_acl(self.acl)
            .with_cache_control(self.cache_control.clone())
    }

    async fn head(&self, key: &str) -> VfsResult<Presence> {
        match self.store.head_object(key).await {
            Ok(_) => Ok(Presence::Present),
            Err(StoreError::NotFound { .. }) => Ok(Presence::Absent),
            Err(e) => Err(self.wrap(StoreOp::HeadObject, key, e)),
        }
    }

    async fn copy_key(&self, src: &str, dst: &str) -> VfsResult<()> {
        self.store
            .copy_object(src, dst, &self.put_options())
            .await
            .map_err(|e| self.wrap(StoreOp::CopyObject, src, e))
    }

    async fn delete_key(&self, key: &str) -> VfsResult<()> {
        self.store
            .delete_object(key)
            .await
            .map_err(|e| self.wrap(StoreOp::DeleteObject, key, e))
    }

    fn file_key(path: &str) -> VfsResult<String> {
        let key = to_store_key(path);
        if key.is_empty() || key.ends_with(DELIMITER) {
            return Err(VfsError::invalid_path(path));
        }
        Ok(key)
    }

    fn publish(&self, flow: FsFlow) {
        tracing::debug!(subject = flow.subject(), path = flow.source_path(), "publishing fs event");
        self.flows.publish(flow);
    }
}

/// Work item for the directory delete walk.
enum Visit {
    /// List the directory and schedule its children.
    Enter(String),
    /// Children are gone; remove this level's objects and sentinel.
    Leave { dir: String, objects: Vec<String> },
}

/// Fill `buf` from `body` until it is full or the body ends.
async fn fill_chunk(body: &mut (dyn AsyncRead + Send + Unpin), buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = body.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[async_trait]
impl FileSystem for ObjectStoreFs {
    async fn get_files(&self, parent: &str) -> VfsResult<Vec<FileEntry>> {
        let prefix = list_prefix(&directory_key(parent));
        let listing = self
            .store
            .list(&prefix, DELIMITER)
            .await
            .map_err(|e| self.wrap(StoreOp::List, &prefix, e))?;

        Ok(listing
            .objects
            .iter()
            .filter(|object| object.size > 0)
            .map(FileEntry::from_object)
            .collect())
    }

    async fn get_file(&self, path: &str) -> VfsResult<FileEntry> {
        let key = Self::file_key(path)?;
        match self.store.head_object(&key).await {
            Ok(head) => Ok(FileEntry::from_head(&key, &head)),
            Err(StoreError::NotFound { .. }) => Err(VfsError::not_found(path)),
            Err(e) => Err(self.wrap(StoreOp::HeadObject, &key, e)),
        }
    }

    async fn get_directories(&self, parent: &str) -> VfsResult<Vec<DirectoryEntry>> {
        let prefix = list_prefix(&directory_key(parent));
        let listing = self
            .store
            .list(&prefix, DELIMITER)
            .await
            .map_err(|e| self.wrap(StoreOp::List, &prefix, e))?;

        Ok(listing
            .common_prefixes
            .iter()
            .map(|p| DirectoryEntry::new(p.trim_end_matches(DELIMITER)))
            .collect())
    }

    fn get_directory(&self, path: &str) -> DirectoryEntry {
        DirectoryEntry::new(&directory_key(path))
    }

    async fn probe_file(&self, path: &str) -> VfsResult<Presence> {
        self.head(&to_store_key(path)).await
    }

    async fn probe_directory(&self, path: &str) -> VfsResult<Presence> {
        self.head(&sentinel_key(&directory_key(path))).await
    }

    #[tracing::instrument(skip(self, data), fields(len = data.len()), name = "fs.write_file")]
    async fn write_file(&self, path: &str, data: Bytes) -> VfsResult<()> {
        let key = Self::file_key(path)?;
        let options = self
            .put_options()
            .with_content_type(mime::content_type_for(self.mime.as_ref(), &key));

        self.store
            .put_object(&key, data, &options)
            .await
            .map_err(|e| self.wrap(StoreOp::PutObject, &key, e))?;

        self.publish(FsFlow::Written {
            path: to_virtual_path(&key),
        });
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "fs.delete_file")]
    async fn delete_file(&self, path: &str) -> VfsResult<()> {
        let key = Self::file_key(path)?;
        self.delete_key(&key).await?;
        // Carries the caller's path as given, not the normalized one.
        self.publish(FsFlow::Deleted {
            path: path.to_string(),
        });
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "fs.copy_file")]
    async fn copy_file(&self, from: &str, to: &str) -> VfsResult<()> {
        let src = Self::file_key(from)?;
        let dst = Self::file_key(to)?;
        self.copy_key(&src, &dst).await?;
        self.publish(FsFlow::Copied {
            from: to_virtual_path(&src),
            to: to_virtual_path(&dst),
        });
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "fs.move_file")]
    async fn move_file(&self, from: &str, to: &str) -> VfsResult<()> {
        let src = Self::file_key(from)?;
        let dst = Self::file_key(to)?;
        if src == dst {
            // Nothing to move, but the source must exist.
            if !self.head(&src).await?.is_present() {
                return Err(VfsError::not_found(from));
            }
        } else {
            self.copy_key(&src, &dst).await?;
            if let Err(e) = self.delete_key(&src).await {
                tracing::warn!(src, dst, error = %e, "move copied but could not delete source");
                return Err(e);
            }
        }
        self.publish(FsFlow::Moved {
            from: to_virtual_path(&src),
            to: to_virtual_path(&dst),
        });
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "fs.create_directory")]
    async fn create_directory(&self, path: &str) -> VfsResult<()> {
        let dir = directory_key(path);
        let sentinel = sentinel_key(&dir);
        self.store
            .put_object(&sentinel, Bytes::new(), &self.put_options())
            .await
            .map_err(|e| self.wrap(StoreOp::PutObject, &sentinel, e))?;
        self.publish(FsFlow::DirectoryCreated {
            path: to_virtual_path(&dir),
        });
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "fs.delete_directory")]
    async fn delete_directory(&self, path: &str) -> VfsResult<()> {
        let root = directory_key(path);
        if root.is_empty() {
            return Err(VfsError::invalid_path("cannot delete the root directory"));
        }

        // Post-order walk with an explicit stack: a directory's objects go
        // only after every subdirectory below it is gone.
        let mut pending = vec![Visit::Enter(root.clone())];
        let mut deleted = 0usize;
        let mut directories = 0usize;

        while let Some(visit) = pending.pop() {
            match visit {
                Visit::Enter(dir) => {
                    let prefix = list_prefix(&dir);
                    let listing = self
                        .store
                        .list(&prefix, DELIMITER)
                        .await
                        .map_err(|e| self.wrap(StoreOp::List, &prefix, e))?;

                    let objects = listing.objects.into_iter().map(|o| o.key).collect();
                    pending.push(Visit::Leave { dir, objects });
                    for sub in listing.common_prefixes {
                        pending.push(Visit::Enter(sub.trim_end_matches(DELIMITER).to_string()));
                    }
                }
                Visit::Leave { dir, objects } => {
                    let sentinel = sentinel_key(&dir);
                    for key in objects.iter().filter(|k| **k != sentinel) {
                        self.delete_key(key).await?;
                        deleted += 1;
                    }
                    self.delete_key(&sentinel).await?;
                    directories += 1;
                }
            }
        }

        tracing::info!(dir = %root, directories, files = deleted, "deleted directory tree");
        self.publish(FsFlow::DirectoryDeleted {
            path: to_virtual_path(&root),
        });
        Ok(())
    }

    async fn move_directory(&self, from: &str, to: &str) -> VfsResult<()> {
        tracing::debug!(from, to, "move_directory is not supported");
        Err(VfsError::Unsupported("move_directory"))
    }

    async fn open_file(&self, path: &str) -> VfsResult<Cursor<Vec<u8>>> {
        let key = to_store_key(path);
        let object = self
            .store
            .get_object(&key)
            .await
            .map_err(|e| self.wrap(StoreOp::GetObject, &key, e))?;
        let data = object
            .into_bytes(&key)
            .await
            .map_err(|e| self.wrap(StoreOp::GetObject, &key, e))?;
        Ok(Cursor::new(data))
    }

    async fn read_file_contents(
        &self,
        path: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> VfsResult<ReadStats> {
        let key = to_store_key(path);
        // The body is owned here and dropped on every return path, which
        // releases the response.
        let mut object = self
            .store
            .get_object(&key)
            .await
            .map_err(|e| self.wrap(StoreOp::GetObject, &key, e))?;

        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut stats = ReadStats::default();
        loop {
            let filled = fill_chunk(&mut object.body, &mut buf).await.map_err(|e| {
                self.wrap(StoreOp::GetObject, &key, StoreError::request(StoreOp::GetObject, &key, e))
            })?;
            if filled == 0 {
                break;
            }
            sink.write_all(&buf[..filled]).await?;
            stats.bytes += filled as u64;
            stats.chunks += 1;
            if filled < READ_CHUNK_SIZE {
                break;
            }
        }
        sink.flush().await?;
        Ok(stats)
    }

    async fn search_files(&self, query: &str, scopes: &[String]) -> Vec<FileEntry> {
        tracing::debug!(query, scopes = scopes.len(), "search is not supported");
        Vec::new()
    }

    fn subscribe(&self, pattern: &str) -> Subscription<FsFlow> {
        self.flows.subscribe(pattern)
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, to_store_key(path))
    }
}
