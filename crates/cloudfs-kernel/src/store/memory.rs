//! In-memory object store.
//!
//! Flat key space with S3 listing semantics. Used for tests and ephemeral
//! storage. All data is lost when dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncRead, ReadBuf};

use super::error::{StoreError, StoreOp, StoreResult};
use super::ops::ObjectStore;
use super::types::{GetObjectOutput, HeadObjectOutput, ListOutput, ObjectInfo, PutOptions};

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub options: PutOptions,
    pub last_modified: SystemTime,
}

/// In-memory object store.
///
/// Thread-safe via internal locks. Supports one-shot fault injection per
/// operation so callers can exercise partial failures of composite
/// operations.
#[derive(Debug)]
pub struct MemoryStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    faults: Mutex<HashMap<StoreOp, usize>>,
    calls: AtomicUsize,
    max_read: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryStore {
    /// Create an empty store for the named bucket.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
            faults: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            max_read: usize::MAX,
        }
    }

    /// Cap the bytes returned by a single read of an object body.
    ///
    /// Network bodies rarely fill a caller's buffer in one read; this lets
    /// tests reproduce that.
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = max_read.max(1);
        self
    }

    /// Make the next call of `op` fail with a request error.
    ///
    /// Calls accumulate: two `fail_next(DeleteObject)` fail the next two deletes.
    pub fn fail_next(&self, op: StoreOp) {
        *self.faults.lock().entry(op).or_insert(0) += 1;
    }

    /// Total number of store calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Look up a stored object directly.
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().get(key).cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Record a call and consume a pending fault for `op`, if any.
    fn enter(&self, op: StoreOp, key: &str) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock();
        match faults.get_mut(&op) {
            Some(pending) if *pending > 0 => {
                *pending -= 1;
                Err(StoreError::request(op, key, "injected fault"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: &str, delimiter: char) -> StoreResult<ListOutput> {
        self.enter(StoreOp::List, prefix)?;
        let objects = self.objects.read();

        let mut output = ListOutput::default();
        let mut prefixes = BTreeSet::new();
        for (key, object) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            match rest.find(delimiter) {
                Some(idx) => {
                    let end = prefix.len() + idx + delimiter.len_utf8();
                    prefixes.insert(key[..end].to_string());
                }
                None => output.objects.push(ObjectInfo {
                    key: key.clone(),
                    size: object.data.len() as u64,
                    last_modified: object.last_modified,
                }),
            }
        }
        output.common_prefixes = prefixes.into_iter().collect();
        Ok(output)
    }

    async fn get_object(&self, key: &str) -> StoreResult<GetObjectOutput> {
        self.enter(StoreOp::GetObject, key)?;
        let objects = self.objects.read();
        let object = objects.get(key).ok_or_else(|| StoreError::not_found(key))?;
        Ok(GetObjectOutput {
            content_length: object.data.len() as u64,
            last_modified: object.last_modified,
            body: Box::pin(Trickle {
                data: object.data.clone(),
                pos: 0,
                max_read: self.max_read,
            }),
        })
    }

    async fn put_object(&self, key: &str, body: Bytes, options: &PutOptions) -> StoreResult<()> {
        self.enter(StoreOp::PutObject, key)?;
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                data: body,
                options: options.clone(),
                last_modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        self.enter(StoreOp::DeleteObject, key)?;
        self.objects.write().remove(key);
        Ok(())
    }

    async fn copy_object(&self, src: &str, dst: &str, options: &PutOptions) -> StoreResult<()> {
        self.enter(StoreOp::CopyObject, src)?;
        let mut objects = self.objects.write();
        let source = objects.get(src).ok_or_else(|| StoreError::not_found(src))?;

        let mut options = options.clone();
        if options.content_type.is_none() {
            options.content_type = source.options.content_type.clone();
        }
        let copied = StoredObject {
            data: source.data.clone(),
            options,
            last_modified: SystemTime::now(),
        };
        objects.insert(dst.to_string(), copied);
        Ok(())
    }

    async fn head_object(&self, key: &str) -> StoreResult<HeadObjectOutput> {
        self.enter(StoreOp::HeadObject, key)?;
        let objects = self.objects.read();
        let object = objects.get(key).ok_or_else(|| StoreError::not_found(key))?;
        Ok(HeadObjectOutput {
            size: object.data.len() as u64,
            last_modified: object.last_modified,
            content_type: object.options.content_type.clone(),
        })
    }
}

/// Body reader that hands out at most `max_read` bytes per poll.
struct Trickle {
    data: Bytes,
    pos: usize,
    max_read: usize,
}

impl AsyncRead for Trickle {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = &this.data[this.pos..];
        let n = remaining.len().min(this.max_read).min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}
