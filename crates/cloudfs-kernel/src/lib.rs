//! # cloudfs-kernel
//!
//! Virtual filesystem over S3-compatible object storage.
//!
//! Object stores are flat: keys map to byte blobs and nothing else. This
//! crate layers a hierarchical filesystem on top of one:
//! - Virtual paths (`~/upload/28/photo.jpg`) map to object keys
//!   (`upload/28/photo.jpg`) and back
//! - Directories exist as zero-byte sentinel objects (`<dir>/__empty`)
//! - Listings use the store's prefix + delimiter aggregation
//! - Every successful mutation publishes a lifecycle event on a [`FlowBus`]

pub mod config;
pub mod flows;
pub mod mime;
pub mod store;
pub mod vfs;

pub use config::{CloudFsConfig, ConfigError, ConfigProvider, EnvProvider, FileProvider, Layered};
pub use flows::{FlowBus, FlowMessage, FsFlow, HasSubject, Subscription, matches_pattern};
pub use mime::{GuessMime, MimeLookup, DEFAULT_CONTENT_TYPE};
pub use store::{
    GetObjectOutput, HeadObjectOutput, ListOutput, MemoryStore, ObjectAcl, ObjectInfo,
    ObjectStore, PutOptions, S3Store, StoreError, StoreOp,
};
pub use vfs::{
    DirectoryEntry, FileEntry, FileSystem, ObjectStoreFs, Presence, ReadStats, VfsError,
    VfsResult, READ_CHUNK_SIZE, SENTINEL_NAME,
};
