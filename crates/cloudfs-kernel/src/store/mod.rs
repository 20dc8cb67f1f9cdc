//! Object store clients.
//!
//! [`ObjectStore`] is the flat key/value surface the filesystem adapter is
//! written against:
//!
//! - [`MemoryStore`] - In-memory store (testing, ephemeral use)
//! - [`S3Store`] - S3 and S3-compatible services via `object_store`

mod error;
mod memory;
mod ops;
mod s3;
mod types;

pub use error::{StoreError, StoreOp, StoreResult};
pub use memory::{MemoryStore, StoredObject};
pub use ops::ObjectStore;
pub use s3::S3Store;
pub use types::{
    GetObjectOutput, HeadObjectOutput, ListOutput, ObjectAcl, ObjectBody, ObjectInfo, PutOptions,
};
