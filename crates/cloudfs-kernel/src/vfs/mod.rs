//! Virtual filesystem over an object store.
//!
//! [`FileSystem`] is the host-facing contract; [`ObjectStoreFs`] implements
//! it on any [`ObjectStore`](crate::store::ObjectStore).

mod error;
mod object_fs;
mod ops;
pub mod path;
mod types;

pub use error::{VfsError, VfsResult};
pub use object_fs::{ObjectStoreFs, READ_CHUNK_SIZE};
pub use ops::FileSystem;
pub use path::SENTINEL_NAME;
pub use types::{DirectoryEntry, FileEntry, Presence, ReadStats};
