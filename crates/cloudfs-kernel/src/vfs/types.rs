//! Core VFS types.
//!
//! Entries are derived from store listings and metadata on every call;
//! nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use super::path::{file_name, to_virtual_path};
use crate::store::{HeadObjectOutput, ObjectInfo};

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Last path segment.
    pub name: String,
    /// `~/`-rooted path.
    pub virtual_path: String,
    /// Size in bytes.
    pub length: u64,
    /// The store keeps one timestamp, so `created == updated`.
    pub created: SystemTime,
    pub updated: SystemTime,
}

impl FileEntry {
    /// Entry for a listed object.
    pub fn from_object(object: &ObjectInfo) -> Self {
        Self::new(&object.key, object.size, object.last_modified)
    }

    /// Entry for a probed object.
    pub fn from_head(key: &str, head: &HeadObjectOutput) -> Self {
        Self::new(key, head.size, head.last_modified)
    }

    fn new(key: &str, length: u64, modified: SystemTime) -> Self {
        Self {
            name: file_name(key).to_string(),
            virtual_path: to_virtual_path(key),
            length,
            created: modified,
            updated: modified,
        }
    }
}

/// An emulated directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Last path segment (empty for the root).
    pub name: String,
    /// `~/`-rooted path, no trailing slash.
    pub virtual_path: String,
    /// Directories carry no store timestamps; both are the time of the call.
    pub created: SystemTime,
    pub updated: SystemTime,
}

impl DirectoryEntry {
    /// Entry for a directory key (no trailing delimiter).
    pub fn new(dir_key: &str) -> Self {
        let now = SystemTime::now();
        Self {
            name: file_name(dir_key).to_string(),
            virtual_path: to_virtual_path(dir_key),
            created: now,
            updated: now,
        }
    }
}

/// Outcome of an existence probe that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present)
    }
}

/// Accounting for a streamed read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Bytes written to the sink.
    pub bytes: u64,
    /// Read/write chunk cycles.
    pub chunks: u64,
}
