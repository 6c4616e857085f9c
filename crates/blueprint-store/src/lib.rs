//! Content-addressable revision store for blueprints.
//!
//! This crate provides the storage layer: a content-addressable `ObjectStore`
//! backed by blake3 hashing with atomic writes, `RevisionStore` for Git-like
//! revisions (a tree of named objects plus a parent link), `RefStore` for the
//! named branch heads, `StoreLayout` for directory structure management, and
//! `GarbageCollector` for objects no branch can reach anymore.

pub mod gc;
pub mod integrity;
pub mod layout;
pub mod objects;
pub mod refs;
pub mod revisions;

pub use gc::{GarbageCollector, GcReport};
pub use integrity::{verify_store_integrity, IntegrityFailure, IntegrityReport};
pub use layout::{StoreLayout, STORE_FORMAT_VERSION};
pub use objects::ObjectStore;
pub use refs::{validate_ref_name, RefStore};
pub use revisions::{
    validate_archive_name, Revision, RevisionArchives, RevisionStore, BLUEPRINT_FILE, IGNORE_FILE,
    LEGACY_IGNORE_FILES,
};

use std::path::Path;
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable on every
/// filesystem, not only on ext4 with `data=ordered`.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("integrity check failed for object '{hash}': expected {expected}, got {actual}")]
    IntegrityFailure {
        hash: String,
        expected: String,
        actual: String,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("store format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{path} is {size} bytes, larger than the {limit} byte limit")]
    ContentTooLarge { path: String, size: u64, limit: u64 },
    #[error("invalid blueprint name: {0}")]
    InvalidName(String),
    #[error("invalid source archive name: {0:?}")]
    InvalidArchiveName(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
