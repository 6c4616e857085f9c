use crate::layout::StoreLayout;
use crate::{fsync_dir, StoreError};
use blueprint_schema::ObjectHash;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const HASH_LEN: usize = 64;

/// Non-empty lowercase hex no longer than a full blake3 digest.
pub fn is_hash_prefix(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= HASH_LEN
        && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn is_hash(s: &str) -> bool {
    s.len() == HASH_LEN && is_hash_prefix(s)
}

/// Everything a blueprint store persists: normalized `blueprint.json`
/// documents, `blueprintignore` rule sets, source tarballs and the revision
/// records tying them together.
///
/// Each object is a file under `objects/` named by the blake3 hash of its
/// bytes. Writes go through a temporary file and a rename; reads re-hash.
/// Names that are not full hashes never reach the filesystem.
pub struct ObjectStore {
    layout: StoreLayout,
}

impl ObjectStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Store data and return its hash. Existing objects are not rewritten.
    pub fn put(&self, data: &[u8]) -> Result<ObjectHash, StoreError> {
        let hash = blake3::hash(data).to_hex().to_string();
        let dir = self.layout.objects_dir();
        let dest = dir.join(&hash);

        if dest.exists() {
            return Ok(ObjectHash::new(hash));
        }

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| StoreError::Io(e.error))?;
        fsync_dir(&dir)?;

        tracing::trace!("stored object {} ({} bytes)", &hash[..12], data.len());
        Ok(ObjectHash::new(hash))
    }

    /// Store the contents of a file, refusing anything larger than `limit` bytes.
    pub fn put_file(&self, path: &Path, limit: u64) -> Result<ObjectHash, StoreError> {
        let size = fs::metadata(path)?.len();
        if size > limit {
            return Err(StoreError::ContentTooLarge {
                path: path.display().to_string(),
                size,
                limit,
            });
        }
        let data = fs::read(path)?;
        self.put(&data)
    }

    fn object_path(&self, hash: &str) -> Option<PathBuf> {
        is_hash(hash).then(|| self.layout.objects_dir().join(hash))
    }

    /// Bytes of a document, rule set, tarball or revision record, re-hashed
    /// before they are returned.
    pub fn get(&self, hash: &str) -> Result<Vec<u8>, StoreError> {
        let Some(path) = self.object_path(hash).filter(|p| p.is_file()) else {
            return Err(StoreError::NotFound(format!("object {hash}")));
        };
        let data = fs::read(&path)?;

        let actual = blake3::hash(&data);
        let actual_hex = actual.to_hex();
        if actual_hex.as_str() != hash {
            return Err(StoreError::IntegrityFailure {
                hash: hash.to_owned(),
                expected: hash.to_owned(),
                actual: actual_hex.to_string(),
            });
        }

        Ok(data)
    }

    pub fn exists(&self, hash: &str) -> bool {
        self.object_path(hash).is_some_and(|p| p.is_file())
    }

    /// Drop an object gc found unreachable. Unknown hashes are ignored.
    pub fn remove(&self, hash: &str) -> Result<(), StoreError> {
        if let Some(path) = self.object_path(hash).filter(|p| p.is_file()) {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<ObjectHash>, StoreError> {
        let dir = self.layout.objects_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut hashes = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if is_hash(name) {
                    hashes.push(ObjectHash::new(name));
                }
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}
