use crate::layout::StoreLayout;
use crate::{fsync_dir, StoreError};
use blueprint_schema::{validate_name, RevisionId};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Branch names become file names under `refs/heads`, so on top of the
/// blueprint name rules they may not be hidden or path components.
pub fn validate_ref_name(name: &str) -> Result<(), StoreError> {
    validate_name(name).map_err(|_| StoreError::InvalidName(name.to_owned()))?;
    if name.starts_with('.') || name.ends_with(".lock") {
        return Err(StoreError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Named branch heads, one file per branch holding a revision id.
pub struct RefStore {
    layout: StoreLayout,
}

impl RefStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn read(&self, name: &str) -> Result<Option<RevisionId>, StoreError> {
        validate_ref_name(name)?;
        let path = self.layout.head_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(RevisionId::new(content.trim())))
    }

    pub fn resolve(&self, name: &str) -> Result<RevisionId, StoreError> {
        self.read(name)?
            .ok_or_else(|| StoreError::NotFound(format!("blueprint '{name}'")))
    }

    /// Point `name` at `revision`, replacing the old head atomically.
    pub fn update(&self, name: &str, revision: &RevisionId) -> Result<(), StoreError> {
        validate_ref_name(name)?;
        let dir = self.layout.heads_dir();
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        writeln!(tmp, "{revision}")?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.layout.head_path(name))
            .map_err(|e| StoreError::Io(e.error))?;
        fsync_dir(&dir)?;
        tracing::debug!("{name} -> {}", revision.short());
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        validate_ref_name(name)?;
        let path = self.layout.head_path(name);
        if !path.exists() {
            return Err(StoreError::NotFound(format!("blueprint '{name}'")));
        }
        fs::remove_file(&path)?;
        fsync_dir(&self.layout.heads_dir())?;
        Ok(())
    }

    /// Branch names in sorted order.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.layout.heads_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) if validate_ref_name(name).is_ok() => names.push(name.to_owned()),
                _ => {}
            }
        }
        names.sort();
        Ok(names)
    }

    /// Every branch with the revision it points at.
    pub fn heads(&self) -> Result<Vec<(String, RevisionId)>, StoreError> {
        let mut heads = Vec::new();
        for name in self.list()? {
            let id = self.resolve(&name)?;
            heads.push((name, id));
        }
        Ok(heads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_refs() -> (tempfile::TempDir, RefStore) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        (dir, RefStore::new(layout))
    }

    #[test]
    fn validate_ref_names() {
        for good in ["web", "my-blueprint", "db_2", "v1.0"] {
            assert!(validate_ref_name(good).is_ok(), "{good}");
        }
        for bad in ["", "-", "a b", "a/b", ".", "..", ".hidden", "web.lock"] {
            assert!(
                matches!(validate_ref_name(bad), Err(StoreError::InvalidName(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn update_then_read() {
        let (_dir, refs) = test_refs();
        assert_eq!(refs.read("web").unwrap(), None);
        refs.update("web", &RevisionId::new("abc123")).unwrap();
        assert_eq!(refs.read("web").unwrap(), Some(RevisionId::new("abc123")));
        refs.update("web", &RevisionId::new("def456")).unwrap();
        assert_eq!(refs.resolve("web").unwrap(), RevisionId::new("def456"));
    }

    #[test]
    fn resolve_missing_is_not_found() {
        let (_dir, refs) = test_refs();
        assert!(refs.resolve("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_removes_head() {
        let (_dir, refs) = test_refs();
        refs.update("web", &RevisionId::new("abc")).unwrap();
        assert!(refs.read("web").unwrap().is_some());
        refs.delete("web").unwrap();
        assert!(refs.read("web").unwrap().is_none());
        assert!(refs.delete("web").unwrap_err().is_not_found());
    }

    #[test]
    fn list_is_sorted_and_skips_temp_files() {
        let (dir, refs) = test_refs();
        refs.update("zeta", &RevisionId::new("1")).unwrap();
        refs.update("alpha", &RevisionId::new("2")).unwrap();
        fs::write(StoreLayout::new(dir.path()).heads_dir().join(".tmpXYZ"), "x").unwrap();
        assert_eq!(refs.list().unwrap(), vec!["alpha", "zeta"]);

        let heads = refs.heads().unwrap();
        assert_eq!(heads[0], ("alpha".to_owned(), RevisionId::new("2")));
    }

    #[test]
    fn list_on_uninitialized_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let refs = RefStore::new(StoreLayout::new(dir.path().join("nowhere")));
        assert!(refs.list().unwrap().is_empty());
    }

    #[test]
    fn invalid_names_never_touch_disk() {
        let (_dir, refs) = test_refs();
        assert!(matches!(
            refs.update("../escape", &RevisionId::new("1")),
            Err(StoreError::InvalidName(_))
        ));
        assert!(refs.list().unwrap().is_empty());
    }
}
