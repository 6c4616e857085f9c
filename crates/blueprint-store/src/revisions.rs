use crate::objects::{is_hash_prefix, ObjectStore};
use crate::StoreError;
use blueprint_schema::{ArchiveReader, ObjectHash, RevisionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;

/// Name of the blueprint document inside a revision tree.
pub const BLUEPRINT_FILE: &str = "blueprint.json";
/// Name of the merged ignore rules inside a revision tree.
pub const IGNORE_FILE: &str = "blueprintignore";
/// Older trees stored the rules under these names.
pub const LEGACY_IGNORE_FILES: [&str; 2] = [".blueprintignore", ".gitignore"];

/// Source tarballs share the flat revision tree with the document and rules,
/// and are read from a sources directory by that name, so a name must be a
/// plain file name that no reserved entry uses.
pub fn validate_archive_name(name: &str) -> Result<(), StoreError> {
    let reserved =
        name == BLUEPRINT_FILE || name == IGNORE_FILE || LEGACY_IGNORE_FILES.contains(&name);
    if reserved || name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StoreError::InvalidArchiveName(name.to_owned()));
    }
    Ok(())
}

/// One committed state of a blueprint: a flat tree of named objects plus a
/// link to the revision it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub tree: BTreeMap<String, ObjectHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RevisionId>,
    pub message: String,
    pub created_at: String,
}

impl Revision {
    pub fn new(
        tree: BTreeMap<String, ObjectHash>,
        parent: Option<RevisionId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parent,
            message: message.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn entry(&self, filename: &str) -> Option<&ObjectHash> {
        self.tree.get(filename)
    }

    /// The stored ignore rules, preferring the current name over legacy ones.
    pub fn ignore_entry(&self) -> Option<&ObjectHash> {
        std::iter::once(IGNORE_FILE)
            .chain(LEGACY_IGNORE_FILES)
            .find_map(|name| self.tree.get(name))
    }
}

/// Revision records stored as JSON objects in the object store. A revision's
/// id is the hash of its record.
pub struct RevisionStore<'a> {
    objects: &'a ObjectStore,
}

impl<'a> RevisionStore<'a> {
    pub fn new(objects: &'a ObjectStore) -> Self {
        Self { objects }
    }

    pub fn put(&self, revision: &Revision) -> Result<RevisionId, StoreError> {
        let content = serde_json::to_string_pretty(revision)?;
        let hash = self.objects.put(content.as_bytes())?;
        Ok(RevisionId::new(hash.into_inner()))
    }

    pub fn get(&self, id: &str) -> Result<Revision, StoreError> {
        let data = self.objects.get(id).map_err(|e| match e {
            StoreError::NotFound(_) => StoreError::NotFound(format!("revision {id}")),
            other => other,
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Resolve an abbreviated revision id to the single matching full id.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<RevisionId, StoreError> {
        if !is_hash_prefix(prefix) {
            return Err(StoreError::NotFound(format!("revision {prefix:?}")));
        }
        if self.objects.exists(prefix) {
            return Ok(RevisionId::new(prefix));
        }
        let mut matches = self
            .objects
            .list()?
            .into_iter()
            .filter(|hash| hash.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(hash), None) => Ok(RevisionId::new(hash.into_inner())),
            _ => Err(StoreError::NotFound(format!("revision {prefix}"))),
        }
    }

    pub fn read_file(&self, revision: &Revision, filename: &str) -> Result<Vec<u8>, StoreError> {
        let hash = revision
            .entry(filename)
            .ok_or_else(|| StoreError::NotFound(format!("file {filename} in revision")))?;
        self.objects.get(hash)
    }

    /// Revisions from `head` back to the root, newest first.
    pub fn history(&self, head: &RevisionId) -> Result<Vec<(RevisionId, Revision)>, StoreError> {
        let mut out = Vec::new();
        let mut next = Some(head.clone());
        while let Some(id) = next {
            let revision = self.get(&id)?;
            next = revision.parent.clone();
            out.push((id, revision));
        }
        Ok(out)
    }

    pub fn archives(&self, revision: &'a Revision) -> RevisionArchives<'a> {
        RevisionArchives {
            objects: self.objects,
            revision,
        }
    }
}

/// Serves source tarballs out of a committed revision during a walk.
pub struct RevisionArchives<'a> {
    objects: &'a ObjectStore,
    revision: &'a Revision,
}

impl ArchiveReader for RevisionArchives<'_> {
    fn read_archive(&self, filename: &str) -> io::Result<Vec<u8>> {
        let hash = self.revision.entry(filename).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{filename} is not part of this revision"),
            )
        })?;
        self.objects.get(hash).map_err(|e| match e {
            StoreError::Io(e) => e,
            other => io::Error::other(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StoreLayout;
    use blueprint_schema::{walk_with_archives, ArchiveContent, Blueprint, Visitor};

    fn test_objects() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        (dir, ObjectStore::new(layout))
    }

    fn tree(objects: &ObjectStore, files: &[(&str, &str)]) -> BTreeMap<String, ObjectHash> {
        files
            .iter()
            .map(|(name, data)| ((*name).to_owned(), objects.put(data.as_bytes()).unwrap()))
            .collect()
    }

    #[test]
    fn put_get_roundtrip() {
        let (_dir, objects) = test_objects();
        let revisions = RevisionStore::new(&objects);
        let rev = Revision::new(tree(&objects, &[(BLUEPRINT_FILE, "{}")]), None, "first");
        let id = revisions.put(&rev).unwrap();
        assert_eq!(revisions.get(&id).unwrap(), rev);
        assert_eq!(revisions.read_file(&rev, BLUEPRINT_FILE).unwrap(), b"{}");
    }

    #[test]
    fn get_unknown_revision_is_not_found() {
        let (_dir, objects) = test_objects();
        let revisions = RevisionStore::new(&objects);
        match revisions.get("deadbeef") {
            Err(StoreError::NotFound(what)) => assert_eq!(what, "revision deadbeef"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let (_dir, objects) = test_objects();
        let revisions = RevisionStore::new(&objects);
        let rev = Revision::new(BTreeMap::new(), None, "empty");
        assert!(revisions
            .read_file(&rev, BLUEPRINT_FILE)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn history_follows_parents() {
        let (_dir, objects) = test_objects();
        let revisions = RevisionStore::new(&objects);
        let first = revisions
            .put(&Revision::new(BTreeMap::new(), None, "one"))
            .unwrap();
        let second = revisions
            .put(&Revision::new(BTreeMap::new(), Some(first.clone()), "two"))
            .unwrap();
        let third = revisions
            .put(&Revision::new(BTreeMap::new(), Some(second.clone()), "three"))
            .unwrap();

        let history = revisions.history(&third).unwrap();
        let ids: Vec<_> = history.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, vec![third, second, first]);
        assert_eq!(history[2].1.message, "one");
        assert!(history[2].1.parent.is_none());
    }

    #[test]
    fn archive_names_must_be_plain_and_unreserved() {
        validate_archive_name("usr-local.tar").unwrap();
        validate_archive_name("opt-app.tar.gz").unwrap();
        for bad in [
            "",
            ".",
            "..",
            "../../etc/shadow",
            "/etc/shadow",
            "a\\b.tar",
            BLUEPRINT_FILE,
            IGNORE_FILE,
            ".gitignore",
        ] {
            assert!(
                matches!(validate_archive_name(bad), Err(StoreError::InvalidArchiveName(_))),
                "{bad:?} must be rejected"
            );
        }
    }

    #[test]
    fn resolve_prefix_finds_unique_match() {
        let (_dir, objects) = test_objects();
        let revisions = RevisionStore::new(&objects);
        let id = revisions
            .put(&Revision::new(BTreeMap::new(), None, "only"))
            .unwrap();
        assert_eq!(revisions.resolve_prefix(id.short()).unwrap(), id);
        assert_eq!(revisions.resolve_prefix(&id).unwrap(), id);
        for bogus in ["", ".", "..", "zzzz", "../objects"] {
            assert!(
                revisions.resolve_prefix(bogus).unwrap_err().is_not_found(),
                "{bogus:?} must not resolve"
            );
        }
    }

    #[test]
    fn ignore_entry_falls_back_to_legacy_names() {
        let (_dir, objects) = test_objects();
        let legacy = Revision::new(
            tree(&objects, &[(".gitignore", "/tmp\n")]),
            None,
            "legacy",
        );
        assert_eq!(legacy.ignore_entry(), legacy.entry(".gitignore"));

        let both = Revision::new(
            tree(
                &objects,
                &[(IGNORE_FILE, "/etc\n"), (".blueprintignore", "/var\n")],
            ),
            None,
            "current",
        );
        assert_eq!(both.ignore_entry(), both.entry(IGNORE_FILE));

        let none = Revision::new(BTreeMap::new(), None, "none");
        assert!(none.ignore_entry().is_none());
    }

    #[test]
    fn archives_feed_walk() {
        struct Sizes(Vec<(String, usize)>);
        impl Visitor for Sizes {
            fn source(
                &mut self,
                dirname: &str,
                _filename: &str,
                content: Option<ArchiveContent<'_>>,
                _url: Option<&str>,
            ) {
                let size = content.map_or(0, |c| c.read().unwrap().len());
                self.0.push((dirname.to_owned(), size));
            }
        }

        let (_dir, objects) = test_objects();
        let revisions = RevisionStore::new(&objects);
        let rev = Revision::new(
            tree(&objects, &[("usr-local.tar", "0123456789")]),
            None,
            "sources",
        );
        let mut bp = Blueprint::unnamed();
        bp.add_source("/usr/local", "usr-local.tar");
        bp.add_source("/opt", "https://example.com/opt.tar");

        let archives = revisions.archives(&rev);
        let reader: &dyn ArchiveReader = &archives;
        let mut sizes = Sizes(Vec::new());
        walk_with_archives(bp.document(), Some(reader), &mut sizes);
        assert_eq!(
            sizes.0,
            vec![("/opt".to_owned(), 0), ("/usr/local".to_owned(), 10)]
        );

        assert_eq!(
            archives.read_archive("missing.tar").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
