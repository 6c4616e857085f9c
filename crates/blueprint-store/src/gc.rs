use crate::layout::StoreLayout;
use crate::objects::ObjectStore;
use crate::refs::RefStore;
use crate::revisions::RevisionStore;
use crate::StoreError;
use blueprint_schema::ObjectHash;
use std::collections::HashSet;

/// Removes objects that no branch head can reach, such as the revisions
/// left behind by `destroy`.
pub struct GarbageCollector {
    layout: StoreLayout,
}

#[derive(Debug, Default)]
pub struct GcReport {
    pub live_revisions: usize,
    pub orphaned_objects: Vec<ObjectHash>,
    pub removed_objects: usize,
}

impl GarbageCollector {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn collect(&self, dry_run: bool) -> Result<GcReport, StoreError> {
        let objects = ObjectStore::new(self.layout.clone());
        let refs = RefStore::new(self.layout.clone());
        let revisions = RevisionStore::new(&objects);

        let mut report = GcReport::default();
        let mut live: HashSet<String> = HashSet::new();

        for (_, head) in refs.heads()? {
            for (id, revision) in revisions.history(&head)? {
                if !live.insert(id.into_inner()) {
                    // Shared ancestry already marked through another branch.
                    break;
                }
                report.live_revisions += 1;
                live.extend(revision.tree.into_values().map(ObjectHash::into_inner));
            }
        }

        for hash in objects.list()? {
            if !live.contains(hash.as_str()) {
                report.orphaned_objects.push(hash);
            }
        }

        if !dry_run {
            for hash in &report.orphaned_objects {
                objects.remove(hash)?;
                report.removed_objects += 1;
            }
        }

        tracing::info!(
            "gc: {} live revisions, {} orphaned objects, {} removed",
            report.live_revisions,
            report.orphaned_objects.len(),
            report.removed_objects
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revisions::{Revision, BLUEPRINT_FILE};
    use std::collections::BTreeMap;

    fn setup() -> (tempfile::TempDir, StoreLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        (dir, layout)
    }

    fn commit(
        layout: &StoreLayout,
        name: &str,
        content: &str,
        parent: Option<blueprint_schema::RevisionId>,
    ) -> blueprint_schema::RevisionId {
        let objects = ObjectStore::new(layout.clone());
        let revisions = RevisionStore::new(&objects);
        let blob = objects.put(content.as_bytes()).unwrap();
        let tree = BTreeMap::from([(BLUEPRINT_FILE.to_owned(), blob)]);
        let id = revisions.put(&Revision::new(tree, parent, name)).unwrap();
        RefStore::new(layout.clone()).update(name, &id).unwrap();
        id
    }

    #[test]
    fn empty_store_collects_nothing() {
        let (_dir, layout) = setup();
        let report = GarbageCollector::new(layout).collect(false).unwrap();
        assert_eq!(report.live_revisions, 0);
        assert!(report.orphaned_objects.is_empty());
    }

    #[test]
    fn reachable_history_is_kept() {
        let (_dir, layout) = setup();
        let first = commit(&layout, "web", "{\"arch\": \"i386\"}", None);
        commit(&layout, "web", "{\"arch\": \"amd64\"}", Some(first));

        let report = GarbageCollector::new(layout.clone()).collect(false).unwrap();
        assert_eq!(report.live_revisions, 2);
        assert!(report.orphaned_objects.is_empty());
        assert_eq!(ObjectStore::new(layout).list().unwrap().len(), 4);
    }

    #[test]
    fn destroyed_branch_objects_are_removed() {
        let (_dir, layout) = setup();
        commit(&layout, "keep", "{}", None);
        commit(&layout, "drop", "{\"arch\": \"amd64\"}", None);
        RefStore::new(layout.clone()).delete("drop").unwrap();

        let dry = GarbageCollector::new(layout.clone()).collect(true).unwrap();
        assert_eq!(dry.orphaned_objects.len(), 2);
        assert_eq!(dry.removed_objects, 0);
        assert_eq!(ObjectStore::new(layout.clone()).list().unwrap().len(), 4);

        let report = GarbageCollector::new(layout.clone()).collect(false).unwrap();
        assert_eq!(report.removed_objects, 2);
        assert_eq!(ObjectStore::new(layout).list().unwrap().len(), 2);
    }

    #[test]
    fn shared_content_survives() {
        let (_dir, layout) = setup();
        commit(&layout, "a", "{}", None);
        commit(&layout, "b", "{}", None);
        RefStore::new(layout.clone()).delete("b").unwrap();

        let report = GarbageCollector::new(layout.clone()).collect(false).unwrap();
        // Only b's revision record goes; the blob is still referenced by a.
        assert_eq!(report.removed_objects, 1);
    }
}
