//! Store-level lifecycle: commit a chain of revisions on several branches,
//! destroy one, collect garbage, and verify what is left.

use blueprint_store::{
    verify_store_integrity, GarbageCollector, ObjectStore, RefStore, Revision, RevisionStore,
    StoreLayout, BLUEPRINT_FILE, IGNORE_FILE,
};
use std::collections::BTreeMap;

fn commit_on(layout: &StoreLayout, name: &str, blueprint: &str, rules: &str) {
    let objects = ObjectStore::new(layout.clone());
    let revisions = RevisionStore::new(&objects);
    let refs = RefStore::new(layout.clone());

    let tree = BTreeMap::from([
        (BLUEPRINT_FILE.to_owned(), objects.put(blueprint.as_bytes()).unwrap()),
        (IGNORE_FILE.to_owned(), objects.put(rules.as_bytes()).unwrap()),
    ]);
    let parent = refs.read(name).unwrap();
    let id = revisions
        .put(&Revision::new(tree, parent, format!("commit {name}")))
        .unwrap();
    refs.update(name, &id).unwrap();
}

#[test]
fn branches_history_gc_and_verify() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    layout.initialize().unwrap();

    commit_on(&layout, "web", "{}", "");
    commit_on(&layout, "web", r#"{"arch": "amd64"}"#, "/tmp\n");
    commit_on(&layout, "db", r#"{"arch": "i386"}"#, "");

    let refs = RefStore::new(layout.clone());
    assert_eq!(refs.list().unwrap(), vec!["db", "web"]);

    let objects = ObjectStore::new(layout.clone());
    let revisions = RevisionStore::new(&objects);
    let history = revisions.history(&refs.resolve("web").unwrap()).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].1.parent.as_ref(), Some(&history[1].0));
    assert_eq!(
        revisions.read_file(&history[0].1, BLUEPRINT_FILE).unwrap(),
        br#"{"arch": "amd64"}"#
    );

    refs.delete("db").unwrap();
    let report = GarbageCollector::new(layout.clone()).collect(false).unwrap();
    assert_eq!(report.live_revisions, 2);
    // db's revision and its i386 document; the empty rules blob is shared.
    assert_eq!(report.removed_objects, 2);

    let integrity = verify_store_integrity(&layout).unwrap();
    assert!(integrity.is_clean(), "{:?}", integrity.failed);
    assert_eq!(integrity.heads_checked, 1);
}

#[test]
fn reopening_store_keeps_branches() {
    let dir = tempfile::tempdir().unwrap();
    {
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        commit_on(&layout, "web", "{}", "");
    }
    let layout = StoreLayout::new(dir.path());
    layout.initialize().unwrap();
    assert_eq!(RefStore::new(layout).list().unwrap(), vec!["web"]);
}
