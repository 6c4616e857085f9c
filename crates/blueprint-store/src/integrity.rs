use crate::layout::StoreLayout;
use crate::objects::ObjectStore;
use crate::refs::RefStore;
use crate::revisions::RevisionStore;
use crate::StoreError;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub checked: usize,
    pub passed: usize,
    pub failed: Vec<IntegrityFailure>,
    pub heads_checked: usize,
    pub heads_passed: usize,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct IntegrityFailure {
    pub hash: String,
    pub reason: String,
}

/// Re-hash every object, then walk every branch's history and check that
/// each revision parses and each tree entry exists.
pub fn verify_store_integrity(layout: &StoreLayout) -> Result<IntegrityReport, StoreError> {
    let objects = ObjectStore::new(layout.clone());
    let refs = RefStore::new(layout.clone());
    let revisions = RevisionStore::new(&objects);

    let all_objects = objects.list()?;
    let heads = refs.heads()?;

    let mut report = IntegrityReport {
        checked: all_objects.len(),
        heads_checked: heads.len(),
        ..Default::default()
    };

    for hash in &all_objects {
        match objects.get(hash) {
            Ok(_) => report.passed += 1,
            Err(StoreError::IntegrityFailure { actual, .. }) => {
                report.failed.push(IntegrityFailure {
                    hash: hash.to_string(),
                    reason: format!("object hash mismatch: got {actual}"),
                });
            }
            Err(e) => {
                report.failed.push(IntegrityFailure {
                    hash: hash.to_string(),
                    reason: format!("object read error: {e}"),
                });
            }
        }
    }

    let mut seen = HashSet::new();
    for (name, head) in &heads {
        let mut ok = true;
        let mut next = Some(head.clone());
        while let Some(id) = next.take() {
            if !seen.insert(id.clone()) {
                break;
            }
            let revision = match revisions.get(&id) {
                Ok(revision) => revision,
                Err(e) => {
                    ok = false;
                    report.failed.push(IntegrityFailure {
                        hash: id.to_string(),
                        reason: format!("revision of '{name}' unreadable: {e}"),
                    });
                    break;
                }
            };
            for (filename, hash) in &revision.tree {
                if !objects.exists(hash) {
                    ok = false;
                    report.failed.push(IntegrityFailure {
                        hash: hash.to_string(),
                        reason: format!("{filename} missing from revision {}", id.short()),
                    });
                }
            }
            next = revision.parent;
        }
        if ok {
            report.heads_passed += 1;
        }
    }

    Ok(report)
}
