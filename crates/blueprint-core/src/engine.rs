use crate::concurrency::StoreLock;
use crate::config::Config;
use crate::probe::Probe;
use crate::CoreError;
use blueprint_schema::{
    walk_with_archives, ArchiveContent, ArchiveReader, Blueprint, RevisionId, Rules, Visitor,
};
use blueprint_store::{
    validate_archive_name, validate_ref_name, verify_store_integrity, GarbageCollector, GcReport, IntegrityReport,
    ObjectStore, RefStore, Revision, RevisionStore, StoreError, StoreLayout, BLUEPRINT_FILE,
    IGNORE_FILE,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Central API for creating, storing, and comparing blueprints.
///
/// Read operations work on any store, initialized or not. `commit` and `diff`
/// initialize the store on first use. Callers serialize mutations with a
/// [`StoreLock`] on [`StoreLayout::lock_file`].
pub struct Engine {
    layout: StoreLayout,
    objects: ObjectStore,
    refs: RefStore,
    config: Config,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Directory holding the tarballs named in the blueprint's `sources`.
    /// When unset, tarballs are taken from the revision the blueprint was
    /// checked out from.
    pub sources_dir: Option<PathBuf>,
    pub message: Option<String>,
}

/// Where local source tarballs come from during a commit.
enum ArchiveOrigin<'a> {
    Directory(&'a Path),
    Revision(&'a RevisionId),
    Nowhere,
}

impl Engine {
    pub fn new(store_root: impl Into<PathBuf>, config: Config) -> Self {
        let layout = StoreLayout::new(store_root);
        let objects = ObjectStore::new(layout.clone());
        let refs = RefStore::new(layout.clone());
        Self {
            layout,
            objects,
            refs,
            config,
        }
    }

    pub fn store_layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn revisions(&self) -> RevisionStore<'_> {
        RevisionStore::new(&self.objects)
    }

    fn check_version(&self) -> Result<(), CoreError> {
        if self.layout.is_initialized() {
            self.layout.verify_version()?;
        }
        Ok(())
    }

    /// Build a new blueprint by running each probe in order.
    pub fn create(
        &self,
        name: &str,
        probes: &[&dyn Probe],
        rules: &Rules,
    ) -> Result<Blueprint, CoreError> {
        let mut blueprint = Blueprint::new(name)?;
        for probe in probes {
            debug!("running probe {}", probe.name());
            probe
                .probe(&mut blueprint, rules)
                .map_err(|source| CoreError::Probe {
                    probe: probe.name().to_owned(),
                    source,
                })?;
        }
        info!("created blueprint {name}");
        Ok(blueprint)
    }

    /// Store `blueprint` as the new head of the branch named after it.
    pub fn commit(
        &self,
        blueprint: &Blueprint,
        rules: &Rules,
        options: &CommitOptions,
    ) -> Result<RevisionId, CoreError> {
        let name = blueprint
            .name()
            .ok_or_else(|| StoreError::InvalidName("unnamed blueprint".to_owned()))?;
        let origin = match (&options.sources_dir, blueprint.revision()) {
            (Some(dir), _) => ArchiveOrigin::Directory(dir),
            (None, Some(revision)) => ArchiveOrigin::Revision(revision),
            (None, None) => ArchiveOrigin::Nowhere,
        };
        let message = options
            .message
            .clone()
            .unwrap_or_else(|| format!("commit {name}"));
        self.commit_tree(name, blueprint, rules, &origin, &message)
    }

    fn commit_tree(
        &self,
        name: &str,
        blueprint: &Blueprint,
        rules: &Rules,
        origin: &ArchiveOrigin<'_>,
        message: &str,
    ) -> Result<RevisionId, CoreError> {
        validate_ref_name(name)?;
        let archives = local_archives(blueprint);
        for filename in &archives {
            validate_archive_name(filename)?;
        }
        self.layout.initialize()?;
        let revisions = self.revisions();

        let mut document = blueprint.clone();
        let mut tree = BTreeMap::new();
        tree.insert(
            BLUEPRINT_FILE.to_owned(),
            self.objects.put(document.dumps()?.as_bytes())?,
        );
        tree.insert(
            IGNORE_FILE.to_owned(),
            self.objects.put(rules.to_string().as_bytes())?,
        );

        let origin_revision = match origin {
            ArchiveOrigin::Revision(id) => Some(revisions.get(id)?),
            _ => None,
        };
        for filename in archives {
            let hash = match origin {
                ArchiveOrigin::Directory(dir) => {
                    let path = dir.join(&filename);
                    if !path.is_file() {
                        return Err(source_not_found(&filename).into());
                    }
                    self.objects
                        .put_file(&path, self.config.io.max_content_length)?
                }
                ArchiveOrigin::Revision(_) => origin_revision
                    .as_ref()
                    .and_then(|revision| revision.entry(&filename))
                    .cloned()
                    .ok_or_else(|| source_not_found(&filename))?,
                ArchiveOrigin::Nowhere => return Err(source_not_found(&filename).into()),
            };
            debug!("source {filename} -> {}", hash.short());
            tree.insert(filename, hash);
        }

        let parent = self.refs.read(name)?;
        let id = revisions.put(&Revision::new(tree, parent, message))?;
        self.refs.update(name, &id)?;
        info!("committed {name} at {}", id.short());
        Ok(id)
    }

    /// Load a blueprint from the head of `name`, or from `revision` (a full
    /// or abbreviated id) when given.
    pub fn checkout(&self, name: &str, revision: Option<&str>) -> Result<Blueprint, CoreError> {
        self.check_version()?;
        let revisions = self.revisions();
        let id = match revision {
            Some(prefix) => revisions.resolve_prefix(prefix)?,
            None => self.refs.resolve(name)?,
        };
        let stored = revisions.get(&id)?;
        let data = revisions.read_file(&stored, BLUEPRINT_FILE)?;
        let blueprint = Blueprint::load(data.as_slice(), Some(name))?;
        debug!("checked out {name} at {}", id.short());
        Ok(blueprint.with_revision(id))
    }

    pub fn destroy(&self, name: &str) -> Result<(), CoreError> {
        self.check_version()?;
        self.refs.delete(name)?;
        info!("destroyed blueprint {name}");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<String>, CoreError> {
        self.check_version()?;
        Ok(self.refs.list()?)
    }

    /// History of `name`, newest first.
    pub fn log(&self, name: &str) -> Result<Vec<(RevisionId, Revision)>, CoreError> {
        self.check_version()?;
        let head = self.refs.resolve(name)?;
        Ok(self.revisions().history(&head)?)
    }

    /// Ignore rules stored with a revision. Revisions committed without any
    /// rules yield an empty set.
    pub fn blueprintignore(&self, name: &str, revision: Option<&str>) -> Result<Rules, CoreError> {
        self.check_version()?;
        let revisions = self.revisions();
        let id = match revision {
            Some(prefix) => revisions.resolve_prefix(prefix)?,
            None => self.refs.resolve(name)?,
        };
        let stored = revisions.get(&id)?;
        let Some(hash) = stored.ignore_entry() else {
            return Ok(Rules::default());
        };
        let data = self.objects.get(hash)?;
        Ok(Rules::parse(&String::from_utf8_lossy(&data))?)
    }

    /// `minuend - subtrahend`, without storing the result.
    pub fn subtract(&self, minuend: &str, subtrahend: &str) -> Result<Blueprint, CoreError> {
        let a = self.checkout(minuend, None)?;
        let b = self.checkout(subtrahend, None)?;
        Ok(a.subtract(&b))
    }

    /// Commit `minuend - subtrahend` as the branch `target`. Source tarballs
    /// and ignore rules carry over from the minuend.
    pub fn diff(
        &self,
        minuend: &str,
        subtrahend: &str,
        target: &str,
    ) -> Result<Blueprint, CoreError> {
        let a = self.checkout(minuend, None)?;
        let b = self.checkout(subtrahend, None)?;
        let mut result = a.subtract(&b);
        result.set_name(target)?;

        let rules = self.blueprintignore(minuend, None)?;
        let origin = match a.revision() {
            Some(id) => ArchiveOrigin::Revision(id),
            None => ArchiveOrigin::Nowhere,
        };
        let message = format!("{minuend} - {subtrahend}");
        let id = self.commit_tree(target, &result, &rules, &origin, &message)?;
        Ok(result.with_revision(id))
    }

    /// Walk a checked-out blueprint, handing source visitors the tarballs
    /// stored with its revision.
    pub fn walk_with_sources<V: Visitor + ?Sized>(
        &self,
        blueprint: &Blueprint,
        visitor: &mut V,
    ) -> Result<(), CoreError> {
        let Some(id) = blueprint.revision() else {
            blueprint.walk(visitor);
            return Ok(());
        };
        let revisions = self.revisions();
        let stored = revisions.get(id)?;
        let archives = revisions.archives(&stored);
        let reader: &dyn ArchiveReader = &archives;
        walk_with_archives(blueprint.document(), Some(reader), visitor);
        Ok(())
    }

    pub fn gc(&self, _lock: &StoreLock, dry_run: bool) -> Result<GcReport, CoreError> {
        info!("running garbage collection (dry_run={dry_run})");
        self.check_version()?;
        Ok(GarbageCollector::new(self.layout.clone()).collect(dry_run)?)
    }

    pub fn verify_store(&self) -> Result<IntegrityReport, CoreError> {
        self.check_version()?;
        Ok(verify_store_integrity(&self.layout)?)
    }
}

fn source_not_found(filename: &str) -> StoreError {
    StoreError::NotFound(format!("source archive {filename}"))
}

/// File names of the sources that are tarballs rather than URLs.
fn local_archives(blueprint: &Blueprint) -> Vec<String> {
    #[derive(Default)]
    struct Local(Vec<String>);

    impl Visitor for Local {
        fn source(
            &mut self,
            _dirname: &str,
            filename: &str,
            _content: Option<ArchiveContent<'_>>,
            url: Option<&str>,
        ) {
            if url.is_none() {
                self.0.push(filename.to_owned());
            }
        }
    }

    let mut local = Local::default();
    blueprint.walk(&mut local);
    local.0
}
