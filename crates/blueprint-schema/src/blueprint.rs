use crate::name::BlueprintName;
use crate::types::RevisionId;
use crate::walk::{walk_packages, Visitor};
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Opaque per-file metadata (mode, owner, group, content, encoding, ...).
pub type FileAttributes = serde_json::Map<String, serde_json::Value>;
pub type Files = BTreeMap<String, FileAttributes>;
pub type Versions = BTreeSet<String>;
/// Packages installed by a single manager, keyed by package name.
pub type ManagedPackages = BTreeMap<String, Versions>;
pub type Packages = BTreeMap<String, ManagedPackages>;
pub type Services = BTreeMap<String, BTreeMap<String, ServiceDeps>>;
/// Source archives keyed by extraction directory.
pub type Sources = BTreeMap<String, String>;

static EMPTY_FILES: Files = BTreeMap::new();
static EMPTY_PACKAGES: Packages = BTreeMap::new();
static EMPTY_SERVICES: Services = BTreeMap::new();
static EMPTY_SOURCES: Sources = BTreeMap::new();

/// Package managers that are installed by the operating system itself.
pub const ROOT_MANAGERS: [&str; 2] = ["apt", "yum"];

/// Dependency record of a single service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDeps {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_true")]
    pub ensure_running: bool,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub files: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub packages: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sources: BTreeSet<String>,
}

impl Default for ServiceDeps {
    fn default() -> Self {
        Self {
            enable: true,
            ensure_running: true,
            files: BTreeSet::new(),
            packages: BTreeMap::new(),
            sources: BTreeSet::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// The persisted shape of a blueprint. Every section is optional; an absent
/// section is omitted from the serialized document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Files>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Packages>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Services>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Sources>,
}

/// A snapshot of a machine's installed state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blueprint {
    pub(crate) name: Option<BlueprintName>,
    pub(crate) revision: Option<RevisionId>,
    pub(crate) doc: Document,
}

impl Blueprint {
    /// Create an empty, named blueprint ready to be populated by probes.
    pub fn new(name: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            name: Some(BlueprintName::new(name)?),
            ..Self::default()
        })
    }

    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&BlueprintName> {
        self.name.as_ref()
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), SchemaError> {
        self.name = Some(BlueprintName::new(name)?);
        Ok(())
    }

    /// Revision this blueprint was checked out from, if any.
    pub fn revision(&self) -> Option<&RevisionId> {
        self.revision.as_ref()
    }

    #[must_use]
    pub fn with_revision(mut self, revision: RevisionId) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn arch(&self) -> Option<&str> {
        self.doc.arch.as_deref()
    }

    pub fn set_arch(&mut self, arch: impl Into<String>) {
        self.doc.arch = Some(arch.into());
    }

    pub fn files(&self) -> &Files {
        self.doc.files.as_ref().unwrap_or(&EMPTY_FILES)
    }

    pub fn packages(&self) -> &Packages {
        self.doc.packages.as_ref().unwrap_or(&EMPTY_PACKAGES)
    }

    pub fn services(&self) -> &Services {
        self.doc.services.as_ref().unwrap_or(&EMPTY_SERVICES)
    }

    pub fn sources(&self) -> &Sources {
        self.doc.sources.as_ref().unwrap_or(&EMPTY_SOURCES)
    }

    pub(crate) fn packages_mut(&mut self) -> &mut Packages {
        self.doc.packages.get_or_insert_with(BTreeMap::new)
    }

    fn service_mut(&mut self, manager: &str, service: &str) -> &mut ServiceDeps {
        self.doc
            .services
            .get_or_insert_with(BTreeMap::new)
            .entry(manager.to_owned())
            .or_default()
            .entry(service.to_owned())
            .or_default()
    }

    /// True when no section holds any resource. `arch` is not a resource.
    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
            && self.packages().values().all(BTreeMap::is_empty)
            && self.services().values().all(BTreeMap::is_empty)
            && self.sources().is_empty()
    }

    pub fn add_file(&mut self, pathname: impl Into<String>, attributes: FileAttributes) {
        self.doc
            .files
            .get_or_insert_with(BTreeMap::new)
            .insert(pathname.into(), attributes);
    }

    pub fn add_package(&mut self, manager: &str, package: &str, version: impl Into<String>) {
        self.packages_mut()
            .entry(manager.to_owned())
            .or_default()
            .entry(package.to_owned())
            .or_default()
            .insert(version.into());
    }

    /// Declare a service. Existing services keep their flags and dependencies.
    pub fn add_service(&mut self, manager: &str, service: &str) {
        self.service_mut(manager, service);
    }

    pub fn set_service_state(
        &mut self,
        manager: &str,
        service: &str,
        enable: bool,
        ensure_running: bool,
    ) {
        let deps = self.service_mut(manager, service);
        deps.enable = enable;
        deps.ensure_running = ensure_running;
    }

    pub fn add_service_file<I, S>(&mut self, manager: &str, service: &str, pathnames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pathnames: Vec<String> = pathnames.into_iter().map(Into::into).collect();
        if pathnames.is_empty() {
            return;
        }
        self.service_mut(manager, service).files.extend(pathnames);
    }

    pub fn add_service_package<I, S>(
        &mut self,
        manager: &str,
        service: &str,
        package_manager: &str,
        packages: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages: Vec<String> = packages.into_iter().map(Into::into).collect();
        if packages.is_empty() {
            return;
        }
        self.service_mut(manager, service)
            .packages
            .entry(package_manager.to_owned())
            .or_default()
            .extend(packages);
    }

    pub fn add_service_source<I, S>(&mut self, manager: &str, service: &str, dirnames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dirnames: Vec<String> = dirnames.into_iter().map(Into::into).collect();
        if dirnames.is_empty() {
            return;
        }
        self.service_mut(manager, service).sources.extend(dirnames);
    }

    pub fn add_source(&mut self, dirname: impl Into<String>, filename: impl Into<String>) {
        self.doc
            .sources
            .get_or_insert_with(BTreeMap::new)
            .insert(dirname.into(), filename.into());
    }

    /// Build the package-to-manager index for this blueprint.
    pub fn managers(&self) -> ManagerIndex {
        ManagerIndex::build(&self.doc)
    }

    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        crate::walk::walk(&self.doc, visitor);
    }
}

/// Maps each package that is itself a package manager to the manager that
/// installed it. `apt` and `yum` are always present and have no manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerIndex {
    managers: BTreeMap<String, Option<String>>,
}

impl ManagerIndex {
    pub fn build(doc: &Document) -> Self {
        struct Collect<'a> {
            packages: &'a Packages,
            managers: BTreeMap<String, Option<String>>,
        }

        impl Visitor for Collect<'_> {
            fn package(&mut self, manager: &str, package: &str, _version: &str) {
                if manager != package && self.packages.contains_key(package) {
                    self.managers
                        .insert(package.to_owned(), Some(manager.to_owned()));
                }
            }
        }

        let mut managers: BTreeMap<String, Option<String>> = ROOT_MANAGERS
            .iter()
            .map(|m| ((*m).to_owned(), None))
            .collect();
        if let Some(packages) = doc.packages.as_ref() {
            let mut collect = Collect {
                packages,
                managers: BTreeMap::new(),
            };
            walk_packages(doc, &mut collect);
            managers.extend(collect.managers);
        }
        Self { managers }
    }

    /// Manager that installed `package`, when `package` is itself a manager.
    pub fn manager_of(&self, package: &str) -> Option<&str> {
        self.managers.get(package).and_then(|m| m.as_deref())
    }

    pub fn contains(&self, package: &str) -> bool {
        self.managers.contains_key(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.managers
            .iter()
            .map(|(package, manager)| (package.as_str(), manager.as_deref()))
    }
}
