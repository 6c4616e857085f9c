use crate::blueprint::{Blueprint, Document, FileAttributes};
use crate::name::BlueprintName;
use crate::walk::{walk, ArchiveContent, Visitor};
use crate::SchemaError;
use std::collections::BTreeMap;
use std::io::Read;

impl Blueprint {
    /// Remove empty sections and unset keys so that equal content always
    /// serializes to equal bytes. Idempotent.
    pub fn normalize(&mut self) {
        let doc = &mut self.doc;
        if let Some(packages) = doc.packages.as_mut() {
            for managed in packages.values_mut() {
                managed.retain(|_, versions| !versions.is_empty());
            }
            packages.retain(|_, managed| !managed.is_empty());
        }
        if let Some(services) = doc.services.as_mut() {
            services.retain(|_, managed| !managed.is_empty());
        }
        drop_if_empty(&mut doc.files);
        drop_if_empty(&mut doc.packages);
        drop_if_empty(&mut doc.services);
        drop_if_empty(&mut doc.sources);
    }

    /// Normalize and serialize to pretty JSON with sorted keys.
    pub fn dumps(&mut self) -> Result<String, SchemaError> {
        self.normalize();
        Ok(serde_json::to_string_pretty(&self.doc)?)
    }

    pub fn loads(input: &str, name: Option<&str>) -> Result<Self, SchemaError> {
        let raw: Document = serde_json::from_str(input)?;
        Self::from_document(name, &raw)
    }

    pub fn load(reader: impl Read, name: Option<&str>) -> Result<Self, SchemaError> {
        let raw: Document = serde_json::from_reader(reader)?;
        Self::from_document(name, &raw)
    }

    /// Rebuild a blueprint from a raw document by walking it with the same
    /// mutators the probes use.
    pub fn from_document(name: Option<&str>, raw: &Document) -> Result<Self, SchemaError> {
        let mut bp = Blueprint {
            name: name.map(BlueprintName::new).transpose()?,
            ..Blueprint::default()
        };
        bp.doc.arch.clone_from(&raw.arch);
        let mut loader = Loader {
            target: &mut bp,
            raw,
        };
        walk(raw, &mut loader);
        Ok(bp)
    }
}

fn drop_if_empty<K, V>(section: &mut Option<BTreeMap<K, V>>) {
    if section.as_ref().is_some_and(BTreeMap::is_empty) {
        *section = None;
    }
}

struct Loader<'a> {
    target: &'a mut Blueprint,
    raw: &'a Document,
}

impl Visitor for Loader<'_> {
    fn file(&mut self, pathname: &str, attributes: &FileAttributes) {
        self.target.add_file(pathname, attributes.clone());
    }

    fn package(&mut self, manager: &str, package: &str, version: &str) {
        self.target.add_package(manager, package, version);
    }

    fn service(&mut self, manager: &str, service: &str) {
        self.target.add_service(manager, service);
        let deps = self
            .raw
            .services
            .as_ref()
            .and_then(|services| services.get(manager))
            .and_then(|managed| managed.get(service));
        if let Some(deps) = deps {
            self.target
                .set_service_state(manager, service, deps.enable, deps.ensure_running);
        }
    }

    fn service_file(&mut self, manager: &str, service: &str, pathnames: &[&str]) {
        self.target
            .add_service_file(manager, service, pathnames.iter().copied());
    }

    fn service_package(
        &mut self,
        manager: &str,
        service: &str,
        package_manager: &str,
        packages: &[&str],
    ) {
        self.target.add_service_package(
            manager,
            service,
            package_manager,
            packages.iter().copied(),
        );
    }

    fn service_source(&mut self, manager: &str, service: &str, dirnames: &[&str]) {
        self.target
            .add_service_source(manager, service, dirnames.iter().copied());
    }

    fn source(
        &mut self,
        dirname: &str,
        filename: &str,
        _content: Option<ArchiveContent<'_>>,
        url: Option<&str>,
    ) {
        self.target.add_source(dirname, url.unwrap_or(filename));
    }
}
