//! Canonical traversal of a blueprint.
//!
//! Every consumer that iterates over resources (loading, subtraction,
//! the managers index, emitters) goes through [`walk`] so that the visiting
//! order is defined in exactly one place:
//!
//! 1. files, by path;
//! 2. packages, as a manager tree rooted at `apt` and `yum` (each manager's
//!    packages, then the managers it installed, then `after_packages`), followed
//!    by any manager not reachable from the roots;
//! 3. services, by manager and name, each followed by its dependencies;
//! 4. sources, by directory.

use crate::blueprint::{Document, FileAttributes, Packages, ROOT_MANAGERS};
use std::collections::BTreeSet;
use std::fmt;
use std::io;

/// Callbacks for [`walk`]. Every method defaults to a no-op.
pub trait Visitor {
    fn file(&mut self, _pathname: &str, _attributes: &FileAttributes) {}

    /// Called once per installed version.
    fn package(&mut self, _manager: &str, _package: &str, _version: &str) {}

    /// Called after every package of `manager`, and every manager it installed,
    /// has been visited.
    fn after_packages(&mut self, _manager: &str) {}

    fn service(&mut self, _manager: &str, _service: &str) {}

    fn service_file(&mut self, _manager: &str, _service: &str, _pathnames: &[&str]) {}

    fn service_package(
        &mut self,
        _manager: &str,
        _service: &str,
        _package_manager: &str,
        _packages: &[&str],
    ) {
    }

    fn service_source(&mut self, _manager: &str, _service: &str, _dirnames: &[&str]) {}

    /// `url` is set when `filename` is a remote location; `content` is set when
    /// the walk was given an [`ArchiveReader`] and the archive is local.
    fn source(
        &mut self,
        _dirname: &str,
        _filename: &str,
        _content: Option<ArchiveContent<'_>>,
        _url: Option<&str>,
    ) {
    }
}

/// Provides the bytes of source archives referenced by a blueprint.
pub trait ArchiveReader {
    fn read_archive(&self, filename: &str) -> io::Result<Vec<u8>>;
}

/// Lazily readable archive handed to [`Visitor::source`].
#[derive(Clone, Copy)]
pub struct ArchiveContent<'a> {
    reader: &'a dyn ArchiveReader,
    filename: &'a str,
}

impl ArchiveContent<'_> {
    pub fn filename(&self) -> &str {
        self.filename
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        self.reader.read_archive(self.filename)
    }
}

impl fmt::Debug for ArchiveContent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveContent")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

pub fn walk<V: Visitor + ?Sized>(doc: &Document, visitor: &mut V) {
    walk_with_archives(doc, None, visitor);
}

pub fn walk_with_archives<V: Visitor + ?Sized>(
    doc: &Document,
    archives: Option<&dyn ArchiveReader>,
    visitor: &mut V,
) {
    walk_files(doc, visitor);
    walk_packages(doc, visitor);
    walk_services(doc, visitor);
    walk_sources(doc, archives, visitor);
}

pub fn walk_files<V: Visitor + ?Sized>(doc: &Document, visitor: &mut V) {
    for (pathname, attributes) in doc.files.iter().flatten() {
        visitor.file(pathname, attributes);
    }
}

pub fn walk_packages<V: Visitor + ?Sized>(doc: &Document, visitor: &mut V) {
    let Some(packages) = doc.packages.as_ref() else {
        return;
    };
    let mut visited = BTreeSet::new();
    for root in ROOT_MANAGERS {
        walk_manager(packages, root, &mut visited, visitor);
    }
    for manager in packages.keys() {
        walk_manager(packages, manager, &mut visited, visitor);
    }
}

fn walk_manager<'a, V: Visitor + ?Sized>(
    packages: &'a Packages,
    manager: &'a str,
    visited: &mut BTreeSet<&'a str>,
    visitor: &mut V,
) {
    let Some(managed) = packages.get(manager) else {
        return;
    };
    if !visited.insert(manager) {
        return;
    }
    for (package, versions) in managed {
        for version in versions {
            visitor.package(manager, package, version);
        }
    }
    for package in managed.keys() {
        if package != manager && packages.contains_key(package) {
            walk_manager(packages, package, visited, visitor);
        }
    }
    visitor.after_packages(manager);
}

pub fn walk_services<V: Visitor + ?Sized>(doc: &Document, visitor: &mut V) {
    for (manager, services) in doc.services.iter().flatten() {
        for (service, deps) in services {
            visitor.service(manager, service);
            if !deps.files.is_empty() {
                let pathnames: Vec<&str> = deps.files.iter().map(String::as_str).collect();
                visitor.service_file(manager, service, &pathnames);
            }
            for (package_manager, names) in &deps.packages {
                if names.is_empty() {
                    continue;
                }
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                visitor.service_package(manager, service, package_manager, &names);
            }
            if !deps.sources.is_empty() {
                let dirnames: Vec<&str> = deps.sources.iter().map(String::as_str).collect();
                visitor.service_source(manager, service, &dirnames);
            }
        }
    }
}

pub fn walk_sources<V: Visitor + ?Sized>(
    doc: &Document,
    archives: Option<&dyn ArchiveReader>,
    visitor: &mut V,
) {
    for (dirname, filename) in doc.sources.iter().flatten() {
        if filename.contains("://") {
            visitor.source(dirname, filename, None, Some(filename));
            continue;
        }
        let content = archives.map(|reader| ArchiveContent {
            reader,
            filename: filename.as_str(),
        });
        visitor.source(dirname, filename, content, None);
    }
}
