//! Set-based subtraction of one blueprint from another.
//!
//! `a.subtract(&b)` keeps only what `a` has that `b` does not already
//! provide. Packages take three passes over `b`: the first removes matching
//! versions of ordinary packages, the second repeatedly removes package
//! managers left managing nothing, and the third puts back runtime packages
//! (`ruby*-dev` and friends) that a surviving language-level manager needs
//! but that the first two passes could not know about.

use crate::blueprint::{Blueprint, ManagerIndex, Packages, ROOT_MANAGERS};
use crate::walk::{walk_packages, Visitor};
use regex::Regex;
use std::ops::Sub;
use std::sync::LazyLock;

/// Managers whose presence implies runtime packages from the system manager.
/// `{0}` is replaced by the first capture group.
static IMPLIED_RUNTIMES: LazyLock<Vec<(Regex, &'static [&'static str])>> = LazyLock::new(|| {
    [
        (
            r"^python(\d+(?:\.\d+)?)$",
            &["python{0}", "python{0}-dev", "python", "python-devel"][..],
        ),
        (r"^ruby(\d+\.\d+(?:\.\d+)?)$", &["ruby{0}-dev"][..]),
        (
            r"^rubygems(\d+\.\d+(?:\.\d+)?)$",
            &["ruby{0}", "ruby{0}-dev", "ruby", "ruby-devel"][..],
        ),
    ]
    .into_iter()
    .map(|(pattern, packages)| (Regex::new(pattern).expect("valid runtime pattern"), packages))
    .collect()
});

/// Runtime packages implied by a manager name, e.g. `rubygems1.8` implies
/// `ruby1.8`, `ruby1.8-dev`, `ruby` and `ruby-devel`.
pub fn implied_runtime_packages(manager: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (re, packages) in IMPLIED_RUNTIMES.iter() {
        let Some(captures) = re.captures(manager) else {
            continue;
        };
        let version = captures.get(1).map_or("", |m| m.as_str());
        out.extend(packages.iter().map(|p| p.replace("{0}", version)));
    }
    out
}

impl Blueprint {
    /// Return a new blueprint holding what `self` has that `other` does not.
    /// Neither operand is modified.
    pub fn subtract(&self, other: &Blueprint) -> Blueprint {
        let mut result = self.clone();
        result.revision = None;

        if let Some(files) = result.doc.files.as_mut() {
            files.retain(|pathname, attributes| other.files().get(pathname) != Some(&*attributes));
        }

        if let Some(packages) = result.doc.packages.as_mut() {
            walk_packages(
                other.document(),
                &mut DiscardVersions {
                    packages: &mut *packages,
                },
            );
            let managers = self.managers();
            prune_empty_managers(packages, &managers, other);
            walk_packages(
                other.document(),
                &mut ReinjectRuntimes {
                    packages: &mut *packages,
                    managers: &managers,
                    original: self.packages(),
                },
            );
            packages.retain(|_, managed| !managed.is_empty());
        }

        if let Some(services) = result.doc.services.as_mut() {
            for (manager, managed) in services.iter_mut() {
                let theirs = other.services().get(manager);
                managed.retain(|service, deps| {
                    theirs.and_then(|t| t.get(service)) != Some(&*deps)
                });
            }
            services.retain(|_, managed| !managed.is_empty());
        }

        if let Some(sources) = result.doc.sources.as_mut() {
            sources.retain(|dirname, filename| other.sources().get(dirname) != Some(&*filename));
        }

        result
    }
}

impl Sub for &Blueprint {
    type Output = Blueprint;

    fn sub(self, other: &Blueprint) -> Blueprint {
        self.subtract(other)
    }
}

/// Pass 1: drop each version `other` also has, except for packages that are
/// themselves managers in the result. A manager that lists a package of its
/// own name (`pip` managing `pip`) is left untouched.
struct DiscardVersions<'a> {
    packages: &'a mut Packages,
}

impl Visitor for DiscardVersions<'_> {
    fn package(&mut self, manager: &str, package: &str, version: &str) {
        if self.packages.contains_key(package) {
            return;
        }
        let Some(managed) = self.packages.get_mut(manager) else {
            return;
        };
        if managed.contains_key(manager) {
            return;
        }
        let Some(versions) = managed.get_mut(package) else {
            return;
        };
        versions.remove(version);
        if versions.is_empty() {
            managed.remove(package);
        }
    }
}

/// Pass 2: repeat until stable. Each round removes managers that manage
/// nothing along with their own package entry, which may in turn leave their
/// installing manager empty. Empty managers that `other` never lists as a
/// package survive this pass so that pass 3 can still see them.
fn prune_empty_managers(packages: &mut Packages, managers: &ManagerIndex, other: &Blueprint) {
    loop {
        let mut pass = RemoveEmptyManagers {
            packages: &mut *packages,
            managers,
            removed: 0,
        };
        walk_packages(other.document(), &mut pass);
        if pass.removed == 0 {
            break;
        }
    }
}

struct RemoveEmptyManagers<'a> {
    packages: &'a mut Packages,
    managers: &'a ManagerIndex,
    removed: usize,
}

impl Visitor for RemoveEmptyManagers<'_> {
    fn package(&mut self, _manager: &str, package: &str, _version: &str) {
        if !self.packages.get(package).is_some_and(|m| m.is_empty()) {
            return;
        }
        self.packages.remove(package);
        if let Some(installer) = self.managers.manager_of(package) {
            if let Some(managed) = self.packages.get_mut(installer) {
                managed.remove(package);
            }
        }
        self.removed += 1;
    }
}

/// Pass 3: for every manager still in use, copy its implied runtime
/// packages back from the original `apt`/`yum` sections. A manager is in use
/// while it manages something or while its own package is still installed.
struct ReinjectRuntimes<'a> {
    packages: &'a mut Packages,
    managers: &'a ManagerIndex,
    original: &'a Packages,
}

impl ReinjectRuntimes<'_> {
    fn in_use(&self, manager: &str) -> bool {
        let Some(managed) = self.packages.get(manager) else {
            return false;
        };
        if !managed.is_empty() {
            return true;
        }
        self.managers
            .manager_of(manager)
            .and_then(|installer| self.packages.get(installer))
            .is_some_and(|installed| installed.contains_key(manager))
    }
}

impl Visitor for ReinjectRuntimes<'_> {
    fn after_packages(&mut self, manager: &str) {
        if !self.in_use(manager) {
            return;
        }
        for package in implied_runtime_packages(manager) {
            for system in ROOT_MANAGERS {
                let Some(versions) = self.original.get(system).and_then(|m| m.get(&package))
                else {
                    continue;
                };
                self.packages
                    .entry(system.to_owned())
                    .or_default()
                    .insert(package.clone(), versions.clone());
            }
        }
    }
}
