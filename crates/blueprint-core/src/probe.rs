//! The seam between the engine and whatever inspects a live system.
//!
//! A probe fills in one slice of a blueprint (one package manager, the
//! service managers, changed files, ...) and must consult the ignore rules it
//! is given. [`ImportProbe`] is the one probe shipped here: it copies an
//! existing blueprint document through the rules, which is how `commit`
//! brings a JSON file into the store.

use blueprint_schema::{walk, ArchiveContent, Blueprint, FileAttributes, Rules, Visitor};

pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

pub trait Probe {
    fn name(&self) -> &str;

    fn probe(&self, blueprint: &mut Blueprint, rules: &Rules) -> Result<(), ProbeError>;
}

/// Copies every resource of `source` that `rules` does not ignore.
pub struct ImportProbe {
    source: Blueprint,
}

impl ImportProbe {
    pub fn new(source: Blueprint) -> Self {
        Self { source }
    }
}

impl Probe for ImportProbe {
    fn name(&self) -> &str {
        "import"
    }

    fn probe(&self, blueprint: &mut Blueprint, rules: &Rules) -> Result<(), ProbeError> {
        if let Some(arch) = self.source.arch() {
            blueprint.set_arch(arch);
        }
        let mut filter = Filter {
            source: &self.source,
            target: blueprint,
            rules,
            skipped: 0,
        };
        walk(self.source.document(), &mut filter);
        if filter.skipped > 0 {
            tracing::debug!("import skipped {} ignored resources", filter.skipped);
        }
        Ok(())
    }
}

struct Filter<'a> {
    source: &'a Blueprint,
    target: &'a mut Blueprint,
    rules: &'a Rules,
    skipped: usize,
}

impl Filter<'_> {
    fn keep(&mut self, ignored: bool) -> bool {
        if ignored {
            self.skipped += 1;
        }
        !ignored
    }

    fn service_kept(&self, manager: &str, service: &str) -> bool {
        !self.rules.ignore_service(manager, service)
    }
}

impl Visitor for Filter<'_> {
    fn file(&mut self, pathname: &str, attributes: &FileAttributes) {
        if self.keep(self.rules.ignore_file(pathname)) {
            self.target.add_file(pathname, attributes.clone());
        }
    }

    fn package(&mut self, manager: &str, package: &str, version: &str) {
        if self.keep(self.rules.ignore_package(manager, package)) {
            self.target.add_package(manager, package, version);
        }
    }

    fn service(&mut self, manager: &str, service: &str) {
        if !self.keep(self.rules.ignore_service(manager, service)) {
            return;
        }
        match self.source.services().get(manager).and_then(|m| m.get(service)) {
            Some(deps) => {
                self.target
                    .set_service_state(manager, service, deps.enable, deps.ensure_running);
            }
            None => self.target.add_service(manager, service),
        }
    }

    fn service_file(&mut self, manager: &str, service: &str, pathnames: &[&str]) {
        if self.service_kept(manager, service) {
            let kept = pathnames.iter().filter(|p| !self.rules.ignore_file(p));
            self.target.add_service_file(manager, service, kept.copied());
        }
    }

    fn service_package(
        &mut self,
        manager: &str,
        service: &str,
        package_manager: &str,
        packages: &[&str],
    ) {
        if self.service_kept(manager, service) {
            let kept = packages
                .iter()
                .filter(|p| !self.rules.ignore_package(package_manager, p));
            self.target
                .add_service_package(manager, service, package_manager, kept.copied());
        }
    }

    fn service_source(&mut self, manager: &str, service: &str, dirnames: &[&str]) {
        if self.service_kept(manager, service) {
            let kept = dirnames.iter().filter(|d| !self.rules.ignore_source(d));
            self.target.add_service_source(manager, service, kept.copied());
        }
    }

    fn source(
        &mut self,
        dirname: &str,
        filename: &str,
        _content: Option<ArchiveContent<'_>>,
        _url: Option<&str>,
    ) {
        if self.keep(self.rules.ignore_source(dirname)) {
            self.target.add_source(dirname, filename);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> Blueprint {
        let mut bp = Blueprint::unnamed();
        bp.set_arch("amd64");
        bp.add_file("/etc/hostname", json!({"content": "web1\n"}).as_object().cloned().unwrap());
        bp.add_file("/etc/nginx/nginx.conf", json!({"content": "x"}).as_object().cloned().unwrap());
        bp.add_package("apt", "nginx", "1.18");
        bp.add_package("apt", "linux-image-5.10", "5.10.0");
        bp.set_service_state("sysvinit", "nginx", true, false);
        bp.add_service_file("sysvinit", "nginx", ["/etc/nginx/nginx.conf", "/etc/hostname"]);
        bp.add_service_package("sysvinit", "nginx", "apt", ["nginx", "linux-image-5.10"]);
        bp.add_service("sysvinit", "ssh");
        bp.add_source("/usr/local", "usr-local.tar");
        bp.add_source("/opt/cache", "opt-cache.tar");
        bp
    }

    #[test]
    fn import_without_rules_copies_everything() {
        let mut target = Blueprint::new("web").unwrap();
        ImportProbe::new(source())
            .probe(&mut target, &Rules::default())
            .unwrap();
        let mut expected = source();
        assert_eq!(target.dumps().unwrap(), expected.dumps().unwrap());
        assert!(!target.services()["sysvinit"]["nginx"].ensure_running);
    }

    #[test]
    fn import_applies_rules_everywhere() {
        let rules = Rules::parse(
            "/etc/hostname\n:package:apt/linux-image-*\n:service:sysvinit/ssh\n:source:/opt/cache\n",
        )
        .unwrap();
        let mut target = Blueprint::new("web").unwrap();
        ImportProbe::new(source()).probe(&mut target, &rules).unwrap();

        assert!(!target.files().contains_key("/etc/hostname"));
        assert!(target.files().contains_key("/etc/nginx/nginx.conf"));
        assert!(!target.packages()["apt"].contains_key("linux-image-5.10"));
        assert!(!target.services()["sysvinit"].contains_key("ssh"));
        assert!(!target.sources().contains_key("/opt/cache"));

        let nginx = &target.services()["sysvinit"]["nginx"];
        assert!(nginx.files.contains("/etc/nginx/nginx.conf"));
        assert!(!nginx.files.contains("/etc/hostname"));
        assert!(!nginx.packages["apt"].contains("linux-image-5.10"));
        assert_eq!(target.arch(), Some("amd64"));
    }
}
