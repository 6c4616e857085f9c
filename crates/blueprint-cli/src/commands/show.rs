use super::{json_pretty, EXIT_SUCCESS};
use blueprint_core::Engine;
use blueprint_schema::{ArchiveContent, FileAttributes, Visitor};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Serialize)]
struct Summary {
    files: usize,
    packages: BTreeMap<String, usize>,
    services: usize,
    sources: usize,
    source_bytes: u64,
}

impl Visitor for Summary {
    fn file(&mut self, _pathname: &str, _attributes: &FileAttributes) {
        self.files += 1;
    }

    fn package(&mut self, manager: &str, _package: &str, _version: &str) {
        *self.packages.entry(manager.to_owned()).or_default() += 1;
    }

    fn service(&mut self, _manager: &str, _service: &str) {
        self.services += 1;
    }

    fn source(
        &mut self,
        _dirname: &str,
        _filename: &str,
        content: Option<ArchiveContent<'_>>,
        _url: Option<&str>,
    ) {
        self.sources += 1;
        if let Some(Ok(data)) = content.map(|c| c.read()) {
            self.source_bytes += data.len() as u64;
        }
    }
}

pub fn run(
    engine: &Engine,
    name: &str,
    revision: Option<&str>,
    summary: bool,
    json: bool,
) -> Result<u8, String> {
    let mut blueprint = engine
        .checkout(name, revision)
        .map_err(|e| e.to_string())?;

    if !summary {
        println!("{}", blueprint.dumps().map_err(|e| e.to_string())?);
        return Ok(EXIT_SUCCESS);
    }

    let mut counts = Summary::default();
    engine
        .walk_with_sources(&blueprint, &mut counts)
        .map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&counts)?);
    } else {
        println!("files:    {}", counts.files);
        for (manager, n) in &counts.packages {
            println!("packages: {n} ({manager})");
        }
        println!("services: {}", counts.services);
        println!(
            "sources:  {} ({} bytes stored)",
            counts.sources, counts.source_bytes
        );
    }
    Ok(EXIT_SUCCESS)
}
