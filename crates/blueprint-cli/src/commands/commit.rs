use super::{colorize_revision, json_pretty, lock_store, EXIT_SUCCESS};
use blueprint_core::{default_ignore_paths, load_rules, CommitOptions, Engine, ImportProbe};
use blueprint_schema::Blueprint;
use std::io::Read;
use std::path::{Path, PathBuf};

fn read_input(input: &Path) -> Result<Blueprint, String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        return Blueprint::loads(&text, None).map_err(|e| e.to_string());
    }
    let file = std::fs::File::open(input)
        .map_err(|e| format!("failed to read {}: {e}", input.display()))?;
    Blueprint::load(std::io::BufReader::new(file), None).map_err(|e| e.to_string())
}

pub fn run(
    engine: &Engine,
    name: &str,
    input: &Path,
    sources: &Path,
    message: Option<String>,
    ignore_files: &[PathBuf],
    json: bool,
) -> Result<u8, String> {
    let document = read_input(input)?;
    let rules = if ignore_files.is_empty() {
        load_rules(&default_ignore_paths())
    } else {
        load_rules(ignore_files)
    };
    let rules = rules.map_err(|e| e.to_string())?;

    let import = ImportProbe::new(document);
    let blueprint = engine
        .create(name, &[&import], &rules)
        .map_err(|e| e.to_string())?;

    let _lock = lock_store(engine)?;
    let options = CommitOptions {
        sources_dir: Some(sources.to_path_buf()),
        message,
    };
    let id = engine
        .commit(&blueprint, &rules, &options)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "name": name,
            "revision": id,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("committed {name} {}", colorize_revision(id.short()));
    }
    Ok(EXIT_SUCCESS)
}
