use crate::CoreError;
use blueprint_schema::Rules;
use std::path::PathBuf;

pub fn default_ignore_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/blueprintignore")];
    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".blueprintignore"));
    }
    paths
}

/// Built-in rules followed by each existing file in `paths`, so that rules
/// from later files win.
pub fn load_rules(paths: &[PathBuf]) -> Result<Rules, CoreError> {
    let mut rules = Rules::defaults();
    for path in paths {
        if !path.exists() {
            continue;
        }
        let content = std::fs::read_to_string(path)?;
        let parsed = Rules::parse(&content)?;
        tracing::debug!("{} rules from {}", parsed.len(), path.display());
        rules = rules.merge(parsed);
    }
    Ok(rules)
}
