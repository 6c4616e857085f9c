use crate::CoreError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Layered settings. Every field has a default, so a file only needs the keys
/// it overrides. Sections this tool does not read (`[s3]`, `[statsd]` in
/// files shared with other tools) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub io: IoConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Largest source archive, in bytes, a commit will store.
    pub max_content_length: u64,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            max_content_length: 64 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load `/etc/blueprint.toml` then `~/.blueprint.toml`.
    pub fn load_default() -> Result<Self, CoreError> {
        Self::load_layered(&default_config_paths())
    }

    /// Merge `paths` in order, later files overriding earlier ones key by
    /// key. Missing files are skipped.
    pub fn load_layered(paths: &[PathBuf]) -> Result<Self, CoreError> {
        let mut merged = toml::Table::new();
        for path in paths {
            if !path.exists() {
                continue;
            }
            tracing::debug!("loading config {}", path.display());
            merge_tables(&mut merged, read_table(path)?);
        }
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| CoreError::Config(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        toml::Value::Table(read_table(path)?)
            .try_into()
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }
}

fn read_table(path: &Path) -> Result<toml::Table, CoreError> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<toml::Table>()
        .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/blueprint.toml")];
    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".blueprint.toml"));
    }
    paths
}
