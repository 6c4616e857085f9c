//! Core orchestration for blueprints.
//!
//! This crate ties the schema and store layers together into the `Engine`:
//! the API for creating blueprints from probes, committing them with their
//! source archives and ignore rules, checking them out again, diffing two
//! branches into a third, and maintaining the store. It also provides
//! layered TOML configuration, `blueprintignore` loading, and store locking.

pub mod concurrency;
pub mod config;
pub mod engine;
pub mod ignore;
pub mod probe;

pub use concurrency::StoreLock;
pub use config::{Config, IoConfig};
pub use engine::{CommitOptions, Engine};
pub use ignore::{default_ignore_paths, load_rules};
pub use probe::{ImportProbe, Probe, ProbeError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("blueprint error: {0}")]
    Schema(#[from] blueprint_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] blueprint_store::StoreError),
    #[error("config error: {0}")]
    Config(String),
    #[error("probe '{probe}' failed: {source}")]
    Probe {
        probe: String,
        #[source]
        source: ProbeError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
