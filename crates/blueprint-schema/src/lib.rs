//! Blueprint data model, canonical traversal, subtraction, and ignore rules.
//!
//! This crate defines the schema layer: the typed `Blueprint` snapshot of a
//! machine's files, packages, services, and source archives, the single
//! `Visitor`-driven walk every other layer iterates with, set-based
//! subtraction (`Blueprint::subtract`), byte-stable JSON serialization, and
//! `blueprintignore` rule parsing.

pub mod blueprint;
pub mod name;
pub mod normalize;
pub mod rules;
pub mod subtract;
pub mod types;
pub mod walk;

pub use blueprint::{
    Blueprint, Document, FileAttributes, Files, ManagedPackages, ManagerIndex, Packages,
    ServiceDeps, Services, Sources, Versions,
};
pub use name::{validate_name, BlueprintName};
pub use rules::{Rule, RuleKind, Rules};
pub use types::{ObjectHash, RevisionId};
pub use walk::{walk, walk_with_archives, ArchiveContent, ArchiveReader, Visitor};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid blueprint name: {0:?}")]
    InvalidName(String),
    #[error("failed to parse blueprint: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read blueprint: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid ignore rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },
}
