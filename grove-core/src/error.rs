//! Error types for loading genealogies and configuration.
//!
//! Only loading can fail. Growth, meshing and picking clamp their inputs
//! and have no error paths of their own.

use thiserror::Error;

/// A violation of the genealogy's tree invariants, found at load time.
///
/// Every variant names the identifiers involved so the caller can show a
/// useful diagnostic and keep the previously loaded tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("person '{id}' is defined more than once")]
    DuplicateId { id: String },

    #[error("root person '{root}' not found in people list")]
    MissingRoot { root: String },

    #[error("child '{child}' referenced by '{parent}' not found")]
    DanglingChild { parent: String, child: String },

    #[error("person '{child}' is a child of both '{first_parent}' and '{second_parent}'")]
    DuplicateParent {
        child: String,
        first_parent: String,
        second_parent: String,
    },

    #[error("root person '{root}' is listed as a child of '{parent}'")]
    RootHasParent { root: String, parent: String },

    #[error("cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("not descended from root '{root}': {}", .ids.join(", "))]
    Unreachable { root: String, ids: Vec<String> },
}

/// Failure to turn raw text into a loaded genealogy.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to parse family document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to parse family YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid family structure: {0}")]
    Structure(#[from] StructuralError),
}

/// Failure to parse a configuration override document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
