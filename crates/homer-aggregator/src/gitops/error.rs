//! Manifest loading error types.

use std::path::PathBuf;
use thiserror::Error;

use super::resource::ResourceKind;

/// Errors that can occur while loading manifests.
#[derive(Error, Debug)]
pub enum GitOpsError {
    #[error("Manifest directory not found: {0}")]
    ManifestDirNotFound(PathBuf),

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in '{path}': {message}")]
    ParseYaml { path: PathBuf, message: String },

    #[error("Invalid API version '{version}' for {kind} in '{path}', expected one of {expected:?}")]
    InvalidApiVersion {
        path: PathBuf,
        kind: ResourceKind,
        version: String,
        expected: Vec<String>,
    },

    #[error("Duplicate resource {kind} '{namespace}/{name}'")]
    DuplicateName {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    #[error("Dashboard resource is required but not found")]
    MissingDashboard,

    #[error("Only one Dashboard resource is allowed, found '{first}' and '{second}'")]
    MultipleDashboards { first: String, second: String },
}

impl From<serde_yaml::Error> for GitOpsError {
    fn from(err: serde_yaml::Error) -> Self {
        GitOpsError::ParseYaml {
            path: PathBuf::new(),
            message: err.to_string(),
        }
    }
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, GitOpsError>;
