use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::gitops::GitOpsError;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Manifest error: {0}")]
    GitOps(#[from] GitOpsError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to render dashboard: {0}")]
    Render(#[from] serde_yaml::Error),
}

/// Every problem found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration lock poisoned")]
    LockPoisoned,

    #[error("Failed to read state file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write state file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse state file '{path}': {message}")]
    ParseYaml { path: PathBuf, message: String },

    #[error("Failed to serialize state: {0}")]
    SerializeYaml(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
