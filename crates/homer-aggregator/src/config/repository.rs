//! Loading and persisting the configuration tree between runs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;

use super::schema::Configuration;

/// Accessors for the previously persisted tree.
pub trait TreeRepository: Send + Sync {
    /// Returns the last persisted tree, or `None` if nothing was stored yet.
    fn load(&self) -> Result<Option<Configuration>, StoreError>;

    /// Stores `config` as the new tree.
    fn persist(&self, config: &Configuration) -> Result<(), StoreError>;
}

/// Writes `content` next to `path` and renames it into place.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let mut file = std::fs::File::create(&tmp_path).map_err(write_err)?;
    file.write_all(content).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }
    Ok(())
}

/// Tree stored as YAML in a single state file.
pub struct YamlFileRepository {
    path: PathBuf,
}

impl YamlFileRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TreeRepository for YamlFileRepository {
    fn load(&self) -> Result<Option<Configuration>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| StoreError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;

        let config = serde_yaml::from_str(&content).map_err(|e| StoreError::ParseYaml {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        log::debug!("Loaded previous tree from {}", self.path.display());
        Ok(Some(config))
    }

    fn persist(&self, config: &Configuration) -> Result<(), StoreError> {
        let yaml =
            serde_yaml::to_string(config).map_err(|e| StoreError::SerializeYaml(e.to_string()))?;
        write_atomic(&self.path, yaml.as_bytes())?;
        log::debug!("Persisted tree to {}", self.path.display());
        Ok(())
    }
}

/// In-memory repository, mostly for tests.
#[derive(Default)]
pub struct MemoryRepository {
    tree: Mutex<Option<Configuration>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(config: Configuration) -> Self {
        Self {
            tree: Mutex::new(Some(config)),
        }
    }
}

impl TreeRepository for MemoryRepository {
    fn load(&self) -> Result<Option<Configuration>, StoreError> {
        Ok(self.tree.lock()?.clone())
    }

    fn persist(&self, config: &Configuration) -> Result<(), StoreError> {
        *self.tree.lock()? = Some(config.clone());
        Ok(())
    }
}
