//! Saved grid layouts
//!
//! Preferences are a plain value owned by whoever hosts the grid; the store
//! is only consulted on mount and written after layout changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::models::SortKey;

/// User-adjustable grid layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridPreferences {
    #[serde(default)]
    pub column_order: Vec<String>,
    #[serde(default)]
    pub hidden_columns: Vec<String>,
    #[serde(default)]
    pub sorting: Vec<SortKey>,
    #[serde(default)]
    pub grouping: Vec<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// Persistence for grid layouts, keyed by workspace
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn load(&self, workspace: &str) -> CoreResult<Option<GridPreferences>>;
    async fn save(&self, workspace: &str, preferences: &GridPreferences) -> CoreResult<()>;
}

/// Shared store reference
pub type PreferencesStoreRef = Arc<dyn PreferencesStore>;

/// All workspaces' layouts in one YAML document
pub struct YamlPreferencesStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl YamlPreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: std::io::Error) -> CoreError {
        CoreError::Preferences {
            message: format!("{}: {}", self.path.display(), e),
        }
    }

    async fn read_all(&self) -> CoreResult<BTreeMap<String, GridPreferences>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| self.io_error(e))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_yaml::from_str(&content).map_err(|e| CoreError::Preferences {
            message: format!("{}: {}", self.path.display(), e),
        })
    }
}

#[async_trait]
impl PreferencesStore for YamlPreferencesStore {
    async fn load(&self, workspace: &str) -> CoreResult<Option<GridPreferences>> {
        let mut all = self.read_all().await?;
        Ok(all.remove(workspace))
    }

    async fn save(&self, workspace: &str, preferences: &GridPreferences) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(workspace.to_string(), preferences.clone());
        let content = serde_yaml::to_string(&all).map_err(|e| CoreError::Preferences {
            message: e.to_string(),
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }
        tokio::fs::write(&self.path, content).await.map_err(|e| self.io_error(e))?;
        log::debug!(target: "treasury::grid", "Saved preferences for '{}' to {}", workspace, self.path.display());
        Ok(())
    }
}

/// Store that remembers nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPreferencesStore;

#[async_trait]
impl PreferencesStore for NoopPreferencesStore {
    async fn load(&self, _workspace: &str) -> CoreResult<Option<GridPreferences>> {
        Ok(None)
    }

    async fn save(&self, _workspace: &str, _preferences: &GridPreferences) -> CoreResult<()> {
        Ok(())
    }
}
