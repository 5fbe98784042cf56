//! Configured review workspaces and their mount state

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use treasury_config::Config;
use treasury_core::{CoreResult, PreferencesStoreRef, ReviewWorkspace, StatusStateMachine, WorkflowEndpointRef};

/// All review tabs, in configuration order
pub struct WorkspaceRegistry {
    order: Vec<String>,
    workspaces: BTreeMap<String, Arc<ReviewWorkspace>>,
    mounted: Mutex<BTreeSet<String>>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            workspaces: BTreeMap::new(),
            mounted: Mutex::new(BTreeSet::new()),
        }
    }

    /// Build one workspace per configured tab
    pub fn from_config(
        config: &Config,
        endpoint: WorkflowEndpointRef,
        table: Arc<StatusStateMachine>,
        preferences: PreferencesStoreRef,
    ) -> CoreResult<Self> {
        let mut registry = Self::new();
        for definition in &config.workspaces {
            let workspace = ReviewWorkspace::from_config(
                definition,
                config,
                endpoint.clone(),
                table.clone(),
                preferences.clone(),
            )?;
            registry.insert(workspace);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, workspace: ReviewWorkspace) {
        let key = workspace.key().to_string();
        if !self.workspaces.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.workspaces.insert(key, Arc::new(workspace));
    }

    pub fn get(&self, key: &str) -> Option<Arc<ReviewWorkspace>> {
        self.workspaces.get(key).cloned()
    }

    /// Workspaces in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ReviewWorkspace>> {
        self.order.iter().filter_map(|key| self.workspaces.get(key))
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    pub async fn is_mounted(&self, key: &str) -> bool {
        self.mounted.lock().await.contains(key)
    }

    /// Mount on first visit
    ///
    /// The workspace counts as mounted even when the initial load fails, so
    /// the user sees the error and can refresh instead of triggering a new
    /// mount on every request.
    pub async fn ensure_mounted(&self, workspace: &ReviewWorkspace) -> CoreResult<bool> {
        let mut mounted = self.mounted.lock().await;
        if mounted.contains(workspace.key()) {
            return Ok(false);
        }
        mounted.insert(workspace.key().to_string());
        workspace.mount().await?;
        Ok(true)
    }

    /// Tear a workspace down; the next visit mounts it again
    pub async fn unmount(&self, workspace: &ReviewWorkspace) -> bool {
        let removed = self.mounted.lock().await.remove(workspace.key());
        if removed {
            workspace.unmount().await;
        }
        removed
    }
}

impl Default for WorkspaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
