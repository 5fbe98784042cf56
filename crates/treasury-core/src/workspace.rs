//! One mounted review workspace
//!
//! Bundles a grid with its pagination, edit session and bulk coordinator,
//! and owns the load-at-mount / save-on-change preference hooks.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use treasury_config::{Config, WorkspaceConfig};

use crate::bulk::BulkActionCoordinator;
use crate::collaborators::{ListRequest, WorkflowEndpointRef};
use crate::edit::RowEditSession;
use crate::error::{CoreError, CoreResult};
use crate::grid::DataGridModel;
use crate::pagination::PaginationView;
use crate::preferences::{GridPreferences, PreferencesStoreRef};
use crate::status::StatusStateMachine;

/// A review tab: grid, pager, row editor and bulk actions for one resource
pub struct ReviewWorkspace {
    key: String,
    title: String,
    resource: String,
    default_page_size: usize,
    page_size_options: Vec<usize>,
    pub grid: RwLock<DataGridModel>,
    pub pagination: Mutex<PaginationView>,
    pub edit: RowEditSession,
    pub bulk: BulkActionCoordinator,
    endpoint: WorkflowEndpointRef,
    preferences: PreferencesStoreRef,
}

impl ReviewWorkspace {
    pub fn from_config(
        workspace: &WorkspaceConfig,
        config: &Config,
        endpoint: WorkflowEndpointRef,
        table: Arc<StatusStateMachine>,
        preferences: PreferencesStoreRef,
    ) -> CoreResult<Self> {
        let grid = DataGridModel::from_config(workspace)?;
        let page_size = config.page_size_for(workspace);
        Ok(Self {
            key: workspace.key.clone(),
            title: workspace.title.clone(),
            resource: workspace.resource.clone(),
            default_page_size: page_size,
            page_size_options: config.pagination.page_size_options.clone(),
            grid: RwLock::new(grid),
            pagination: Mutex::new(PaginationView::new(page_size)),
            edit: RowEditSession::new(workspace.resource.clone(), endpoint.clone()),
            bulk: BulkActionCoordinator::new(workspace.resource.clone(), endpoint.clone(), table),
            endpoint,
            preferences,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.page_size_options
    }

    /// Mount the view: apply saved preferences, then load rows
    pub async fn mount(&self) -> CoreResult<usize> {
        let saved = match self.preferences.load(&self.key).await {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!(target: "treasury::grid", "Could not load preferences for '{}': {}", self.key, e);
                None
            }
        };
        {
            let mut grid = self.grid.write().await;
            grid.remount();
            let mut pagination = self.pagination.lock().await;
            match &saved {
                Some(preferences) => {
                    grid.apply_preferences(preferences);
                    *pagination = PaginationView::new(preferences.page_size.unwrap_or(self.default_page_size));
                }
                None => *pagination = PaginationView::new(self.default_page_size),
            }
            pagination.sync(&grid);
        }
        self.refresh().await
    }

    /// Tear the view down; late responses are discarded
    pub async fn unmount(&self) {
        self.grid.write().await.unmount();
        self.edit.reset();
        log::debug!(target: "treasury::grid", "Unmounted '{}'", self.key);
    }

    /// Refetch rows from the authority and replace them wholesale
    pub async fn refresh(&self) -> CoreResult<usize> {
        let token = self.grid.read().await.mount_token();
        let response = self
            .endpoint
            .list(&ListRequest { resource: self.resource.clone() })
            .await?;
        if !response.success {
            return Err(CoreError::ServerRejection {
                message: response
                    .error
                    .unwrap_or_else(|| format!("Could not load {}", self.title.to_lowercase())),
            });
        }

        let mut grid = self.grid.write().await;
        if !grid.is_current(token) {
            return Err(CoreError::StaleView);
        }
        let count = response.rows.len();
        grid.replace_rows(response.rows);
        log::info!(target: "treasury::grid", "Loaded {} record(s) into '{}'", count, self.key);
        Ok(count)
    }

    /// Current layout plus page size
    pub async fn preferences(&self) -> GridPreferences {
        let grid = self.grid.read().await;
        let pagination = self.pagination.lock().await;
        GridPreferences {
            page_size: Some(pagination.page_size()),
            ..grid.preferences()
        }
    }

    /// Persist the current layout
    pub async fn save_preferences(&self) -> CoreResult<()> {
        let preferences = self.preferences().await;
        self.preferences.save(&self.key, &preferences).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ListResponse;
    use crate::models::{Record, SortKey};
    use crate::preferences::YamlPreferencesStore;
    use crate::testing::RecordingEndpoint;
    use crate::types::RecordStatus;
    use serde_json::json;
    use tempfile::tempdir;

    fn config() -> Config {
        Config::from_yaml(Config::generate_default()).unwrap()
    }

    fn rows() -> Vec<Record> {
        vec![
            Record::new("S1", RecordStatus::PendingApproval).with_field("amount", json!(10)),
            Record::new("S2", RecordStatus::New).with_field("amount", json!(20)),
        ]
    }

    fn workspace(endpoint: Arc<RecordingEndpoint>, store: PreferencesStoreRef) -> ReviewWorkspace {
        let config = config();
        let definition = config.workspace("bank-statements").cloned().unwrap();
        ReviewWorkspace::from_config(&definition, &config, endpoint, Arc::new(StatusStateMachine::standard()), store)
            .unwrap()
    }

    #[tokio::test]
    async fn test_mount_loads_rows() {
        let dir = tempdir().unwrap();
        let endpoint = Arc::new(RecordingEndpoint::with_rows(rows()));
        let store = Arc::new(YamlPreferencesStore::new(dir.path().join("prefs.yaml")));
        let workspace = workspace(endpoint.clone(), store);

        assert_eq!(workspace.mount().await.unwrap(), 2);
        assert_eq!(endpoint.list_count(), 1);
        assert!(workspace.grid.read().await.is_loaded("S2"));
    }

    #[tokio::test]
    async fn test_list_failure_keeps_rows() {
        let dir = tempdir().unwrap();
        let endpoint = Arc::new(RecordingEndpoint::with_rows(rows()));
        let store = Arc::new(YamlPreferencesStore::new(dir.path().join("prefs.yaml")));
        let workspace = workspace(endpoint.clone(), store);
        workspace.mount().await.unwrap();

        endpoint.push_list_response(Ok(ListResponse {
            success: false,
            rows: Vec::new(),
            error: Some("maintenance window".to_string()),
        }));
        let err = workspace.refresh().await.unwrap_err();
        assert_eq!(err.user_message(), "maintenance window");
        assert_eq!(workspace.grid.read().await.records().len(), 2);
    }

    #[tokio::test]
    async fn test_preferences_survive_remount() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.yaml");
        let endpoint = Arc::new(RecordingEndpoint::with_rows(rows()));

        let first = workspace(endpoint.clone(), Arc::new(YamlPreferencesStore::new(&path)));
        first.mount().await.unwrap();
        {
            let mut grid = first.grid.write().await;
            grid.set_sorting(vec![SortKey::desc("amount")]);
            grid.set_column_visibility("bank", false);
            let mut pagination = first.pagination.lock().await;
            pagination.set_page_size(&grid, 50);
        }
        first.save_preferences().await.unwrap();

        let second = workspace(endpoint, Arc::new(YamlPreferencesStore::new(&path)));
        second.mount().await.unwrap();
        let grid = second.grid.read().await;
        assert_eq!(grid.sorting(), &[SortKey::desc("amount")]);
        assert!(grid.get_visible_columns().iter().all(|c| c.id != "bank"));
        assert_eq!(grid.records()[0].id, "S2");
        assert_eq!(second.pagination.lock().await.page_size(), 50);
    }

    #[tokio::test]
    async fn test_refresh_after_unmount_is_stale() {
        let dir = tempdir().unwrap();
        let endpoint = Arc::new(RecordingEndpoint::with_rows(rows()));
        let store = Arc::new(YamlPreferencesStore::new(dir.path().join("prefs.yaml")));
        let workspace = workspace(endpoint, store);
        workspace.mount().await.unwrap();
        workspace.unmount().await;
        assert!(matches!(workspace.refresh().await, Err(CoreError::StaleView)));
    }
}
