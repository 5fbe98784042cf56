//! Configuration management for the treasury review console
//!
//! This module handles loading, validation, and management of
//! console configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

pub use error::ConfigError;

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

/// Remote workflow authority settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Base URL every workspace resource path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:9090/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Records per page for review grids
    #[serde(default = "default_records_per_page")]
    pub records_per_page: usize,
    /// Page sizes offered in the page size selector
    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<usize>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            records_per_page: default_records_per_page(),
            page_size_options: default_page_size_options(),
        }
    }
}

fn default_records_per_page() -> usize {
    25
}

fn default_page_size_options() -> Vec<usize> {
    vec![10, 25, 50, 100]
}

/// Grid layout persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Save column layout, sorting and page size between runs
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// YAML file holding the saved layouts
    #[serde(default = "default_preferences_path")]
    pub path: PathBuf,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_preferences_path(),
        }
    }
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from("./grid-preferences.yaml")
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Per-tab visibility flags handed to the static permission service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionsConfig {
    /// Tab key -> visible. Tabs missing from the map are visible.
    #[serde(default)]
    pub tabs: BTreeMap<String, bool>,
}

/// One row of the status transition table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionRuleConfig {
    /// Action name: approve, reject, request_delete
    pub action: String,
    /// States the action applies to; empty means every state
    #[serde(default)]
    pub from: Vec<String>,
    /// States the guard refuses even when listed in (or implied by) `from`
    #[serde(default)]
    pub except: Vec<String>,
    /// Target state, or REMOVED for transitions that drop the record
    pub to: String,
    /// Whether the confirmation must carry a free-text reason
    #[serde(default)]
    pub requires_reason: bool,
}

/// Workflow rule overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowConfig {
    /// Replaces the built-in transition table when present
    #[serde(default)]
    pub transitions: Option<Vec<TransitionRuleConfig>>,
}

/// Column kinds understood by the grid
pub const COLUMN_KINDS: &[&str] = &[
    "select", "expand", "text", "enum", "date", "currency", "status", "action",
];

/// Column definition for a review workspace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnConfig {
    /// Column identifier
    pub id: String,
    /// Header label
    #[serde(default)]
    pub header: String,
    /// Record field the value is read from (defaults to the column id)
    #[serde(default)]
    pub field: Option<String>,
    /// Column kind, see [`COLUMN_KINDS`]
    #[serde(default = "default_column_kind")]
    pub kind: String,
    /// Allowed values for enum columns
    #[serde(default)]
    pub options: Vec<String>,
    /// ISO currency code for currency columns
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default = "default_true")]
    pub draggable: bool,
    #[serde(default = "default_true")]
    pub hideable: bool,
    #[serde(default)]
    pub editable: bool,
    /// Locks the column at the "start" or "end" of the grid
    #[serde(default)]
    pub fixed: Option<String>,
}

fn default_column_kind() -> String {
    "text".to_string()
}

impl ColumnConfig {
    /// Field the column reads from
    pub fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.id)
    }
}

/// One review tab (bank statements, users, sweep plans, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceConfig {
    /// Tab key, also used in URLs and permission lookups
    pub key: String,
    /// Display title
    pub title: String,
    /// Resource path segment on the workflow authority
    pub resource: String,
    /// Page size override for this tab
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Initial grouping columns
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Column definitions in their initial order
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Workflow authority settings
    #[serde(default)]
    pub authority: AuthorityConfig,
    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Layout persistence settings
    #[serde(default)]
    pub preferences: PreferencesConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Tab visibility
    #[serde(default)]
    pub permissions: PermissionsConfig,
    /// Transition table overrides
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Review tabs
    #[serde(default)]
    pub workspaces: Vec<WorkspaceConfig>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::from_yaml(&content)
    }

    /// Load configuration without blocking the runtime
    pub async fn load_async(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                    path: path.display().to_string(),
                },
                _ => ConfigError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                },
            })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML content
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::InvalidYaml { message: e.to_string() })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if self.authority.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "authority.base_url".to_string(),
            });
        }

        validate_page_size("pagination.records_per_page", self.pagination.records_per_page)?;

        let mut keys = HashSet::new();
        for workspace in &self.workspaces {
            if !keys.insert(workspace.key.as_str()) {
                return Err(ConfigError::ValidationError {
                    message: format!("Duplicate workspace key '{}'", workspace.key),
                });
            }
            workspace.validate()?;
        }

        if let Some(rules) = &self.workflow.transitions {
            if rules.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "workflow.transitions".to_string(),
                    reason: "Transition table must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Look up a workspace by key
    pub fn workspace(&self, key: &str) -> Option<&WorkspaceConfig> {
        self.workspaces.iter().find(|w| w.key == key)
    }

    /// Effective page size for a workspace
    pub fn page_size_for(&self, workspace: &WorkspaceConfig) -> usize {
        workspace.page_size.unwrap_or(self.pagination.records_per_page)
    }
}

impl WorkspaceConfig {
    /// Validate the columns and grouping of a single tab
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = format!("workspaces.{}", self.key);

        if self.resource.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: format!("{}.resource", prefix),
            });
        }

        if let Some(size) = self.page_size {
            validate_page_size(&format!("{}.page_size", prefix), size)?;
        }

        let mut ids = HashSet::new();
        for column in &self.columns {
            if !ids.insert(column.id.as_str()) {
                return Err(ConfigError::ValidationError {
                    message: format!("Duplicate column '{}' in workspace '{}'", column.id, self.key),
                });
            }
            if !COLUMN_KINDS.contains(&column.kind.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.columns.{}.kind", prefix, column.id),
                    reason: format!("Unknown column kind '{}'", column.kind),
                });
            }
            if let Some(fixed) = &column.fixed {
                if fixed != "start" && fixed != "end" {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{}.columns.{}.fixed", prefix, column.id),
                        reason: "Fixed position must be 'start' or 'end'".to_string(),
                    });
                }
            }
            if column.kind == "enum" && column.options.is_empty() {
                return Err(ConfigError::MissingField {
                    field: format!("{}.columns.{}.options", prefix, column.id),
                });
            }
        }

        for group in &self.group_by {
            if !ids.contains(group.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.group_by", prefix),
                    reason: format!("Unknown grouping column '{}'", group),
                });
            }
        }

        Ok(())
    }
}

fn validate_page_size(field: &str, size: usize) -> Result<(), ConfigError> {
    if size == 0 || size > 1000 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "Page size must be between 1 and 1000".to_string(),
        });
    }
    Ok(())
}
