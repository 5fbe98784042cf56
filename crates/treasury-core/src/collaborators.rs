//! Injected collaborators: workflow authority, confirmation, notifications, permissions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::models::{FieldDiff, Record};
use crate::types::{NotifyLevel, ReviewAction};

// ==================== Workflow authority ====================

/// Request for the rows of one review workspace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRequest {
    pub resource: String,
}

/// Rows returned by the authority
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub rows: Vec<Record>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Payload of a bulk review action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkActionRequest {
    pub resource: String,
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Payload of a single-record edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdateRequest {
    pub resource: String,
    pub id: String,
    pub fields: FieldDiff,
    pub reason: String,
}

/// Success flag plus an optional server message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkflowResponse {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}

/// The external authority for workflow transitions and record updates
///
/// `Err` means the call did not complete (transport failure); a completed
/// call that the authority refused comes back as `success == false`.
#[async_trait]
pub trait WorkflowEndpoint: Send + Sync {
    /// Fetch the records of a workspace
    async fn list(&self, request: &ListRequest) -> CoreResult<ListResponse>;

    /// Apply a review action to a set of records
    async fn bulk_action(&self, action: ReviewAction, request: &BulkActionRequest) -> CoreResult<WorkflowResponse>;

    /// Update fields of one record
    async fn update_record(&self, request: &RecordUpdateRequest) -> CoreResult<WorkflowResponse>;
}

/// Shared endpoint reference
pub type WorkflowEndpointRef = Arc<dyn WorkflowEndpoint>;

// ==================== Confirmation ====================

/// Confirmation dialog content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
    /// Whether the dialog collects free text
    pub input: bool,
    /// Whether the free text must be non-empty
    pub input_required: bool,
    pub input_label: Option<String>,
    pub input_placeholder: Option<String>,
}

/// The user's answer to a [`ConfirmPrompt`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationReply {
    pub confirmed: bool,
    #[serde(default)]
    pub input_value: Option<String>,
}

impl ConfirmationReply {
    pub fn accepted(input: Option<String>) -> Self {
        Self { confirmed: true, input_value: input }
    }

    pub fn declined() -> Self {
        Self::default()
    }

    /// Trimmed input, None when blank
    pub fn input(&self) -> Option<&str> {
        self.input_value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Modal confirmation collaborator
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> ConfirmationReply;
}

// ==================== Notifications ====================

/// A message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub level: NotifyLevel,
}

/// Notification collaborator
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, level: NotifyLevel);
}

// ==================== Permissions ====================

/// Decides which review tabs the current user may see
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Tab key -> visible
    async fn tab_visibility(&self) -> CoreResult<BTreeMap<String, bool>>;
}

/// Permissions fixed at startup
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    tabs: BTreeMap<String, bool>,
}

impl StaticPermissions {
    pub fn new(tabs: BTreeMap<String, bool>) -> Self {
        Self { tabs }
    }

    /// Tabs missing from the map are visible
    pub fn is_visible(&self, tab: &str) -> bool {
        self.tabs.get(tab).copied().unwrap_or(true)
    }
}

#[async_trait]
impl PermissionService for StaticPermissions {
    async fn tab_visibility(&self) -> CoreResult<BTreeMap<String, bool>> {
        Ok(self.tabs.clone())
    }
}
