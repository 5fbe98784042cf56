//! Review grid and maker-checker workflow core
//!
//! A [`DataGridModel`] owns the loaded records and all view state. Records
//! change only through two paths: [`RowEditSession::commit`] for single-row
//! edits and [`BulkActionCoordinator::execute`] for review actions, both of
//! which mutate local state only after the workflow authority confirms.

pub mod bulk;
pub mod collaborators;
pub mod edit;
pub mod error;
pub mod grid;
pub mod models;
pub mod pagination;
pub mod preferences;
pub mod status;
pub mod types;
pub mod workspace;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bulk::{BulkActionCoordinator, BulkInput, BulkOutcome, BulkPlan};
pub use collaborators::{
    BulkActionRequest, ConfirmPrompt, ConfirmationReply, Confirmer, ListRequest, ListResponse, Notification,
    Notifier, PermissionService, RecordUpdateRequest, StaticPermissions, WorkflowEndpoint, WorkflowEndpointRef,
    WorkflowResponse,
};
pub use edit::{CommitOutcome, EditDraft, RowEditSession};
pub use error::{log_failure, CoreError, CoreResult, ErrorCode, ErrorSeverity, NETWORK_ERROR_MESSAGE};
pub use grid::{DataGridModel, GridRow, GridSummary, GroupRow, MountToken};
pub use models::{ColumnDescriptor, ColumnKind, FieldDiff, FixedPosition, GridFilter, Record, SortKey};
pub use pagination::{PageInfo, PageWindow, PaginationView};
pub use preferences::{GridPreferences, NoopPreferencesStore, PreferencesStore, PreferencesStoreRef, YamlPreferencesStore};
pub use status::{PlannedTransition, StatusStateMachine, StatusTransition, TransitionGuard, TransitionTarget};
pub use types::{NotifyLevel, RecordStatus, ReviewAction, SortDirection};
pub use workspace::ReviewWorkspace;
