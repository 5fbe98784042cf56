//! Single-row inline editing
//!
//! At most one draft exists per grid. Drafts never touch the live record;
//! a commit sends only the changed fields and merges them after the
//! authority accepts the update.

use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::RwLock;

use crate::collaborators::{ConfirmPrompt, Confirmer, Notifier, RecordUpdateRequest, WorkflowEndpointRef};
use crate::error::{log_failure, CoreError, CoreResult};
use crate::grid::DataGridModel;
use crate::models::{value_as_decimal, FieldDiff, Record};
use crate::types::NotifyLevel;

/// Baseline snapshot of one record plus staged overrides
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    baseline: Record,
    staged: FieldDiff,
    editable: BTreeSet<String>,
}

impl EditDraft {
    fn new(baseline: Record, editable: BTreeSet<String>) -> Self {
        Self {
            baseline,
            staged: FieldDiff::new(),
            editable,
        }
    }

    pub fn id(&self) -> &str {
        &self.baseline.id
    }

    pub fn baseline(&self) -> &Record {
        &self.baseline
    }

    /// Draft value of a field: staged if set, baseline otherwise
    pub fn value(&self, field: &str) -> Value {
        self.staged
            .get(field)
            .cloned()
            .unwrap_or_else(|| self.baseline.value(field))
    }

    /// Fields whose staged value differs from the baseline
    pub fn diff(&self) -> FieldDiff {
        self.staged
            .iter()
            .filter(|(name, value)| !values_equal(&self.baseline.value(name), value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Value comparison; numbers compare numerically so 100 equals 100.0
///
/// Integers compare exactly, other numbers as decimals. Floating point is
/// only used for values outside the decimal range.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    let (Value::Number(x), Value::Number(y)) = (a, b) else {
        return a == b;
    };
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x == y;
    }
    match (value_as_decimal(a), value_as_decimal(b)) {
        (Some(x), Some(y)) => x == y,
        _ => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
    }
}

/// Interpret form text the way the baseline value is typed
pub fn coerce_input(baseline: &Value, text: &str) -> Value {
    let trimmed = text.trim();
    match baseline {
        Value::Number(_) => {
            if let Ok(n) = trimmed.parse::<i64>() {
                Value::from(n)
            } else if let Some(n) = trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Value::Number(n)
            } else {
                Value::String(text.to_string())
            }
        }
        Value::Bool(_) => match trimmed.to_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Value::Bool(true),
            "false" | "off" | "no" | "0" | "" => Value::Bool(false),
            _ => Value::String(text.to_string()),
        },
        Value::Null if trimmed.is_empty() => Value::Null,
        _ => Value::String(text.to_string()),
    }
}

#[derive(Debug, Clone)]
enum EditState {
    Idle,
    Editing(EditDraft),
    // Draft kept so a declined confirmation can resume editing.
    Committing(EditDraft),
}

/// Result of a commit attempt that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Nothing changed; edit mode exited without a request
    NoChanges,
    /// The user declined the confirmation; still editing
    Declined,
    /// The authority accepted the diff and it was merged
    Committed { id: String, fields: FieldDiff },
}

/// Tracks the grid's single in-progress row edit
pub struct RowEditSession {
    resource: String,
    endpoint: WorkflowEndpointRef,
    state: Mutex<EditState>,
}

impl RowEditSession {
    pub fn new(resource: impl Into<String>, endpoint: WorkflowEndpointRef) -> Self {
        Self {
            resource: resource.into(),
            endpoint,
            state: Mutex::new(EditState::Idle),
        }
    }

    fn state(&self) -> MutexGuard<'_, EditState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Id of the record being edited or committed
    pub fn active_id(&self) -> Option<String> {
        match &*self.state() {
            EditState::Idle => None,
            EditState::Editing(draft) | EditState::Committing(draft) => Some(draft.id().to_string()),
        }
    }

    /// Copy of the current draft
    pub fn draft(&self) -> Option<EditDraft> {
        match &*self.state() {
            EditState::Editing(draft) | EditState::Committing(draft) => Some(draft.clone()),
            EditState::Idle => None,
        }
    }

    /// Begin editing a record
    ///
    /// Fails while another record is being edited or committed; the caller
    /// must commit or cancel that edit first. Restarting the active record
    /// keeps its draft.
    pub fn start(&self, grid: &DataGridModel, id: &str) -> CoreResult<()> {
        let mut state = self.state();
        match &*state {
            EditState::Editing(draft) if draft.id() == id => return Ok(()),
            EditState::Editing(draft) | EditState::Committing(draft) => {
                return Err(CoreError::EditSessionActive { id: draft.id().to_string() });
            }
            EditState::Idle => {}
        }
        let record = grid
            .record(id)
            .ok_or_else(|| CoreError::RecordNotFound { id: id.to_string() })?;
        let editable = grid
            .columns()
            .iter()
            .filter(|c| c.editable)
            .map(|c| c.accessor.clone())
            .collect();
        *state = EditState::Editing(EditDraft::new(record.clone(), editable));
        log::debug!(target: "treasury::edit", "Editing record {} in {}", id, self.resource);
        Ok(())
    }

    /// Stage a value in the draft
    pub fn set_field(&self, name: &str, value: Value) -> CoreResult<()> {
        let mut state = self.state();
        let EditState::Editing(draft) = &mut *state else {
            return Err(CoreError::NoActiveEdit);
        };
        if !draft.editable.contains(name) || !Record::is_editable_field(name) {
            return Err(CoreError::ReadOnlyField { field: name.to_string() });
        }
        draft.staged.insert(name.to_string(), value);
        Ok(())
    }

    /// Stage form text, typed after the baseline value
    pub fn set_field_text(&self, name: &str, text: &str) -> CoreResult<()> {
        let baseline = match &*self.state() {
            EditState::Editing(draft) => draft.baseline.value(name),
            _ => return Err(CoreError::NoActiveEdit),
        };
        self.set_field(name, coerce_input(&baseline, text))
    }

    /// Fields that differ from the baseline; empty is a valid answer
    pub fn compute_diff(&self) -> CoreResult<FieldDiff> {
        match &*self.state() {
            EditState::Editing(draft) | EditState::Committing(draft) => Ok(draft.diff()),
            EditState::Idle => Err(CoreError::NoActiveEdit),
        }
    }

    /// Discard the draft; no request is made. Ignored while committing.
    pub fn cancel(&self) -> bool {
        let mut state = self.state();
        match &*state {
            EditState::Editing(draft) => {
                log::debug!(target: "treasury::edit", "Discarded draft of {}", draft.id());
                *state = EditState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Drop any draft, including one awaiting a response (view teardown)
    pub fn reset(&self) {
        *self.state() = EditState::Idle;
    }

    /// Send the diff to the authority and merge it on success
    ///
    /// An empty diff exits edit mode without a request. Otherwise the user
    /// must confirm with a reason; a failed update discards the draft and
    /// leaves the record untouched.
    pub async fn commit(
        &self,
        grid: &RwLock<DataGridModel>,
        confirmer: &dyn Confirmer,
        notifier: &dyn Notifier,
    ) -> CoreResult<CommitOutcome> {
        let draft = {
            let mut state = self.state();
            let draft = match &*state {
                EditState::Editing(draft) => draft.clone(),
                EditState::Committing(draft) => {
                    return Err(CoreError::EditSessionActive { id: draft.id().to_string() })
                }
                EditState::Idle => return Err(CoreError::NoActiveEdit),
            };
            if draft.diff().is_empty() {
                *state = EditState::Idle;
                return Ok(CommitOutcome::NoChanges);
            }
            *state = EditState::Committing(draft.clone());
            draft
        };
        let id = draft.id().to_string();
        let fields = draft.diff();

        let token = grid.read().await.mount_token();

        let prompt = ConfirmPrompt {
            title: "Save changes".to_string(),
            message: format!("Save {} changed field(s) on record {}?", fields.len(), id),
            input: true,
            input_required: true,
            input_label: Some("Reason".to_string()),
            input_placeholder: Some("Why is this record being changed?".to_string()),
        };
        let reply = confirmer.confirm(&prompt).await;
        if !reply.confirmed {
            self.resume(draft);
            return Ok(CommitOutcome::Declined);
        }
        let Some(reason) = reply.input().map(str::to_string) else {
            self.resume(draft);
            let err = CoreError::ReasonRequired { action: "save changes".to_string() };
            self.report(&err, notifier);
            return Err(err);
        };

        let request = RecordUpdateRequest {
            resource: self.resource.clone(),
            id: id.clone(),
            fields: fields.clone(),
            reason,
        };
        let response = self.endpoint.update_record(&request).await;

        let mut grid = grid.write().await;
        if !grid.is_current(token) {
            self.reset();
            log::debug!(target: "treasury::edit", "Dropped update response for {}: view closed", id);
            return Err(CoreError::StaleView);
        }
        self.reset();

        let result = match response {
            Ok(response) if response.success => grid.merge_fields(&id, &fields),
            Ok(response) => Err(CoreError::ServerRejection {
                message: response
                    .error
                    .unwrap_or_else(|| format!("Update of record {} was rejected", id)),
            }),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                log::info!(target: "treasury::edit", "Updated record {} ({} field(s))", id, fields.len());
                notifier.notify(&format!("Record {} updated", id), NotifyLevel::Success);
                Ok(CommitOutcome::Committed { id, fields })
            }
            Err(err) => {
                self.report(&err, notifier);
                Err(err)
            }
        }
    }

    fn resume(&self, draft: EditDraft) {
        let mut state = self.state();
        if matches!(&*state, EditState::Committing(_)) {
            *state = EditState::Editing(draft);
        }
    }

    fn report(&self, err: &CoreError, notifier: &dyn Notifier) {
        log_failure(err, "edit commit", &self.resource);
        if let Some(level) = err.notify_level() {
            notifier.notify(&err.user_message(), level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ConfirmationReply, WorkflowResponse};
    use crate::models::{ColumnDescriptor, ColumnKind};
    use crate::testing::{CollectingNotifier, RecordingEndpoint, ScriptedConfirmer};
    use crate::types::RecordStatus;
    use serde_json::json;
    use std::sync::Arc;

    fn grid() -> RwLock<DataGridModel> {
        let mut grid = DataGridModel::new(vec![
            ColumnDescriptor::new("bank", "Bank", ColumnKind::Text),
            ColumnDescriptor::new("amount", "Amount", ColumnKind::Currency { code: None }).editable(),
            ColumnDescriptor::new("memo", "Memo", ColumnKind::Text).editable(),
        ]);
        grid.replace_rows(vec![
            Record::new("A", RecordStatus::PendingApproval)
                .with_field("bank", json!("HSBC"))
                .with_field("amount", json!(100))
                .with_field("memo", json!("payroll")),
            Record::new("B", RecordStatus::PendingApproval).with_field("amount", json!(250)),
        ]);
        RwLock::new(grid)
    }

    fn session(endpoint: &Arc<RecordingEndpoint>) -> RowEditSession {
        RowEditSession::new("payments", endpoint.clone())
    }

    #[tokio::test]
    async fn test_second_start_is_refused() {
        let grid = grid();
        let session = session(&Arc::new(RecordingEndpoint::new()));
        let model = grid.read().await;
        session.start(&model, "A").unwrap();
        let err = session.start(&model, "B").unwrap_err();
        assert!(matches!(err, CoreError::EditSessionActive { ref id } if id == "A"));
        assert_eq!(session.active_id().as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_set_field_never_touches_record() {
        let grid = grid();
        let session = session(&Arc::new(RecordingEndpoint::new()));
        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(150)).unwrap();
        assert_eq!(grid.read().await.record("A").map(|r| r.value("amount")), Some(json!(100)));
        assert_eq!(session.draft().map(|d| d.value("amount")), Some(json!(150)));
    }

    #[tokio::test]
    async fn test_read_only_fields_are_refused() {
        let grid = grid();
        let session = session(&Arc::new(RecordingEndpoint::new()));
        session.start(&*grid.read().await, "A").unwrap();
        assert!(matches!(session.set_field("bank", json!("Citi")), Err(CoreError::ReadOnlyField { .. })));
        assert!(matches!(session.set_field("status", json!("APPROVED")), Err(CoreError::ReadOnlyField { .. })));
    }

    #[tokio::test]
    async fn test_diff_compares_values() {
        let grid = grid();
        let session = session(&Arc::new(RecordingEndpoint::new()));
        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(100.0)).unwrap();
        session.set_field("memo", json!("payroll")).unwrap();
        assert!(session.compute_diff().unwrap().is_empty());

        session.set_field_text("amount", "150").unwrap();
        let diff = session.compute_diff().unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.get("amount"), Some(&json!(150)));
    }

    #[tokio::test]
    async fn test_diff_keeps_large_integer_changes() {
        let grid = grid();
        grid.write()
            .await
            .merge_fields("A", &FieldDiff::from([("amount".to_string(), json!(9_007_199_254_740_993u64))]))
            .unwrap();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let session = session(&endpoint);
        session.start(&*grid.read().await, "A").unwrap();
        session.set_field_text("amount", "9007199254740992").unwrap();

        let diff = session.compute_diff().unwrap();
        assert_eq!(diff.get("amount"), Some(&json!(9_007_199_254_740_992u64)));

        let confirmer = ScriptedConfirmer::accept_with("correct the amount");
        let notifier = CollectingNotifier::default();
        let outcome = session.commit(&grid, &confirmer, &notifier).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed { .. }));
        assert_eq!(endpoint.updates().len(), 1);
    }

    #[test]
    fn test_values_equal_by_kind() {
        assert!(values_equal(&json!(100), &json!(100.0)));
        assert!(values_equal(&json!(0.1), &json!("0.1".parse::<f64>().unwrap())));
        assert!(!values_equal(&json!(-1), &json!(u64::MAX)));
        assert!(!values_equal(&json!(1.25), &json!(1.2)));
        assert!(!values_equal(&json!("100"), &json!(100)));
    }

    #[tokio::test]
    async fn test_cancel_restores_nothing_and_sends_nothing() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let session = session(&endpoint);
        let before = grid.read().await.record("A").cloned();

        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(150)).unwrap();
        session.set_field("memo", json!("bonus")).unwrap();
        assert!(session.cancel());

        assert_eq!(grid.read().await.record("A").cloned(), before);
        assert_eq!(session.active_id(), None);
        assert_eq!(endpoint.request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_diff_commit_makes_no_request() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let session = session(&endpoint);
        let confirmer = ScriptedConfirmer::accept_with("unused");
        let notifier = CollectingNotifier::default();

        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(100)).unwrap();
        let outcome = session.commit(&grid, &confirmer, &notifier).await.unwrap();

        assert_eq!(outcome, CommitOutcome::NoChanges);
        assert_eq!(endpoint.request_count(), 0);
        assert_eq!(confirmer.prompt_count(), 0);
        assert!(notifier.notifications().is_empty());
        assert_eq!(session.active_id(), None);
    }

    #[tokio::test]
    async fn test_commit_merges_diff() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let session = session(&endpoint);
        let confirmer = ScriptedConfirmer::accept_with("typo in amount");
        let notifier = CollectingNotifier::default();

        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(150)).unwrap();
        let outcome = session.commit(&grid, &confirmer, &notifier).await.unwrap();

        assert!(matches!(outcome, CommitOutcome::Committed { ref id, .. } if id == "A"));
        let updates = endpoint.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "A");
        assert_eq!(updates[0].reason, "typo in amount");
        assert_eq!(updates[0].fields.keys().collect::<Vec<_>>(), vec!["amount"]);
        assert_eq!(grid.read().await.record("A").map(|r| r.value("amount")), Some(json!(150)));
        assert_eq!(notifier.levels(), vec![NotifyLevel::Success]);
        assert_eq!(session.active_id(), None);
    }

    #[tokio::test]
    async fn test_declined_commit_keeps_draft() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let session = session(&endpoint);
        let confirmer = ScriptedConfirmer::new(vec![ConfirmationReply::declined()]);
        let notifier = CollectingNotifier::default();

        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(150)).unwrap();
        let outcome = session.commit(&grid, &confirmer, &notifier).await.unwrap();

        assert_eq!(outcome, CommitOutcome::Declined);
        assert_eq!(endpoint.request_count(), 0);
        assert!(notifier.notifications().is_empty());
        assert_eq!(session.compute_diff().unwrap().get("amount"), Some(&json!(150)));
    }

    #[tokio::test]
    async fn test_blank_reason_is_refused() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let session = session(&endpoint);
        let confirmer = ScriptedConfirmer::accept_with("   ");
        let notifier = CollectingNotifier::default();

        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(150)).unwrap();
        let err = session.commit(&grid, &confirmer, &notifier).await.unwrap_err();

        assert!(matches!(err, CoreError::ReasonRequired { .. }));
        assert_eq!(endpoint.request_count(), 0);
        assert_eq!(notifier.levels(), vec![NotifyLevel::Warning]);
        assert_eq!(session.active_id().as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_rejected_commit_discards_draft() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        endpoint.push_update_response(Ok(WorkflowResponse::rejected("stale version")));
        let session = session(&endpoint);
        let confirmer = ScriptedConfirmer::accept_with("fix");
        let notifier = CollectingNotifier::default();

        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(150)).unwrap();
        let err = session.commit(&grid, &confirmer, &notifier).await.unwrap_err();

        assert!(matches!(err, CoreError::ServerRejection { .. }));
        assert_eq!(endpoint.request_count(), 1);
        assert_eq!(grid.read().await.record("A").map(|r| r.value("amount")), Some(json!(100)));
        assert_eq!(session.active_id(), None);
        assert_eq!(notifier.messages(), vec!["stale version".to_string()]);
    }

    #[tokio::test]
    async fn test_network_failure_shows_generic_message() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        endpoint.push_update_response(Err(CoreError::Network { message: "timeout".to_string() }));
        let session = session(&endpoint);
        let confirmer = ScriptedConfirmer::accept_with("fix");
        let notifier = CollectingNotifier::default();

        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(150)).unwrap();
        assert!(session.commit(&grid, &confirmer, &notifier).await.is_err());
        assert_eq!(notifier.messages(), vec![crate::error::NETWORK_ERROR_MESSAGE.to_string()]);
        assert_eq!(notifier.levels(), vec![NotifyLevel::Error]);
    }

    #[tokio::test]
    async fn test_late_response_after_unmount_is_dropped() {
        let grid = Arc::new(grid());
        let endpoint = Arc::new(RecordingEndpoint::new());
        let session = session(&endpoint);
        let notifier = CollectingNotifier::default();

        session.start(&*grid.read().await, "A").unwrap();
        session.set_field("amount", json!(150)).unwrap();

        // The view is torn down while the confirmation is open.
        let confirmer = ScriptedConfirmer::accept_with("fix").on_confirm({
            let grid = grid.clone();
            move || {
                if let Ok(mut model) = grid.try_write() {
                    model.unmount();
                }
            }
        });
        let err = session.commit(&grid, &confirmer, &notifier).await.unwrap_err();

        assert!(matches!(err, CoreError::StaleView));
        assert_eq!(endpoint.request_count(), 1);
        assert_eq!(grid.read().await.record("A").map(|r| r.value("amount")), Some(json!(100)));
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_coerce_input() {
        assert_eq!(coerce_input(&json!(100), "150"), json!(150));
        assert_eq!(coerce_input(&json!(1.5), " 2.25 "), json!(2.25));
        assert_eq!(coerce_input(&json!(100), "abc"), json!("abc"));
        assert_eq!(coerce_input(&json!(true), "off"), json!(false));
        assert_eq!(coerce_input(&json!("x"), " y "), json!(" y "));
        assert_eq!(coerce_input(&Value::Null, ""), Value::Null);
    }
}
