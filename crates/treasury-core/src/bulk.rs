//! Bulk maker-checker actions
//!
//! guard -> confirm -> execute, strictly in that order and at most one
//! request per invocation. Local records change only after the authority
//! reports success for the whole batch.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::collaborators::{BulkActionRequest, ConfirmPrompt, Confirmer, Notifier, WorkflowEndpointRef};
use crate::error::{log_failure, CoreError, CoreResult};
use crate::grid::{DataGridModel, MountToken};
use crate::status::{PlannedTransition, StatusStateMachine, TransitionTarget};
use crate::types::{NotifyLevel, ReviewAction};

/// A guarded action, ready for confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkPlan {
    pub action: ReviewAction,
    pub transitions: Vec<PlannedTransition>,
    pub requires_reason: bool,
}

impl BulkPlan {
    /// Target ids in row order
    pub fn ids(&self) -> Vec<String> {
        self.transitions.iter().map(|t| t.id.clone()).collect()
    }

    /// Confirmation dialog for this plan
    pub fn prompt(&self) -> ConfirmPrompt {
        let count = self.transitions.len();
        let removes = self.transitions.iter().filter(|t| t.to == TransitionTarget::Removed).count();
        let noun = if count == 1 { "record" } else { "records" };
        let mut message = format!("{} {} {}?", self.action.label(), count, noun);
        if removes > 0 {
            message.push_str(&format!(" {} pending deletion(s) will be removed permanently.", removes));
        }
        let (label, placeholder) = if self.requires_reason {
            ("Reason", "Required")
        } else {
            ("Comments", "Optional")
        };
        ConfirmPrompt {
            title: format!("{} {}", self.action.label(), noun),
            message,
            input: true,
            input_required: self.requires_reason,
            input_label: Some(label.to_string()),
            input_placeholder: Some(placeholder.to_string()),
        }
    }
}

/// Free text collected by the confirmation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkInput {
    pub reason: Option<String>,
    pub comments: Option<String>,
}

/// Result of a bulk action that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    /// The user declined; nothing was sent
    Declined,
    /// The authority accepted the batch and it was applied locally
    Applied { action: ReviewAction, ids: Vec<String>, applied: usize },
}

/// Runs review actions against one workspace's grid
pub struct BulkActionCoordinator {
    resource: String,
    endpoint: WorkflowEndpointRef,
    table: Arc<StatusStateMachine>,
}

impl BulkActionCoordinator {
    pub fn new(resource: impl Into<String>, endpoint: WorkflowEndpointRef, table: Arc<StatusStateMachine>) -> Self {
        Self {
            resource: resource.into(),
            endpoint,
            table,
        }
    }

    pub fn table(&self) -> &StatusStateMachine {
        &self.table
    }

    /// The selection, or the row the action was invoked on when nothing is selected
    pub fn targets_for(&self, grid: &DataGridModel, invoked_on: Option<&str>) -> Vec<String> {
        let selected = grid.get_selected_ids();
        if !selected.is_empty() {
            return selected;
        }
        invoked_on
            .filter(|id| grid.is_loaded(id))
            .map(|id| vec![id.to_string()])
            .unwrap_or_default()
    }

    /// Check every target against the transition table, all-or-nothing
    pub fn guard(&self, grid: &DataGridModel, action: ReviewAction, targets: &[String]) -> CoreResult<BulkPlan> {
        let records = targets
            .iter()
            .map(|id| grid.record(id).ok_or_else(|| CoreError::RecordNotFound { id: id.clone() }))
            .collect::<CoreResult<Vec<_>>>()?;
        let transitions = self.table.plan(action, records)?;
        let requires_reason = transitions.iter().any(|t| t.requires_reason);
        Ok(BulkPlan { action, transitions, requires_reason })
    }

    /// Targets plus guard, without side effects
    pub fn prepare(&self, grid: &DataGridModel, action: ReviewAction, invoked_on: Option<&str>) -> CoreResult<BulkPlan> {
        let targets = self.targets_for(grid, invoked_on);
        self.guard(grid, action, &targets)
    }

    /// Ask the user; `Ok(None)` means declined
    pub async fn confirm(&self, confirmer: &dyn Confirmer, plan: &BulkPlan) -> CoreResult<Option<BulkInput>> {
        let reply = confirmer.confirm(&plan.prompt()).await;
        if !reply.confirmed {
            log::debug!(target: "treasury::bulk", "{} declined", plan.action);
            return Ok(None);
        }
        let text = reply.input().map(str::to_string);
        if plan.requires_reason {
            match text {
                Some(reason) => Ok(Some(BulkInput { reason: Some(reason), comments: None })),
                None => Err(CoreError::ReasonRequired { action: plan.action.label().to_lowercase() }),
            }
        } else {
            Ok(Some(BulkInput { reason: None, comments: text }))
        }
    }

    /// Send the batch once and apply it locally if the authority accepts it
    pub async fn execute(
        &self,
        grid: &RwLock<DataGridModel>,
        token: MountToken,
        plan: &BulkPlan,
        input: BulkInput,
    ) -> CoreResult<usize> {
        let request = BulkActionRequest {
            resource: self.resource.clone(),
            ids: plan.ids(),
            reason: input.reason,
            comments: input.comments,
        };
        log::info!(
            target: "treasury::bulk",
            "{} {} record(s) in {}",
            plan.action,
            request.ids.len(),
            self.resource
        );
        let response = self.endpoint.bulk_action(plan.action, &request).await?;

        let mut grid = grid.write().await;
        if !grid.is_current(token) {
            log::debug!(target: "treasury::bulk", "Dropped {} response: view closed", plan.action);
            return Err(CoreError::StaleView);
        }
        if !response.success {
            return Err(CoreError::ServerRejection {
                message: response
                    .error
                    .unwrap_or_else(|| format!("The {} request was rejected", plan.action.label().to_lowercase())),
            });
        }
        Ok(grid.apply_transitions(&plan.transitions))
    }

    /// The whole pipeline, reporting through the notifier
    pub async fn run(
        &self,
        grid: &RwLock<DataGridModel>,
        action: ReviewAction,
        invoked_on: Option<&str>,
        confirmer: &dyn Confirmer,
        notifier: &dyn Notifier,
    ) -> CoreResult<BulkOutcome> {
        match self.run_inner(grid, action, invoked_on, confirmer).await {
            Ok(BulkOutcome::Applied { action, ids, applied }) => {
                notifier.notify(&success_message(action, ids.len()), NotifyLevel::Success);
                Ok(BulkOutcome::Applied { action, ids, applied })
            }
            Ok(BulkOutcome::Declined) => Ok(BulkOutcome::Declined),
            Err(err) => {
                log_failure(&err, &format!("bulk {}", action), &self.resource);
                if let Some(level) = err.notify_level() {
                    notifier.notify(&err.user_message(), level);
                }
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        grid: &RwLock<DataGridModel>,
        action: ReviewAction,
        invoked_on: Option<&str>,
        confirmer: &dyn Confirmer,
    ) -> CoreResult<BulkOutcome> {
        let (plan, token) = {
            let model = grid.read().await;
            let targets = self.targets_for(&model, invoked_on);
            if targets.is_empty() {
                return Err(CoreError::NoTargets { action });
            }
            (self.guard(&model, action, &targets)?, model.mount_token())
        };

        let Some(input) = self.confirm(confirmer, &plan).await? else {
            return Ok(BulkOutcome::Declined);
        };

        let applied = self.execute(grid, token, &plan, input).await?;
        Ok(BulkOutcome::Applied { action, ids: plan.ids(), applied })
    }
}

fn success_message(action: ReviewAction, count: usize) -> String {
    let noun = if count == 1 { "record" } else { "records" };
    match action {
        ReviewAction::Approve => format!("Approved {} {}", count, noun),
        ReviewAction::Reject => format!("Rejected {} {}", count, noun),
        ReviewAction::RequestDelete => format!("Deletion requested for {} {}", count, noun),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ConfirmationReply, WorkflowResponse};
    use crate::models::{ColumnDescriptor, ColumnKind, Record};
    use crate::testing::{CollectingNotifier, RecordingEndpoint, ScriptedConfirmer};
    use crate::types::RecordStatus;
    use serde_json::json;

    fn grid() -> RwLock<DataGridModel> {
        let mut grid = DataGridModel::new(vec![ColumnDescriptor::new("amount", "Amount", ColumnKind::Currency { code: None })]);
        grid.replace_rows(vec![
            Record::new("A", RecordStatus::PendingApproval).with_field("amount", json!(100)),
            Record::new("B", RecordStatus::PendingApproval).with_field("amount", json!(200)),
            Record::new("C", RecordStatus::PendingDeleteApproval).with_field("amount", json!(300)),
        ]);
        RwLock::new(grid)
    }

    fn coordinator(endpoint: &Arc<RecordingEndpoint>) -> BulkActionCoordinator {
        BulkActionCoordinator::new("payments", endpoint.clone(), Arc::new(StatusStateMachine::standard()))
    }

    async fn select(grid: &RwLock<DataGridModel>, ids: &[&str]) {
        let mut model = grid.write().await;
        for id in ids {
            model.toggle_row_selection(id);
        }
    }

    async fn status(grid: &RwLock<DataGridModel>, id: &str) -> Option<RecordStatus> {
        grid.read().await.record(id).map(|r| r.status)
    }

    #[tokio::test]
    async fn test_approve_selection() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let notifier = CollectingNotifier::default();
        select(&grid, &["A", "B"]).await;

        let outcome = coordinator(&endpoint)
            .run(&grid, ReviewAction::Approve, None, &ScriptedConfirmer::accept(), &notifier)
            .await
            .unwrap();

        assert!(matches!(outcome, BulkOutcome::Applied { applied: 2, .. }));
        let requests = endpoint.bulk_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, ReviewAction::Approve);
        assert_eq!(requests[0].1.ids, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(status(&grid, "A").await, Some(RecordStatus::Approved));
        assert_eq!(status(&grid, "B").await, Some(RecordStatus::Approved));
        assert_eq!(status(&grid, "C").await, Some(RecordStatus::PendingDeleteApproval));
        assert!(grid.read().await.get_selected_ids().is_empty());
        assert_eq!(notifier.levels(), vec![NotifyLevel::Success]);
    }

    #[tokio::test]
    async fn test_request_delete_blocked_for_pending_deletion() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let confirmer = ScriptedConfirmer::accept_with("duplicate");
        let notifier = CollectingNotifier::default();
        select(&grid, &["C"]).await;

        let err = coordinator(&endpoint)
            .run(&grid, ReviewAction::RequestDelete, None, &confirmer, &notifier)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::GuardFailure { .. }));
        assert_eq!(endpoint.request_count(), 0);
        assert_eq!(confirmer.prompt_count(), 0);
        assert_eq!(notifier.levels(), vec![NotifyLevel::Warning]);
        assert!(notifier.messages()[0].contains("C (Pending delete approval)"));
        assert_eq!(status(&grid, "C").await, Some(RecordStatus::PendingDeleteApproval));
    }

    #[tokio::test]
    async fn test_mixed_selection_is_all_or_nothing() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let notifier = CollectingNotifier::default();
        select(&grid, &["A", "C"]).await;

        let result = coordinator(&endpoint)
            .run(&grid, ReviewAction::RequestDelete, None, &ScriptedConfirmer::accept_with("dup"), &notifier)
            .await;

        assert!(result.is_err());
        assert_eq!(endpoint.request_count(), 0);
        assert_eq!(status(&grid, "A").await, Some(RecordStatus::PendingApproval));
        assert_eq!(grid.read().await.get_selected_ids().len(), 2);
    }

    #[tokio::test]
    async fn test_server_rejection_changes_nothing() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        endpoint.push_bulk_response(Ok(WorkflowResponse::rejected("stale version")));
        let notifier = CollectingNotifier::default();
        select(&grid, &["A", "B"]).await;

        let err = coordinator(&endpoint)
            .run(&grid, ReviewAction::Approve, None, &ScriptedConfirmer::accept(), &notifier)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ServerRejection { .. }));
        assert_eq!(status(&grid, "A").await, Some(RecordStatus::PendingApproval));
        assert_eq!(status(&grid, "B").await, Some(RecordStatus::PendingApproval));
        assert_eq!(notifier.messages(), vec!["stale version".to_string()]);
        assert_eq!(grid.read().await.get_selected_ids().len(), 2);
    }

    #[tokio::test]
    async fn test_network_error_changes_nothing() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        endpoint.push_bulk_response(Err(CoreError::Network { message: "connection refused".to_string() }));
        let notifier = CollectingNotifier::default();
        select(&grid, &["A"]).await;

        let result = coordinator(&endpoint)
            .run(&grid, ReviewAction::Approve, None, &ScriptedConfirmer::accept(), &notifier)
            .await;

        assert!(matches!(result, Err(CoreError::Network { .. })));
        assert_eq!(endpoint.request_count(), 1);
        assert_eq!(status(&grid, "A").await, Some(RecordStatus::PendingApproval));
        assert_eq!(notifier.messages(), vec![crate::error::NETWORK_ERROR_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_decline_makes_no_request() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let notifier = CollectingNotifier::default();
        select(&grid, &["A"]).await;

        let outcome = coordinator(&endpoint)
            .run(&grid, ReviewAction::Reject, None, &ScriptedConfirmer::new(vec![ConfirmationReply::declined()]), &notifier)
            .await
            .unwrap();

        assert_eq!(outcome, BulkOutcome::Declined);
        assert_eq!(endpoint.request_count(), 0);
        assert!(notifier.notifications().is_empty());
        assert_eq!(status(&grid, "A").await, Some(RecordStatus::PendingApproval));
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let notifier = CollectingNotifier::default();
        select(&grid, &["A"]).await;

        let err = coordinator(&endpoint)
            .run(&grid, ReviewAction::Reject, None, &ScriptedConfirmer::accept(), &notifier)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ReasonRequired { .. }));
        assert_eq!(endpoint.request_count(), 0);

        let confirmer = ScriptedConfirmer::accept_with("wrong beneficiary");
        coordinator(&endpoint)
            .run(&grid, ReviewAction::Reject, None, &confirmer, &notifier)
            .await
            .unwrap();
        let requests = endpoint.bulk_requests();
        assert_eq!(requests[0].1.reason.as_deref(), Some("wrong beneficiary"));
        assert_eq!(requests[0].1.comments, None);
        assert_eq!(status(&grid, "A").await, Some(RecordStatus::Rejected));
        assert!(confirmer.prompts()[0].input_required);
    }

    #[tokio::test]
    async fn test_approve_sends_optional_comments() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let notifier = CollectingNotifier::default();

        coordinator(&endpoint)
            .run(&grid, ReviewAction::Approve, Some("B"), &ScriptedConfirmer::accept_with("checked"), &notifier)
            .await
            .unwrap();

        let requests = endpoint.bulk_requests();
        assert_eq!(requests[0].1.ids, vec!["B".to_string()]);
        assert_eq!(requests[0].1.comments.as_deref(), Some("checked"));
        assert_eq!(requests[0].1.reason, None);
    }

    #[tokio::test]
    async fn test_approving_deletion_removes_record() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let notifier = CollectingNotifier::default();

        coordinator(&endpoint)
            .run(&grid, ReviewAction::Approve, Some("C"), &ScriptedConfirmer::accept(), &notifier)
            .await
            .unwrap();

        assert!(!grid.read().await.is_loaded("C"));
        assert_eq!(grid.read().await.records().len(), 2);
    }

    #[tokio::test]
    async fn test_targets_fall_back_to_invoked_row() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let coordinator = coordinator(&endpoint);
        {
            let model = grid.read().await;
            assert_eq!(coordinator.targets_for(&model, Some("B")), vec!["B".to_string()]);
            assert!(coordinator.targets_for(&model, Some("missing")).is_empty());
            assert!(coordinator.targets_for(&model, None).is_empty());
        }
        select(&grid, &["A"]).await;
        let model = grid.read().await;
        assert_eq!(coordinator.targets_for(&model, Some("B")), vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn test_no_targets_warns() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let notifier = CollectingNotifier::default();
        let err = coordinator(&endpoint)
            .run(&grid, ReviewAction::Approve, None, &ScriptedConfirmer::accept(), &notifier)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoTargets { .. }));
        assert_eq!(notifier.levels(), vec![NotifyLevel::Warning]);
    }

    #[tokio::test]
    async fn test_response_after_unmount_is_ignored() {
        let grid = grid();
        let endpoint = Arc::new(RecordingEndpoint::new());
        let coordinator = coordinator(&endpoint);
        select(&grid, &["A"]).await;

        let (plan, token) = {
            let model = grid.read().await;
            (coordinator.prepare(&model, ReviewAction::Approve, None).unwrap(), model.mount_token())
        };
        grid.write().await.unmount();

        let result = coordinator.execute(&grid, token, &plan, BulkInput::default()).await;
        assert!(matches!(result, Err(CoreError::StaleView)));
        assert_eq!(endpoint.request_count(), 1);
        assert_eq!(status(&grid, "A").await, Some(RecordStatus::PendingApproval));
    }

    #[test]
    fn test_prompt_mentions_removals() {
        let plan = BulkPlan {
            action: ReviewAction::Approve,
            transitions: vec![PlannedTransition {
                id: "C".to_string(),
                from: RecordStatus::PendingDeleteApproval,
                to: TransitionTarget::Removed,
                requires_reason: false,
            }],
            requires_reason: false,
        };
        let prompt = plan.prompt();
        assert_eq!(prompt.message, "Approve 1 record? 1 pending deletion(s) will be removed permanently.");
        assert!(!prompt.input_required);
        assert_eq!(prompt.input_label.as_deref(), Some("Comments"));
    }
}
