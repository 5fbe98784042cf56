//! Maker-checker status rules
//!
//! The transition table is plain data: which states an action applies to,
//! what it turns them into, and whether the confirmation needs a reason.
//! Bulk actions ask this table and nothing else whether they may run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use treasury_config::TransitionRuleConfig;

use crate::error::{CoreError, CoreResult, StatusConflict};
use crate::models::Record;
use crate::types::{RecordStatus, ReviewAction};

/// Marker used in configuration for transitions that drop the record
pub const REMOVED_MARKER: &str = "REMOVED";

/// What a transition does to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTarget {
    /// Move to another state
    Status(RecordStatus),
    /// Terminal and hidden: remove the record from the grid
    Removed,
}

impl std::fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionTarget::Status(status) => write!(f, "{}", status),
            TransitionTarget::Removed => write!(f, "{}", REMOVED_MARKER),
        }
    }
}

/// Predicate over the current state, expressed as data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionGuard {
    /// No extra condition
    #[default]
    Always,
    /// Refuse records in any of these states
    NotIn(BTreeSet<RecordStatus>),
}

impl TransitionGuard {
    /// Evaluate the guard
    pub fn allows(&self, status: RecordStatus) -> bool {
        match self {
            TransitionGuard::Always => true,
            TransitionGuard::NotIn(states) => !states.contains(&status),
        }
    }
}

/// One row of the transition table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub action: ReviewAction,
    pub from_states: BTreeSet<RecordStatus>,
    pub to: TransitionTarget,
    pub requires_reason: bool,
    #[serde(default)]
    pub guard: TransitionGuard,
}

impl StatusTransition {
    fn new(action: ReviewAction, from: &[RecordStatus], to: TransitionTarget) -> Self {
        Self {
            action,
            from_states: from.iter().copied().collect(),
            to,
            requires_reason: false,
            guard: TransitionGuard::Always,
        }
    }

    fn with_reason(mut self) -> Self {
        self.requires_reason = true;
        self
    }

    fn with_guard(mut self, guard: TransitionGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Whether this row applies to a record in `status`
    pub fn applies_to(&self, status: RecordStatus) -> bool {
        self.from_states.contains(&status) && self.guard.allows(status)
    }

    /// Build from a configuration row
    pub fn from_config(rule: &TransitionRuleConfig) -> CoreResult<Self> {
        let invalid = |message: String| CoreError::InvalidTransitionRule { message };

        let action = ReviewAction::from_str(&rule.action).map_err(invalid)?;
        let parse_states = |names: &[String]| -> CoreResult<BTreeSet<RecordStatus>> {
            names
                .iter()
                .map(|name| RecordStatus::from_str(name).map_err(invalid))
                .collect()
        };

        let from_states = if rule.from.is_empty() {
            RecordStatus::ALL.iter().copied().collect()
        } else {
            parse_states(&rule.from)?
        };
        let except = parse_states(&rule.except)?;

        let to = if rule.to.trim().eq_ignore_ascii_case(REMOVED_MARKER) {
            TransitionTarget::Removed
        } else {
            TransitionTarget::Status(RecordStatus::from_str(&rule.to).map_err(invalid)?)
        };

        let guard = if except.is_empty() {
            TransitionGuard::Always
        } else {
            TransitionGuard::NotIn(except)
        };

        Ok(Self {
            action,
            from_states,
            to,
            requires_reason: rule.requires_reason,
            guard,
        })
    }
}

/// A planned transition for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTransition {
    pub id: String,
    pub from: RecordStatus,
    pub to: TransitionTarget,
    pub requires_reason: bool,
}

/// The transition table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusStateMachine {
    transitions: Vec<StatusTransition>,
}

impl Default for StatusStateMachine {
    fn default() -> Self {
        Self::standard()
    }
}

impl StatusStateMachine {
    /// The built-in maker-checker table
    pub fn standard() -> Self {
        use RecordStatus::{Approved, New, PendingApproval, PendingDeleteApproval, Rejected};

        let pending_delete: BTreeSet<RecordStatus> = [PendingDeleteApproval].into_iter().collect();

        Self {
            transitions: vec![
                StatusTransition::new(
                    ReviewAction::Approve,
                    &[New, PendingApproval],
                    TransitionTarget::Status(Approved),
                ),
                StatusTransition::new(
                    ReviewAction::Approve,
                    &[PendingDeleteApproval],
                    TransitionTarget::Removed,
                ),
                StatusTransition::new(
                    ReviewAction::Reject,
                    &[New, PendingApproval],
                    TransitionTarget::Status(Rejected),
                )
                .with_reason(),
                StatusTransition::new(
                    ReviewAction::RequestDelete,
                    &RecordStatus::ALL,
                    TransitionTarget::Status(PendingDeleteApproval),
                )
                .with_reason()
                .with_guard(TransitionGuard::NotIn(pending_delete)),
            ],
        }
    }

    /// Build a table from explicit rows
    pub fn new(transitions: Vec<StatusTransition>) -> Self {
        Self { transitions }
    }

    /// Build a table from configuration rows
    pub fn from_config(rules: &[TransitionRuleConfig]) -> CoreResult<Self> {
        let transitions = rules
            .iter()
            .map(StatusTransition::from_config)
            .collect::<CoreResult<Vec<_>>>()?;
        if transitions.is_empty() {
            return Err(CoreError::InvalidTransitionRule {
                message: "transition table is empty".to_string(),
            });
        }
        Ok(Self { transitions })
    }

    /// All rows
    pub fn transitions(&self) -> &[StatusTransition] {
        &self.transitions
    }

    /// The row that applies to `status` under `action`, if any
    pub fn transition_for(&self, action: ReviewAction, status: RecordStatus) -> Option<&StatusTransition> {
        self.transitions
            .iter()
            .find(|t| t.action == action && t.applies_to(status))
    }

    /// Whether `action` may be applied to a record in `status`
    pub fn can_apply(&self, action: ReviewAction, status: RecordStatus) -> bool {
        self.transition_for(action, status).is_some()
    }

    /// Whether any row of `action` needs a reason
    pub fn requires_reason(&self, action: ReviewAction) -> bool {
        self.transitions
            .iter()
            .any(|t| t.action == action && t.requires_reason)
    }

    /// Actions that have at least one row for `status`
    pub fn available_actions(&self, status: RecordStatus) -> Vec<ReviewAction> {
        ReviewAction::ALL
            .into_iter()
            .filter(|action| self.can_apply(*action, status))
            .collect()
    }

    /// Plan `action` for every record, all-or-nothing
    ///
    /// Returns every conflicting record when any target has no valid row.
    pub fn plan<'a, I>(&self, action: ReviewAction, records: I) -> CoreResult<Vec<PlannedTransition>>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut planned = Vec::new();
        let mut conflicts = Vec::new();

        for record in records {
            match self.transition_for(action, record.status) {
                Some(transition) => planned.push(PlannedTransition {
                    id: record.id.clone(),
                    from: record.status,
                    to: transition.to,
                    requires_reason: transition.requires_reason,
                }),
                None => conflicts.push(StatusConflict {
                    id: record.id.clone(),
                    status: record.status,
                }),
            }
        }

        if !conflicts.is_empty() {
            return Err(CoreError::GuardFailure { action, conflicts });
        }
        if planned.is_empty() {
            return Err(CoreError::NoTargets { action });
        }
        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RecordStatus::{Approved, New, PendingApproval, PendingDeleteApproval, Rejected};

    #[test]
    fn test_approve_rows() {
        let table = StatusStateMachine::standard();
        assert_eq!(
            table.transition_for(ReviewAction::Approve, PendingApproval).map(|t| t.to),
            Some(TransitionTarget::Status(Approved))
        );
        assert_eq!(
            table.transition_for(ReviewAction::Approve, New).map(|t| t.to),
            Some(TransitionTarget::Status(Approved))
        );
        assert_eq!(
            table.transition_for(ReviewAction::Approve, PendingDeleteApproval).map(|t| t.to),
            Some(TransitionTarget::Removed)
        );
        assert!(!table.can_apply(ReviewAction::Approve, Approved));
        assert!(!table.can_apply(ReviewAction::Approve, Rejected));
    }

    #[test]
    fn test_reject_only_from_open_states() {
        let table = StatusStateMachine::standard();
        assert!(table.can_apply(ReviewAction::Reject, New));
        assert!(table.can_apply(ReviewAction::Reject, PendingApproval));
        assert!(!table.can_apply(ReviewAction::Reject, Approved));
        assert!(!table.can_apply(ReviewAction::Reject, PendingDeleteApproval));
        assert!(table.requires_reason(ReviewAction::Reject));
        assert!(!table.requires_reason(ReviewAction::Approve));
    }

    #[test]
    fn test_request_delete_guard() {
        let table = StatusStateMachine::standard();
        for status in [New, PendingApproval, Approved, Rejected] {
            assert!(table.can_apply(ReviewAction::RequestDelete, status), "{}", status);
        }
        assert!(!table.can_apply(ReviewAction::RequestDelete, PendingDeleteApproval));
    }

    #[test]
    fn test_available_actions() {
        let table = StatusStateMachine::standard();
        assert_eq!(
            table.available_actions(PendingApproval),
            vec![ReviewAction::Approve, ReviewAction::Reject, ReviewAction::RequestDelete]
        );
        assert_eq!(table.available_actions(PendingDeleteApproval), vec![ReviewAction::Approve]);
        assert_eq!(table.available_actions(Approved), vec![ReviewAction::RequestDelete]);
    }

    #[test]
    fn test_plan_is_all_or_nothing() {
        let table = StatusStateMachine::standard();
        let records = vec![
            Record::new("A", PendingApproval),
            Record::new("C", PendingDeleteApproval),
            Record::new("D", Approved),
        ];

        let err = table.plan(ReviewAction::RequestDelete, &records).unwrap_err();
        match err {
            CoreError::GuardFailure { action, conflicts } => {
                assert_eq!(action, ReviewAction::RequestDelete);
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, "C");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let planned = table.plan(ReviewAction::Approve, &records[..2]).unwrap();
        assert_eq!(planned[0].to, TransitionTarget::Status(Approved));
        assert_eq!(planned[1].to, TransitionTarget::Removed);
    }

    #[test]
    fn test_plan_without_targets() {
        let table = StatusStateMachine::standard();
        let err = table.plan(ReviewAction::Approve, &Vec::<Record>::new()).unwrap_err();
        assert!(matches!(err, CoreError::NoTargets { .. }));
    }

    #[test]
    fn test_from_config_matches_standard_table() {
        let rules = vec![
            TransitionRuleConfig {
                action: "approve".to_string(),
                from: vec!["NEW".to_string(), "PENDING_APPROVAL".to_string()],
                except: vec![],
                to: "APPROVED".to_string(),
                requires_reason: false,
            },
            TransitionRuleConfig {
                action: "approve".to_string(),
                from: vec!["PENDING_DELETE_APPROVAL".to_string()],
                except: vec![],
                to: "removed".to_string(),
                requires_reason: false,
            },
            TransitionRuleConfig {
                action: "reject".to_string(),
                from: vec!["NEW".to_string(), "PENDING_APPROVAL".to_string()],
                except: vec![],
                to: "REJECTED".to_string(),
                requires_reason: true,
            },
            TransitionRuleConfig {
                action: "request_delete".to_string(),
                from: vec![],
                except: vec!["PENDING_DELETE_APPROVAL".to_string()],
                to: "PENDING_DELETE_APPROVAL".to_string(),
                requires_reason: true,
            },
        ];
        let table = StatusStateMachine::from_config(&rules).unwrap();
        assert_eq!(table, StatusStateMachine::standard());
    }

    #[test]
    fn test_from_config_rejects_unknown_state() {
        let rules = vec![TransitionRuleConfig {
            action: "approve".to_string(),
            from: vec!["ARCHIVED".to_string()],
            except: vec![],
            to: "APPROVED".to_string(),
            requires_reason: false,
        }];
        let err = StatusStateMachine::from_config(&rules).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransitionRule { .. }));
        assert!(StatusStateMachine::from_config(&[]).is_err());
    }
}
