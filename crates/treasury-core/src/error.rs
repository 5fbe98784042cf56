//! Error types for treasury-core
//!
//! Every failure of the review workflow maps to a stable code, a severity
//! that decides whether and how loudly the user is told, and a user-facing
//! message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{NotifyLevel, RecordStatus, ReviewAction};

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A target has no valid transition for the action
    GuardFailure,
    /// Nothing selected and no row given
    NoTargets,
    /// The transition needs a reason and none was given
    ReasonRequired,
    /// The user declined the confirmation
    ConfirmationDeclined,
    /// Transport or timeout failure
    NetworkError,
    /// The workflow authority answered success=false
    ServerRejection,
    /// Another row is being edited
    EditSessionActive,
    /// No row is being edited
    NoActiveEdit,
    /// Field cannot be edited
    ReadOnlyField,
    /// Record not loaded
    RecordNotFound,
    /// Column not defined
    UnknownColumn,
    /// Response arrived after the view was torn down
    StaleView,
    /// Transition table entry could not be built
    InvalidTransitionRule,
    /// Preferences could not be read or written
    PreferencesError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::GuardFailure => "GUARD_FAILURE",
            ErrorCode::NoTargets => "NO_TARGETS",
            ErrorCode::ReasonRequired => "REASON_REQUIRED",
            ErrorCode::ConfirmationDeclined => "CONFIRMATION_DECLINED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ServerRejection => "SERVER_REJECTION",
            ErrorCode::EditSessionActive => "EDIT_SESSION_ACTIVE",
            ErrorCode::NoActiveEdit => "NO_ACTIVE_EDIT",
            ErrorCode::ReadOnlyField => "READ_ONLY_FIELD",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::UnknownColumn => "UNKNOWN_COLUMN",
            ErrorCode::StaleView => "STALE_VIEW",
            ErrorCode::InvalidTransitionRule => "INVALID_TRANSITION_RULE",
            ErrorCode::PreferencesError => "PREFERENCES_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How loudly a failure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Logged only
    Debug,
    Info,
    /// Blocked before any side effect
    Warning,
    Error,
    /// Misconfiguration
    Critical,
}

/// A record whose current state blocks an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConflict {
    pub id: String,
    pub status: RecordStatus,
}

impl std::fmt::Display for StatusConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.status.label())
    }
}

fn join_conflicts(conflicts: &[StatusConflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generic text shown for transport failures
pub const NETWORK_ERROR_MESSAGE: &str =
    "The workflow service could not be reached. Please try again later.";

/// Main error type for treasury-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Cannot {}: {} not allowed in the current state", .action.label().to_lowercase(), join_conflicts(.conflicts))]
    GuardFailure {
        action: ReviewAction,
        conflicts: Vec<StatusConflict>,
    },

    #[error("Select at least one record to {}", .action.label().to_lowercase())]
    NoTargets { action: ReviewAction },

    #[error("A reason is required to {action}")]
    ReasonRequired { action: String },

    #[error("Confirmation declined")]
    ConfirmationDeclined,

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("{message}")]
    ServerRejection { message: String },

    #[error("Record {id} is already being edited")]
    EditSessionActive { id: String },

    #[error("No record is being edited")]
    NoActiveEdit,

    #[error("Field '{field}' cannot be edited")]
    ReadOnlyField { field: String },

    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    #[error("Unknown column: {id}")]
    UnknownColumn { id: String },

    #[error("The view was closed before the response arrived")]
    StaleView,

    #[error("Invalid transition rule: {message}")]
    InvalidTransitionRule { message: String },

    #[error("Preferences error: {message}")]
    Preferences { message: String },

}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::GuardFailure { .. } => ErrorCode::GuardFailure,
            CoreError::NoTargets { .. } => ErrorCode::NoTargets,
            CoreError::ReasonRequired { .. } => ErrorCode::ReasonRequired,
            CoreError::ConfirmationDeclined => ErrorCode::ConfirmationDeclined,
            CoreError::Network { .. } => ErrorCode::NetworkError,
            CoreError::ServerRejection { .. } => ErrorCode::ServerRejection,
            CoreError::EditSessionActive { .. } => ErrorCode::EditSessionActive,
            CoreError::NoActiveEdit => ErrorCode::NoActiveEdit,
            CoreError::ReadOnlyField { .. } => ErrorCode::ReadOnlyField,
            CoreError::RecordNotFound { .. } => ErrorCode::RecordNotFound,
            CoreError::UnknownColumn { .. } => ErrorCode::UnknownColumn,
            CoreError::StaleView => ErrorCode::StaleView,
            CoreError::InvalidTransitionRule { .. } => ErrorCode::InvalidTransitionRule,
            CoreError::Preferences { .. } => ErrorCode::PreferencesError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::GuardFailure { .. } => ErrorSeverity::Warning,
            CoreError::NoTargets { .. } => ErrorSeverity::Warning,
            CoreError::ReasonRequired { .. } => ErrorSeverity::Warning,
            CoreError::ConfirmationDeclined => ErrorSeverity::Debug,
            CoreError::Network { .. } => ErrorSeverity::Error,
            CoreError::ServerRejection { .. } => ErrorSeverity::Error,
            CoreError::EditSessionActive { .. } => ErrorSeverity::Warning,
            CoreError::NoActiveEdit => ErrorSeverity::Info,
            CoreError::ReadOnlyField { .. } => ErrorSeverity::Warning,
            CoreError::RecordNotFound { .. } => ErrorSeverity::Info,
            CoreError::UnknownColumn { .. } => ErrorSeverity::Info,
            CoreError::StaleView => ErrorSeverity::Debug,
            CoreError::InvalidTransitionRule { .. } => ErrorSeverity::Critical,
            CoreError::Preferences { .. } => ErrorSeverity::Warning,
        }
    }

    /// Notification level, or None for errors the user is not told about
    pub fn notify_level(&self) -> Option<NotifyLevel> {
        match self.severity() {
            ErrorSeverity::Debug => None,
            ErrorSeverity::Info => Some(NotifyLevel::Info),
            ErrorSeverity::Warning => Some(NotifyLevel::Warning),
            ErrorSeverity::Error | ErrorSeverity::Critical => Some(NotifyLevel::Error),
        }
    }

    /// Text shown to the user
    ///
    /// Server rejections are passed through verbatim; transport failures
    /// get a generic retry-later message.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Network { .. } => NETWORK_ERROR_MESSAGE.to_string(),
            CoreError::ServerRejection { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Log a failed operation at the level its severity calls for
pub fn log_failure(error: &CoreError, operation: &str, workspace: &str) {
    let level = match error.severity() {
        ErrorSeverity::Debug => log::Level::Debug,
        ErrorSeverity::Info => log::Level::Info,
        ErrorSeverity::Warning => log::Level::Warn,
        ErrorSeverity::Error | ErrorSeverity::Critical => log::Level::Error,
    };
    log::log!(target: "treasury::error", level, "[{}] {} failed on '{}': {}", error.code(), operation, workspace, error);
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::GuardFailure.to_string(), "GUARD_FAILURE");
        assert_eq!(ErrorCode::ServerRejection.to_string(), "SERVER_REJECTION");
        assert_eq!(ErrorCode::StaleView.to_string(), "STALE_VIEW");
    }

    #[test]
    fn test_guard_failure_names_conflicts() {
        let error = CoreError::GuardFailure {
            action: ReviewAction::RequestDelete,
            conflicts: vec![StatusConflict {
                id: "C".to_string(),
                status: RecordStatus::PendingDeleteApproval,
            }],
        };
        assert_eq!(error.code(), ErrorCode::GuardFailure);
        assert_eq!(error.notify_level(), Some(NotifyLevel::Warning));
        let message = error.user_message();
        assert!(message.starts_with("Cannot request delete:"));
        assert!(message.contains("C (Pending delete approval)"));
    }

    #[test]
    fn test_server_rejection_is_verbatim() {
        let error = CoreError::ServerRejection { message: "stale version".to_string() };
        assert_eq!(error.user_message(), "stale version");
        assert_eq!(error.notify_level(), Some(NotifyLevel::Error));
    }

    #[test]
    fn test_network_error_is_generic() {
        let error = CoreError::Network { message: "connection refused".to_string() };
        assert_eq!(error.user_message(), NETWORK_ERROR_MESSAGE);
        assert_eq!(error.code(), ErrorCode::NetworkError);
        assert!(error.to_string().contains("connection refused"));
    }

    #[test]
    fn test_declined_and_stale_are_silent() {
        assert_eq!(CoreError::ConfirmationDeclined.notify_level(), None);
        assert_eq!(CoreError::StaleView.notify_level(), None);
    }

    #[test]
    fn test_severity_order() {
        let blocked = CoreError::NoTargets { action: ReviewAction::Approve };
        let misconfigured = CoreError::InvalidTransitionRule { message: "bad".to_string() };
        assert!(blocked.severity() < misconfigured.severity());
        assert_eq!(misconfigured.notify_level(), Some(NotifyLevel::Error));
        assert_eq!(CoreError::NoActiveEdit.notify_level(), Some(NotifyLevel::Info));
    }
}
