//! Basic enumerations shared by the review workflow

use serde::{Deserialize, Serialize};

/// Record status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    /// Created, not yet submitted
    New,
    /// Waiting for a checker
    PendingApproval,
    /// Approved by a checker
    Approved,
    /// Rejected by a checker
    Rejected,
    /// Deletion requested, waiting for a checker
    PendingDeleteApproval,
}

impl RecordStatus {
    /// All states, in lifecycle order
    pub const ALL: [RecordStatus; 5] = [
        RecordStatus::New,
        RecordStatus::PendingApproval,
        RecordStatus::Approved,
        RecordStatus::Rejected,
        RecordStatus::PendingDeleteApproval,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::New => "New",
            RecordStatus::PendingApproval => "Pending approval",
            RecordStatus::Approved => "Approved",
            RecordStatus::Rejected => "Rejected",
            RecordStatus::PendingDeleteApproval => "Pending delete approval",
        }
    }
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::New
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "NEW" => Ok(RecordStatus::New),
            "PENDING_APPROVAL" => Ok(RecordStatus::PendingApproval),
            "APPROVED" => Ok(RecordStatus::Approved),
            "REJECTED" => Ok(RecordStatus::Rejected),
            "PENDING_DELETE_APPROVAL" => Ok(RecordStatus::PendingDeleteApproval),
            _ => Err(format!("Invalid record status: {}", s)),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::New => write!(f, "NEW"),
            RecordStatus::PendingApproval => write!(f, "PENDING_APPROVAL"),
            RecordStatus::Approved => write!(f, "APPROVED"),
            RecordStatus::Rejected => write!(f, "REJECTED"),
            RecordStatus::PendingDeleteApproval => write!(f, "PENDING_DELETE_APPROVAL"),
        }
    }
}

/// Bulk review actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Approve pending records, or confirm a pending deletion
    Approve,
    /// Reject pending records
    Reject,
    /// Ask a checker to delete records
    RequestDelete,
}

impl ReviewAction {
    /// All actions, in toolbar order
    pub const ALL: [ReviewAction; 3] = [
        ReviewAction::Approve,
        ReviewAction::Reject,
        ReviewAction::RequestDelete,
    ];

    /// Path segment used by the workflow authority
    pub fn slug(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::RequestDelete => "request-delete",
        }
    }

    /// Button label
    pub fn label(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "Approve",
            ReviewAction::Reject => "Reject",
            ReviewAction::RequestDelete => "Request delete",
        }
    }
}

impl std::str::FromStr for ReviewAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            "request_delete" | "delete" => Ok(ReviewAction::RequestDelete),
            _ => Err(format!("Invalid review action: {}", s)),
        }
    }
}

impl std::fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewAction::Approve => write!(f, "approve"),
            ReviewAction::Reject => write!(f, "reject"),
            ReviewAction::RequestDelete => write!(f, "request_delete"),
        }
    }
}

/// Notification level understood by the notification collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyLevel::Success => write!(f, "success"),
            NotifyLevel::Error => write!(f, "error"),
            NotifyLevel::Warning => write!(f, "warning"),
            NotifyLevel::Info => write!(f, "info"),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Asc
    }
}

impl SortDirection {
    /// The other direction
    pub fn reversed(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(format!("Invalid sort direction: {}", s)),
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_status_from_str() {
        assert_eq!("PENDING_APPROVAL".parse::<RecordStatus>(), Ok(RecordStatus::PendingApproval));
        assert_eq!("pending-delete-approval".parse::<RecordStatus>(), Ok(RecordStatus::PendingDeleteApproval));
        assert_eq!(" new ".parse::<RecordStatus>(), Ok(RecordStatus::New));
        assert!("ARCHIVED".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_record_status_wire_format() {
        let json = serde_json::to_string(&RecordStatus::PendingDeleteApproval).unwrap();
        assert_eq!(json, "\"PENDING_DELETE_APPROVAL\"");
        for status in RecordStatus::ALL {
            assert_eq!(status.to_string().parse::<RecordStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_review_action_from_str() {
        assert_eq!("approve".parse::<ReviewAction>(), Ok(ReviewAction::Approve));
        assert_eq!("request-delete".parse::<ReviewAction>(), Ok(ReviewAction::RequestDelete));
        assert_eq!(ReviewAction::RequestDelete.slug(), "request-delete");
        assert!("archive".parse::<ReviewAction>().is_err());
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert_eq!(SortDirection::Asc.reversed(), SortDirection::Desc);
        assert_eq!(SortDirection::default(), SortDirection::Asc);
    }
}
