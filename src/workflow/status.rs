use serde::{Deserialize, Serialize};

/// Lifecycle states shared by all six resource kinds. Not every kind uses
/// every state: which ones apply is declared by the kind descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Requested,
    Submitted,
    Approved,
    Rejected,
    Reviewed,
    Completed,
    Archived,
}

impl ResourceStatus {
    pub fn parse(s: &str) -> Option<ResourceStatus> {
        match s {
            "requested" => Some(ResourceStatus::Requested),
            "submitted" => Some(ResourceStatus::Submitted),
            "approved" => Some(ResourceStatus::Approved),
            "rejected" => Some(ResourceStatus::Rejected),
            "reviewed" => Some(ResourceStatus::Reviewed),
            "completed" => Some(ResourceStatus::Completed),
            "archived" => Some(ResourceStatus::Archived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Requested => "requested",
            ResourceStatus::Submitted => "submitted",
            ResourceStatus::Approved => "approved",
            ResourceStatus::Rejected => "rejected",
            ResourceStatus::Reviewed => "reviewed",
            ResourceStatus::Completed => "completed",
            ResourceStatus::Archived => "archived",
        }
    }

    /// Awaiting a reviewer decision.
    pub fn is_pending(&self) -> bool {
        matches!(self, ResourceStatus::Requested | ResourceStatus::Submitted)
    }

    /// A reviewer (or the terminal flow) has already settled this item.
    pub fn is_decided(&self) -> bool {
        matches!(
            self,
            ResourceStatus::Approved
                | ResourceStatus::Rejected
                | ResourceStatus::Reviewed
                | ResourceStatus::Completed
        )
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions the engine understands. "request" and "submit" are the same
/// learner-side action; the pending status it lands on comes from the kind
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    #[serde(alias = "request")]
    Submit,
    Approve,
    Reject,
    Archive,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::Submit => "submit",
            WorkflowAction::Approve => "approve",
            WorkflowAction::Reject => "reject",
            WorkflowAction::Archive => "archive",
        }
    }
}

impl std::fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of rejection reasons. The enum is advisory for the UI: whatever
/// free text a reviewer sends is normalized onto one of these values, and
/// anything unrecognized collapses to `Other` rather than failing the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    IncompleteMaterials,
    WrongFormat,
    BelowStandard,
    Duplicate,
    Other,
}

impl RejectionReason {
    /// Normalize caller-supplied text. Accepts canonical codes plus the
    /// Chinese and English labels the admin UI has shipped over time.
    pub fn normalize(raw: &str) -> RejectionReason {
        match raw.trim() {
            "incomplete_materials" | "资料不完整" | "incomplete materials" => {
                RejectionReason::IncompleteMaterials
            }
            "wrong_format" | "格式错误" | "wrong format" => RejectionReason::WrongFormat,
            "below_standard" | "未达标准" | "below standard" => RejectionReason::BelowStandard,
            "duplicate" | "重复提交" => RejectionReason::Duplicate,
            "other" | "其他" => RejectionReason::Other,
            _ => RejectionReason::Other,
        }
    }

    pub fn parse(s: &str) -> Option<RejectionReason> {
        match s {
            "incomplete_materials" => Some(RejectionReason::IncompleteMaterials),
            "wrong_format" => Some(RejectionReason::WrongFormat),
            "below_standard" => Some(RejectionReason::BelowStandard),
            "duplicate" => Some(RejectionReason::Duplicate),
            "other" => Some(RejectionReason::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::IncompleteMaterials => "incomplete_materials",
            RejectionReason::WrongFormat => "wrong_format",
            RejectionReason::BelowStandard => "below_standard",
            RejectionReason::Duplicate => "duplicate",
            RejectionReason::Other => "other",
        }
    }

    pub fn label_zh(&self) -> &'static str {
        match self {
            RejectionReason::IncompleteMaterials => "资料不完整",
            RejectionReason::WrongFormat => "格式错误",
            RejectionReason::BelowStandard => "未达标准",
            RejectionReason::Duplicate => "重复提交",
            RejectionReason::Other => "其他",
        }
    }

    pub fn label_en(&self) -> &'static str {
        match self {
            RejectionReason::IncompleteMaterials => "incomplete materials",
            RejectionReason::WrongFormat => "wrong format",
            RejectionReason::BelowStandard => "below standard",
            RejectionReason::Duplicate => "duplicate submission",
            RejectionReason::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_known_labels() {
        assert_eq!(
            RejectionReason::normalize("资料不完整"),
            RejectionReason::IncompleteMaterials
        );
        assert_eq!(
            RejectionReason::normalize("incomplete_materials"),
            RejectionReason::IncompleteMaterials
        );
        assert_eq!(RejectionReason::normalize("其他"), RejectionReason::Other);
    }

    #[test]
    fn test_normalize_free_text_collapses_to_other() {
        assert_eq!(RejectionReason::normalize("banana"), RejectionReason::Other);
        assert_eq!(RejectionReason::normalize(""), RejectionReason::Other);
        assert_eq!(
            RejectionReason::normalize("<script>alert(1)</script>"),
            RejectionReason::Other
        );
    }

    #[test]
    fn test_status_predicates() {
        assert!(ResourceStatus::Requested.is_pending());
        assert!(ResourceStatus::Submitted.is_pending());
        assert!(ResourceStatus::Approved.is_decided());
        assert!(ResourceStatus::Reviewed.is_decided());
        assert!(!ResourceStatus::Archived.is_pending());
        assert!(!ResourceStatus::Archived.is_decided());
    }
}
