use serde::{Deserialize, Serialize};

use crate::identity::Role;
use crate::workflow::status::{ResourceStatus, WorkflowAction};

/// The six approvable resource kinds. The set is fixed; adding a kind means
/// adding a descriptor entry, not a new route file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    CourseAccess,
    FileAccess,
    TradeSubmission,
    ClassicTrade,
    WeeklySummary,
    CourseNote,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::CourseAccess,
        ResourceKind::FileAccess,
        ResourceKind::TradeSubmission,
        ResourceKind::ClassicTrade,
        ResourceKind::WeeklySummary,
        ResourceKind::CourseNote,
    ];

    /// Parse the URL path segment form ("course-access", "trade-submissions").
    pub fn from_path(s: &str) -> Option<ResourceKind> {
        match s {
            "course-access" => Some(ResourceKind::CourseAccess),
            "file-access" => Some(ResourceKind::FileAccess),
            "trade-submissions" => Some(ResourceKind::TradeSubmission),
            "classic-trades" => Some(ResourceKind::ClassicTrade),
            "weekly-summaries" => Some(ResourceKind::WeeklySummary),
            "course-notes" => Some(ResourceKind::CourseNote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::CourseAccess => "course_access",
            ResourceKind::FileAccess => "file_access",
            ResourceKind::TradeSubmission => "trade_submission",
            ResourceKind::ClassicTrade => "classic_trade",
            ResourceKind::WeeklySummary => "weekly_summary",
            ResourceKind::CourseNote => "course_note",
        }
    }

    pub fn parse(s: &str) -> Option<ResourceKind> {
        match s {
            "course_access" => Some(ResourceKind::CourseAccess),
            "file_access" => Some(ResourceKind::FileAccess),
            "trade_submission" => Some(ResourceKind::TradeSubmission),
            "classic_trade" => Some(ResourceKind::ClassicTrade),
            "weekly_summary" => Some(ResourceKind::WeeklySummary),
            "course_note" => Some(ResourceKind::CourseNote),
            _ => None,
        }
    }

    pub fn descriptor(&self) -> &'static KindDescriptor {
        match self {
            ResourceKind::CourseAccess => &COURSE_ACCESS,
            ResourceKind::FileAccess => &FILE_ACCESS,
            ResourceKind::TradeSubmission => &TRADE_SUBMISSION,
            ResourceKind::ClassicTrade => &CLASSIC_TRADE,
            ResourceKind::WeeklySummary => &WEEKLY_SUMMARY,
            ResourceKind::CourseNote => &COURSE_NOTE,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bilingual copy used by the notification dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct KindLabels {
    pub zh: &'static str,
    pub en: &'static str,
}

/// Per-kind capability table. One engine, six configurations: the descriptor
/// decides who may review, which actions exist, and which statuses a pending
/// item and a positive decision land on.
#[derive(Debug, Clone)]
pub struct KindDescriptor {
    pub kind: ResourceKind,
    /// Roles allowed to review (approve/reject/archive). Learners submitting
    /// for themselves are checked separately.
    pub reviewer_roles: &'static [Role],
    pub actions: &'static [WorkflowAction],
    /// Status a fresh or re-submitted item carries.
    pub pending_status: ResourceStatus,
    /// Status a positive review decision sets.
    pub decision_status: ResourceStatus,
    /// Lesson-ordering guard applies (course lessons only).
    pub sequenced: bool,
    /// Approval triggers the aggregate learning-status recomputation.
    pub recompute_learning_status: bool,
    /// The subject's assigned coach is part of the submission fan-out.
    pub coach_relevant: bool,
    pub labels: KindLabels,
}

impl KindDescriptor {
    pub fn allows_action(&self, action: WorkflowAction) -> bool {
        self.actions.contains(&action)
    }

    pub fn allows_reviewer(&self, role: Role) -> bool {
        self.reviewer_roles.contains(&role)
    }
}

static COURSE_ACCESS: KindDescriptor = KindDescriptor {
    kind: ResourceKind::CourseAccess,
    reviewer_roles: &[Role::Leader, Role::Assistant, Role::SuperAdmin],
    actions: &[WorkflowAction::Submit, WorkflowAction::Approve, WorkflowAction::Reject],
    pending_status: ResourceStatus::Requested,
    decision_status: ResourceStatus::Approved,
    sequenced: true,
    recompute_learning_status: true,
    coach_relevant: false,
    labels: KindLabels { zh: "课程申请", en: "course access request" },
};

static FILE_ACCESS: KindDescriptor = KindDescriptor {
    kind: ResourceKind::FileAccess,
    reviewer_roles: &[Role::Leader, Role::Assistant, Role::SuperAdmin],
    actions: &[WorkflowAction::Submit, WorkflowAction::Approve],
    pending_status: ResourceStatus::Submitted,
    decision_status: ResourceStatus::Reviewed,
    sequenced: false,
    recompute_learning_status: false,
    coach_relevant: false,
    labels: KindLabels { zh: "文件下载申请", en: "file download request" },
};

static TRADE_SUBMISSION: KindDescriptor = KindDescriptor {
    kind: ResourceKind::TradeSubmission,
    reviewer_roles: &[Role::Coach, Role::Leader, Role::SuperAdmin],
    actions: &[WorkflowAction::Submit, WorkflowAction::Approve, WorkflowAction::Archive],
    pending_status: ResourceStatus::Submitted,
    decision_status: ResourceStatus::Approved,
    sequenced: false,
    recompute_learning_status: false,
    coach_relevant: true,
    labels: KindLabels { zh: "交易记录", en: "trade log submission" },
};

static CLASSIC_TRADE: KindDescriptor = KindDescriptor {
    kind: ResourceKind::ClassicTrade,
    reviewer_roles: &[Role::Leader, Role::Coach, Role::SuperAdmin],
    actions: &[
        WorkflowAction::Submit,
        WorkflowAction::Approve,
        WorkflowAction::Reject,
        WorkflowAction::Archive,
    ],
    pending_status: ResourceStatus::Submitted,
    decision_status: ResourceStatus::Approved,
    sequenced: false,
    recompute_learning_status: false,
    coach_relevant: true,
    labels: KindLabels { zh: "经典交易", en: "classic trade entry" },
};

static WEEKLY_SUMMARY: KindDescriptor = KindDescriptor {
    kind: ResourceKind::WeeklySummary,
    reviewer_roles: &[Role::Coach, Role::Leader, Role::SuperAdmin],
    actions: &[WorkflowAction::Submit, WorkflowAction::Approve, WorkflowAction::Reject],
    pending_status: ResourceStatus::Submitted,
    decision_status: ResourceStatus::Approved,
    sequenced: false,
    recompute_learning_status: false,
    coach_relevant: true,
    labels: KindLabels { zh: "每周总结", en: "weekly summary" },
};

static COURSE_NOTE: KindDescriptor = KindDescriptor {
    kind: ResourceKind::CourseNote,
    reviewer_roles: &[Role::Leader, Role::Assistant, Role::SuperAdmin],
    actions: &[WorkflowAction::Submit, WorkflowAction::Approve],
    pending_status: ResourceStatus::Submitted,
    decision_status: ResourceStatus::Reviewed,
    sequenced: false,
    recompute_learning_status: false,
    coach_relevant: false,
    labels: KindLabels { zh: "课程笔记", en: "course note" },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment_round_trip() {
        for kind in ResourceKind::ALL {
            let seg = match kind {
                ResourceKind::CourseAccess => "course-access",
                ResourceKind::FileAccess => "file-access",
                ResourceKind::TradeSubmission => "trade-submissions",
                ResourceKind::ClassicTrade => "classic-trades",
                ResourceKind::WeeklySummary => "weekly-summaries",
                ResourceKind::CourseNote => "course-notes",
            };
            assert_eq!(ResourceKind::from_path(seg), Some(kind));
        }
        assert_eq!(ResourceKind::from_path("ladders"), None);
    }

    #[test]
    fn test_coach_cannot_review_course_access() {
        let d = ResourceKind::CourseAccess.descriptor();
        assert!(!d.allows_reviewer(Role::Coach));
        assert!(d.allows_reviewer(Role::Leader));
        assert!(d.allows_reviewer(Role::SuperAdmin));
    }

    #[test]
    fn test_trade_submissions_have_no_reject() {
        let d = ResourceKind::TradeSubmission.descriptor();
        assert!(!d.allows_action(WorkflowAction::Reject));
        assert!(d.allows_action(WorkflowAction::Archive));
        assert!(d.allows_reviewer(Role::Coach));
    }

    #[test]
    fn test_only_course_access_is_sequenced() {
        for kind in ResourceKind::ALL {
            let d = kind.descriptor();
            assert_eq!(d.sequenced, kind == ResourceKind::CourseAccess);
            assert_eq!(d.recompute_learning_status, kind == ResourceKind::CourseAccess);
        }
    }
}
