use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::workflow::kind::ResourceKind;
use crate::workflow::status::{RejectionReason, ResourceStatus};

/// The common row shape instantiated by all six resource kinds.
///
/// `kind`, `status` and `rejection_reason` are stored as raw strings (same
/// convention as [`crate::identity::Identity`]); typed accessors parse on
/// demand. `owner_leader_id` is denormalized at creation time so the common
/// review path can match a leader without walking the tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApprovableResource {
    pub id: Uuid,
    pub kind: String,
    pub subject_user_id: Uuid,
    pub owner_leader_id: Option<Uuid>,
    /// Kind-specific key: lesson number for course kinds, a week tag for
    /// weekly summaries, an opaque client key otherwise.
    pub resource_key: String,
    /// Object-storage coordinates for file-backed kinds. Never raw bytes;
    /// signing happens at serve time through the injected signer.
    pub bucket: Option<String>,
    pub path: Option<String>,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub archived_by: Option<Uuid>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovableResource {
    pub fn parsed_status(&self) -> Option<ResourceStatus> {
        ResourceStatus::parse(&self.status)
    }

    pub fn parsed_reason(&self) -> Option<RejectionReason> {
        self.rejection_reason.as_deref().and_then(RejectionReason::parse)
    }

    /// Build a fresh pending row for a learner submission.
    pub fn new_pending(
        kind: ResourceKind,
        subject_user_id: Uuid,
        owner_leader_id: Option<Uuid>,
        resource_key: impl Into<String>,
        bucket: Option<String>,
        path: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: kind.as_str().to_string(),
            subject_user_id,
            owner_leader_id,
            resource_key: resource_key.into(),
            bucket,
            path,
            status: kind.descriptor().pending_status.as_str().to_string(),
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            archived_by: None,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
