// Storage traits for the identity graph, approvable resources and
// notifications. Two implementations: Postgres (production) and an in-memory
// store with the same compare-and-set semantics (tests, local runs).
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::identity::Identity;
use crate::notify::Notification;
use crate::workflow::kind::ResourceKind;
use crate::workflow::resource::ApprovableResource;
use crate::workflow::status::{RejectionReason, ResourceStatus};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Mutation applied by [`ResourceStore::update_status_if`]. Every field the
/// variant does not carry is cleared or left alone deterministically, so both
/// stores apply the exact same row change.
#[derive(Debug, Clone)]
pub enum StatusChange {
    /// Re-submission: back to the pending status, review metadata wiped.
    Reopen { status: ResourceStatus },
    /// A reviewer decision: approve/reject/reviewed, with review stamps.
    Decide {
        status: ResourceStatus,
        reviewed_by: Uuid,
        reviewed_at: DateTime<Utc>,
        rejection_reason: Option<RejectionReason>,
    },
    /// Terminal archive. Status becomes `archived`; review stamps are kept.
    Archive { archived_by: Uuid, archived_at: DateTime<Utc> },
}

/// Listing filter for review queues and learner self-views.
/// `scope: None` means unrestricted (super_admin); an explicit empty vec
/// matches nothing.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub scope: Option<Vec<Uuid>>,
    pub status: Option<ResourceStatus>,
    pub subject: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    /// Direct reports: identities whose `leader_id` equals `leader_id`.
    async fn children_of(&self, leader_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// Learners assigned to this coach (flat, no recursion).
    async fn coached_by(&self, coach_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// The learner's current coach, if any.
    async fn coach_of(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Identities provisioned by this assistant. When `leader_id` is given the
    /// result is narrowed to rows under that leader, guarding against a
    /// mis-set `created_by` reaching across org boundaries.
    async fn created_by(
        &self,
        assistant_id: Uuid,
        leader_id: Option<Uuid>,
    ) -> Result<Vec<Uuid>, StoreError>;

    async fn super_admin_ids(&self) -> Result<Vec<Uuid>, StoreError>;

    /// Upsert on `assigned_user_id`: at most one active coach per learner.
    async fn assign_coach(&self, user_id: Uuid, coach_id: Uuid) -> Result<(), StoreError>;

    /// Returns false when no assignment existed.
    async fn unassign_coach(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, kind: ResourceKind, id: Uuid)
        -> Result<Option<ApprovableResource>, StoreError>;

    async fn get_many(
        &self,
        kind: ResourceKind,
        ids: &[Uuid],
    ) -> Result<Vec<ApprovableResource>, StoreError>;

    async fn find_by_key(
        &self,
        kind: ResourceKind,
        subject: Uuid,
        resource_key: &str,
    ) -> Result<Option<ApprovableResource>, StoreError>;

    async fn insert(&self, resource: &ApprovableResource) -> Result<(), StoreError>;

    /// Compare-and-set: applies `change` only while the row's current status
    /// is one of `expected`. Returns false when the guard missed (someone else
    /// already moved the row), so callers re-read and report instead of
    /// double-applying. This is the ONLY mutation primitive for resources.
    async fn update_status_if(
        &self,
        kind: ResourceKind,
        id: Uuid,
        expected: &[ResourceStatus],
        change: StatusChange,
    ) -> Result<bool, StoreError>;

    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ResourceFilter,
    ) -> Result<Vec<ApprovableResource>, StoreError>;

    async fn count(&self, kind: ResourceKind, filter: &ResourceFilter)
        -> Result<i64, StoreError>;

    /// True when the subject has a row for `resource_key` whose status is
    /// submitted-or-later. Rejected and archived rows do not count (a rejected
    /// note must be resubmitted). Read-side input to the sequencing guard.
    async fn has_submission(
        &self,
        kind: ResourceKind,
        subject: Uuid,
        resource_key: &str,
    ) -> Result<bool, StoreError>;
}

/// New notification prior to insert; the store stamps id and created_at.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub to_user_id: Uuid,
    pub from_user_id: Option<Uuid>,
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_many(&self, notifications: &[NewNotification]) -> Result<(), StoreError>;

    async fn list_for(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Marks a notification read for its recipient. Returns false when the id
    /// does not exist or belongs to someone else.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
}
