// The generic approval engine. One implementation of the
// scope-check / transition / notify sequence, instantiated for all six
// resource kinds through their descriptors.
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::learning::LearningStatusHook;
use crate::notify::NotificationDispatcher;
use crate::scope::{resolve_scope, Actor, ScopeError, ScopeSet};
use crate::sequence::{check_prerequisite, SequenceCheck};
use crate::store::{
    IdentityStore, NotificationStore, ResourceStore, StatusChange, StoreError,
};
use crate::workflow::kind::{KindDescriptor, ResourceKind};
use crate::workflow::resource::ApprovableResource;
use crate::workflow::status::{RejectionReason, ResourceStatus, WorkflowAction};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("resource was already reviewed")]
    AlreadyReviewed,

    #[error("resource was already archived")]
    AlreadyArchived,

    #[error("cannot {action} a resource in status '{from}'")]
    IllegalTransition { from: String, action: WorkflowAction },

    #[error("{0}")]
    PrerequisiteBlocked(String),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a single transition. `notify_failed` reports a committed
/// transition whose notification fan-out failed (NOTIFY_FAILED): the state
/// change stands, the gap is surfaced for follow-up.
#[derive(Debug)]
pub struct TransitionOutcome {
    pub resource: ApprovableResource,
    pub notify_failed: bool,
}

/// Outcome of a bulk review. Rows that failed their status guard are reported
/// per id; partial application is visible, never hidden.
#[derive(Debug)]
pub struct BulkOutcome {
    pub updated: Vec<Uuid>,
    pub skipped: Vec<(Uuid, String)>,
    pub notify_failed: bool,
}

/// Learner-side submit payload.
#[derive(Debug, Clone)]
pub struct SubmitPayload {
    pub resource_key: String,
    pub bucket: Option<String>,
    pub path: Option<String>,
}

pub struct ApprovalEngine {
    identities: Arc<dyn IdentityStore>,
    resources: Arc<dyn ResourceStore>,
    dispatcher: NotificationDispatcher,
    learning: Arc<dyn LearningStatusHook>,
    max_tree_depth: u32,
}

impl ApprovalEngine {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        resources: Arc<dyn ResourceStore>,
        notifications: Arc<dyn NotificationStore>,
        learning: Arc<dyn LearningStatusHook>,
        max_tree_depth: u32,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(identities.clone(), notifications);
        Self { identities, resources, dispatcher, learning, max_tree_depth }
    }

    /// Learner request/submit. The subject is usually the actor; a reviewer
    /// may also submit on behalf of a learner inside their scope.
    pub async fn submit(
        &self,
        kind: ResourceKind,
        actor: &Actor,
        subject_id: Uuid,
        payload: SubmitPayload,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let descriptor = kind.descriptor();
        // Submit exists for every kind, but keep the capability gate uniform.
        if !descriptor.allows_action(WorkflowAction::Submit) {
            return Err(WorkflowError::Forbidden(format!(
                "submit is not available for {}",
                kind
            )));
        }

        if subject_id != actor.id {
            let scope = resolve_scope(actor, self.identities.as_ref(), self.max_tree_depth).await?;
            if !scope.contains(subject_id) {
                return Err(WorkflowError::Forbidden(
                    "subject is outside your scope".to_string(),
                ));
            }
        }

        match check_prerequisite(
            self.resources.as_ref(),
            kind,
            subject_id,
            &payload.resource_key,
        )
        .await?
        {
            SequenceCheck::Allowed => {}
            SequenceCheck::Blocked { missing_lesson } => {
                return Err(WorkflowError::PrerequisiteBlocked(format!(
                    "lesson {} requires a submitted note for lesson {}",
                    payload.resource_key, missing_lesson
                )));
            }
        }

        let subject = self
            .identities
            .get(subject_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("subject account not found".to_string()))?;

        let existing = self
            .resources
            .find_by_key(kind, subject_id, &payload.resource_key)
            .await?;

        let resource = match existing {
            None => {
                let resource = ApprovableResource::new_pending(
                    kind,
                    subject_id,
                    subject.leader_id,
                    payload.resource_key.clone(),
                    payload.bucket.clone(),
                    payload.path.clone(),
                );
                self.resources.insert(&resource).await?;
                resource
            }
            Some(prior) => match prior.parsed_status() {
                // Re-submitting while still pending is an idempotent no-op.
                Some(s) if s.is_pending() => {
                    return Ok(TransitionOutcome { resource: prior, notify_failed: false });
                }
                // Re-submission after rejection resets review metadata.
                Some(ResourceStatus::Rejected) => {
                    let reopened = self
                        .resources
                        .update_status_if(
                            kind,
                            prior.id,
                            &[ResourceStatus::Rejected],
                            StatusChange::Reopen { status: descriptor.pending_status },
                        )
                        .await?;
                    if !reopened {
                        // Lost a race with a concurrent transition; report
                        // from the fresh row.
                        return Err(self.stale_row_error(kind, prior.id, WorkflowAction::Submit).await?);
                    }
                    self.resources
                        .get(kind, prior.id)
                        .await?
                        .ok_or_else(|| WorkflowError::NotFound("resource vanished".to_string()))?
                }
                // Never silently overwrite a decided item.
                Some(ResourceStatus::Archived) => return Err(WorkflowError::AlreadyArchived),
                Some(_) => return Err(WorkflowError::AlreadyReviewed),
                None => {
                    return Err(WorkflowError::IllegalTransition {
                        from: prior.status.clone(),
                        action: WorkflowAction::Submit,
                    })
                }
            },
        };

        let notify_failed = match self
            .dispatcher
            .on_submission(descriptor, subject_id, &subject.name)
            .await
        {
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(kind = %kind, subject = %subject_id, "submission notification failed: {}", e);
                true
            }
        };

        Ok(TransitionOutcome { resource, notify_failed })
    }

    /// Single review decision: approve, reject or archive. Preconditions in
    /// order: role capability, current status, scope membership (with the
    /// denormalized owner_leader_id fast path), reason normalization.
    pub async fn review(
        &self,
        kind: ResourceKind,
        resource_id: Uuid,
        actor: &Actor,
        action: WorkflowAction,
        reason_raw: Option<&str>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let descriptor = kind.descriptor();
        self.check_reviewer(descriptor, actor, action)?;

        let resource = self
            .resources
            .get(kind, resource_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("resource not found".to_string()))?;

        let current = resource.parsed_status().ok_or_else(|| {
            WorkflowError::IllegalTransition { from: resource.status.clone(), action }
        })?;
        self.check_status(current, action)?;

        self.check_scope(actor, &resource).await?;

        // Free text collapses onto the closed enum; a missing reason on
        // reject defaults to Other rather than failing the call.
        let reason = match action {
            WorkflowAction::Reject => {
                Some(reason_raw.map(RejectionReason::normalize).unwrap_or(RejectionReason::Other))
            }
            _ => None,
        };

        let now = Utc::now();
        let (expected, change): (&[ResourceStatus], StatusChange) = match action {
            WorkflowAction::Approve => (
                &[ResourceStatus::Requested, ResourceStatus::Submitted],
                StatusChange::Decide {
                    status: descriptor.decision_status,
                    reviewed_by: actor.id,
                    reviewed_at: now,
                    rejection_reason: None,
                },
            ),
            WorkflowAction::Reject => (
                &[ResourceStatus::Requested, ResourceStatus::Submitted],
                StatusChange::Decide {
                    status: ResourceStatus::Rejected,
                    reviewed_by: actor.id,
                    reviewed_at: now,
                    rejection_reason: reason,
                },
            ),
            WorkflowAction::Archive => (
                &[
                    ResourceStatus::Approved,
                    ResourceStatus::Rejected,
                    ResourceStatus::Reviewed,
                    ResourceStatus::Completed,
                ],
                StatusChange::Archive { archived_by: actor.id, archived_at: now },
            ),
            WorkflowAction::Submit => {
                return Err(WorkflowError::Forbidden(
                    "submit goes through the submission endpoint".to_string(),
                ))
            }
        };

        // Compare-and-set: exactly one of two concurrent reviewers wins; the
        // loser observes the moved status and reports it.
        let applied = self
            .resources
            .update_status_if(kind, resource_id, expected, change)
            .await?;
        if !applied {
            return Err(self.stale_row_error(kind, resource_id, action).await?);
        }

        let updated = self
            .resources
            .get(kind, resource_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("resource vanished".to_string()))?;

        if action == WorkflowAction::Approve && descriptor.recompute_learning_status {
            self.fire_learning_hook(&updated).await;
        }

        let notify_failed = self
            .dispatch_decision(descriptor, &updated, actor.id, action, reason)
            .await;

        Ok(TransitionOutcome { resource: updated, notify_failed })
    }

    /// Bulk review. Scope is computed once; if ANY ref's subject falls
    /// outside it the whole batch is rejected before any mutation. Rows that
    /// fail their status guard afterwards are reported per id.
    pub async fn review_many(
        &self,
        kind: ResourceKind,
        resource_ids: &[Uuid],
        actor: &Actor,
        action: WorkflowAction,
        reason_raw: Option<&str>,
    ) -> Result<BulkOutcome, WorkflowError> {
        let descriptor = kind.descriptor();
        self.check_reviewer(descriptor, actor, action)?;
        if action == WorkflowAction::Submit {
            return Err(WorkflowError::Forbidden(
                "submit goes through the submission endpoint".to_string(),
            ));
        }

        // Duplicate refs collapse to one application per row; otherwise the
        // second pass would miss its own CAS and report a false skip.
        let mut seen: HashSet<Uuid> = HashSet::with_capacity(resource_ids.len());
        let ids: Vec<Uuid> = resource_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let rows = self.resources.get_many(kind, &ids).await?;
        if rows.len() != ids.len() {
            return Err(WorkflowError::NotFound(
                "one or more resources not found".to_string(),
            ));
        }

        let scope = resolve_scope(actor, self.identities.as_ref(), self.max_tree_depth).await?;
        for row in &rows {
            if !self.in_scope(actor, &scope, row) {
                // No partial silent skipping: the caller must learn an
                // authorization violation occurred.
                return Err(WorkflowError::Forbidden(
                    "batch contains a subject outside your scope".to_string(),
                ));
            }
        }

        let reason = match action {
            WorkflowAction::Reject => {
                Some(reason_raw.map(RejectionReason::normalize).unwrap_or(RejectionReason::Other))
            }
            _ => None,
        };

        let now = Utc::now();
        let mut updated: Vec<Uuid> = Vec::new();
        let mut skipped: Vec<(Uuid, String)> = Vec::new();
        // Subject -> one representative updated row, for per-subject fan-out.
        let mut affected: BTreeMap<Uuid, ApprovableResource> = BTreeMap::new();

        for row in &rows {
            let (expected, change): (&[ResourceStatus], StatusChange) = match action {
                WorkflowAction::Approve => (
                    &[ResourceStatus::Requested, ResourceStatus::Submitted],
                    StatusChange::Decide {
                        status: descriptor.decision_status,
                        reviewed_by: actor.id,
                        reviewed_at: now,
                        rejection_reason: None,
                    },
                ),
                WorkflowAction::Reject => (
                    &[ResourceStatus::Requested, ResourceStatus::Submitted],
                    StatusChange::Decide {
                        status: ResourceStatus::Rejected,
                        reviewed_by: actor.id,
                        reviewed_at: now,
                        rejection_reason: reason,
                    },
                ),
                WorkflowAction::Archive => (
                    &[
                        ResourceStatus::Approved,
                        ResourceStatus::Rejected,
                        ResourceStatus::Reviewed,
                        ResourceStatus::Completed,
                    ],
                    StatusChange::Archive { archived_by: actor.id, archived_at: now },
                ),
                WorkflowAction::Submit => unreachable!("rejected above"),
            };

            let applied = self
                .resources
                .update_status_if(kind, row.id, expected, change)
                .await?;
            if applied {
                updated.push(row.id);
                if let Some(fresh) = self.resources.get(kind, row.id).await? {
                    if action == WorkflowAction::Approve && descriptor.recompute_learning_status {
                        self.fire_learning_hook(&fresh).await;
                    }
                    affected.entry(fresh.subject_user_id).or_insert(fresh);
                }
            } else {
                let why = match self.resources.get(kind, row.id).await? {
                    Some(fresh) => format!("status is '{}'", fresh.status),
                    None => "not found".to_string(),
                };
                skipped.push((row.id, why));
            }
        }

        // One notification per affected subject.
        let mut notify_failed = false;
        for (subject_id, _row) in &affected {
            let failed = self
                .dispatch_decision_to(descriptor, *subject_id, actor.id, action, reason)
                .await;
            notify_failed = notify_failed || failed;
        }

        Ok(BulkOutcome { updated, skipped, notify_failed })
    }

    /// Coach assignment upsert; allowed only when the learner is inside the
    /// actor's scope.
    pub async fn assign_coach(
        &self,
        actor: &Actor,
        user_id: Uuid,
        coach_id: Uuid,
    ) -> Result<(), WorkflowError> {
        self.check_assignment_scope(actor, user_id).await?;
        if self.identities.get(coach_id).await?.is_none() {
            return Err(WorkflowError::NotFound("coach account not found".to_string()));
        }
        self.identities.assign_coach(user_id, coach_id).await?;
        Ok(())
    }

    pub async fn unassign_coach(&self, actor: &Actor, user_id: Uuid) -> Result<(), WorkflowError> {
        self.check_assignment_scope(actor, user_id).await?;
        let removed = self.identities.unassign_coach(user_id).await?;
        if !removed {
            return Err(WorkflowError::NotFound("no coach assignment for user".to_string()));
        }
        Ok(())
    }

    /// Scope-filtered review queue listing.
    pub async fn scope_for(&self, actor: &Actor) -> Result<ScopeSet, WorkflowError> {
        Ok(resolve_scope(actor, self.identities.as_ref(), self.max_tree_depth).await?)
    }

    fn check_reviewer(
        &self,
        descriptor: &KindDescriptor,
        actor: &Actor,
        action: WorkflowAction,
    ) -> Result<(), WorkflowError> {
        let Some(role) = actor.role else {
            return Err(WorkflowError::Forbidden("unrecognized role".to_string()));
        };
        if !descriptor.allows_reviewer(role) {
            return Err(WorkflowError::Forbidden(format!(
                "role '{}' may not review {}",
                role, descriptor.kind
            )));
        }
        if !descriptor.allows_action(action) {
            return Err(WorkflowError::Forbidden(format!(
                "{} is not available for {}",
                action, descriptor.kind
            )));
        }
        Ok(())
    }

    fn check_status(
        &self,
        current: ResourceStatus,
        action: WorkflowAction,
    ) -> Result<(), WorkflowError> {
        match action {
            WorkflowAction::Approve | WorkflowAction::Reject => {
                if current.is_pending() {
                    Ok(())
                } else if current == ResourceStatus::Archived {
                    Err(WorkflowError::AlreadyArchived)
                } else {
                    Err(WorkflowError::AlreadyReviewed)
                }
            }
            WorkflowAction::Archive => {
                if current.is_decided() {
                    Ok(())
                } else if current == ResourceStatus::Archived {
                    Err(WorkflowError::AlreadyArchived)
                } else {
                    Err(WorkflowError::IllegalTransition {
                        from: current.as_str().to_string(),
                        action,
                    })
                }
            }
            WorkflowAction::Submit => Ok(()),
        }
    }

    async fn check_scope(
        &self,
        actor: &Actor,
        resource: &ApprovableResource,
    ) -> Result<(), WorkflowError> {
        // Fast path: the relationship captured at creation time.
        if resource.owner_leader_id == Some(actor.id) {
            return Ok(());
        }
        let scope = resolve_scope(actor, self.identities.as_ref(), self.max_tree_depth).await?;
        if scope.contains(resource.subject_user_id) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden("subject is outside your scope".to_string()))
        }
    }

    fn in_scope(&self, actor: &Actor, scope: &ScopeSet, resource: &ApprovableResource) -> bool {
        resource.owner_leader_id == Some(actor.id) || scope.contains(resource.subject_user_id)
    }

    async fn check_assignment_scope(
        &self,
        actor: &Actor,
        user_id: Uuid,
    ) -> Result<(), WorkflowError> {
        let scope = resolve_scope(actor, self.identities.as_ref(), self.max_tree_depth).await?;
        if scope.contains(user_id) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden("learner is outside your scope".to_string()))
        }
    }

    /// Re-read a row after a CAS miss and turn its fresh status into the
    /// error the caller should see.
    async fn stale_row_error(
        &self,
        kind: ResourceKind,
        id: Uuid,
        action: WorkflowAction,
    ) -> Result<WorkflowError, WorkflowError> {
        let fresh = self.resources.get(kind, id).await?;
        Ok(match fresh.as_ref().and_then(|r| r.parsed_status()) {
            Some(ResourceStatus::Archived) => WorkflowError::AlreadyArchived,
            Some(s) if s.is_decided() => WorkflowError::AlreadyReviewed,
            Some(s) => WorkflowError::IllegalTransition { from: s.as_str().to_string(), action },
            None => WorkflowError::NotFound("resource not found".to_string()),
        })
    }

    async fn fire_learning_hook(&self, resource: &ApprovableResource) {
        let Ok(lesson) = resource.resource_key.trim().parse::<i32>() else {
            return;
        };
        // Own failure domain: the approval is committed regardless.
        if let Err(e) = self
            .learning
            .course_access_granted(resource.subject_user_id, lesson)
            .await
        {
            tracing::warn!(
                subject = %resource.subject_user_id,
                lesson,
                "learning-status recomputation failed: {}",
                e
            );
        }
    }

    async fn dispatch_decision(
        &self,
        descriptor: &KindDescriptor,
        resource: &ApprovableResource,
        reviewer_id: Uuid,
        action: WorkflowAction,
        reason: Option<RejectionReason>,
    ) -> bool {
        self.dispatch_decision_to(descriptor, resource.subject_user_id, reviewer_id, action, reason)
            .await
    }

    async fn dispatch_decision_to(
        &self,
        descriptor: &KindDescriptor,
        subject_id: Uuid,
        reviewer_id: Uuid,
        action: WorkflowAction,
        reason: Option<RejectionReason>,
    ) -> bool {
        let result = match action {
            WorkflowAction::Reject => {
                self.dispatcher
                    .on_decision(descriptor, subject_id, reviewer_id, false, reason)
                    .await
            }
            _ => {
                self.dispatcher
                    .on_decision(descriptor, subject_id, reviewer_id, true, None)
                    .await
            }
        };
        match result {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!(
                    kind = %descriptor.kind,
                    subject = %subject_id,
                    "decision notification failed: {}",
                    e
                );
                true
            }
        }
    }
}
