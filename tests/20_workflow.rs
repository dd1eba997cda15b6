mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use academy_api_rust::learning::LearningStatusHook;
use academy_api_rust::store::ResourceStore;
use academy_api_rust::workflow::engine::WorkflowError;
use academy_api_rust::workflow::kind::ResourceKind;
use academy_api_rust::workflow::status::{RejectionReason, WorkflowAction};

use common::{actor_of, engine, engine_with_hook, org, payload};

#[tokio::test]
async fn submit_creates_pending_resource() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.resource.status, "submitted");
    assert_eq!(outcome.resource.subject_user_id, org.student.id);
    // owner_leader_id denormalized from the subject's leader at creation.
    assert_eq!(outcome.resource.owner_leader_id, Some(org.l2.id));
    assert!(!outcome.notify_failed);
}

#[tokio::test]
async fn out_of_scope_reviewer_is_forbidden_and_nothing_mutates() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();
    let id = outcome.resource.id;

    // A coach with no assignment to this student.
    let other_coach = common::identity("C2", "coach", None, None);
    org.store.put_identity(other_coach.clone());

    let err = engine
        .review(
            ResourceKind::WeeklySummary,
            id,
            &actor_of(&other_coach),
            WorkflowAction::Approve,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));

    let row = org.store.get(ResourceKind::WeeklySummary, id).await.unwrap().unwrap();
    assert_eq!(row.status, "submitted");
    assert!(row.reviewed_by.is_none());
}

#[tokio::test]
async fn wrong_role_is_rejected_before_scope() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::CourseAccess,
            &actor_of(&org.student),
            org.student.id,
            payload("1"),
        )
        .await
        .unwrap();

    // The coach is in scope for the student but may not review course access.
    let err = engine
        .review(
            ResourceKind::CourseAccess,
            outcome.resource.id,
            &actor_of(&org.coach),
            WorkflowAction::Approve,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));
}

#[tokio::test]
async fn approve_stamps_review_fields() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();

    let reviewed = engine
        .review(
            ResourceKind::WeeklySummary,
            outcome.resource.id,
            &actor_of(&org.coach),
            WorkflowAction::Approve,
            None,
        )
        .await
        .unwrap();

    assert_eq!(reviewed.resource.status, "approved");
    assert_eq!(reviewed.resource.reviewed_by, Some(org.coach.id));
    assert!(reviewed.resource.reviewed_at.is_some());
    assert!(reviewed.resource.rejection_reason.is_none());
}

#[tokio::test]
async fn reject_then_resubmit_clears_review_metadata() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();
    let id = outcome.resource.id;

    let rejected = engine
        .review(
            ResourceKind::WeeklySummary,
            id,
            &actor_of(&org.coach),
            WorkflowAction::Reject,
            Some("资料不完整"),
        )
        .await
        .unwrap();
    assert_eq!(rejected.resource.status, "rejected");
    assert_eq!(rejected.resource.rejection_reason.as_deref(), Some("incomplete_materials"));
    assert_eq!(rejected.resource.parsed_reason(), Some(RejectionReason::IncompleteMaterials));

    let resubmitted = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();

    assert_eq!(resubmitted.resource.id, id);
    assert_eq!(resubmitted.resource.status, "submitted");
    assert!(resubmitted.resource.rejection_reason.is_none());
    assert!(resubmitted.resource.reviewed_at.is_none());
    assert!(resubmitted.resource.reviewed_by.is_none());
}

#[tokio::test]
async fn free_text_rejection_reason_collapses_to_other() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::ClassicTrade,
            &actor_of(&org.student),
            org.student.id,
            payload("entry-1"),
        )
        .await
        .unwrap();

    let rejected = engine
        .review(
            ResourceKind::ClassicTrade,
            outcome.resource.id,
            &actor_of(&org.l2),
            WorkflowAction::Reject,
            Some("banana"),
        )
        .await
        .unwrap();

    assert_eq!(rejected.resource.rejection_reason.as_deref(), Some("other"));
}

#[tokio::test]
async fn resubmit_while_pending_is_idempotent() {
    let org = org().await;
    let engine = engine(&org.store);

    let first = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();
    let notifications_after_first = org.store.notification_count();

    let second = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();

    assert_eq!(first.resource.id, second.resource.id);
    // No duplicate row and no duplicate fan-out.
    assert_eq!(org.store.notification_count(), notifications_after_first);
}

#[tokio::test]
async fn submit_over_a_decided_item_never_overwrites() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();
    engine
        .review(
            ResourceKind::WeeklySummary,
            outcome.resource.id,
            &actor_of(&org.coach),
            WorkflowAction::Approve,
            None,
        )
        .await
        .unwrap();

    let err = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyReviewed));

    let row = org
        .store
        .get(ResourceKind::WeeklySummary, outcome.resource.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "approved");
}

#[tokio::test]
async fn double_review_reports_already_reviewed() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            org.student.id,
            payload("2026-W30"),
        )
        .await
        .unwrap();
    let id = outcome.resource.id;

    engine
        .review(ResourceKind::WeeklySummary, id, &actor_of(&org.coach), WorkflowAction::Approve, None)
        .await
        .unwrap();

    let err = engine
        .review(ResourceKind::WeeklySummary, id, &actor_of(&org.l2), WorkflowAction::Reject, Some("其他"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyReviewed));
}

#[tokio::test]
async fn archive_only_from_resolved_status_and_only_once() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::TradeSubmission,
            &actor_of(&org.student),
            org.student.id,
            payload("trade-1"),
        )
        .await
        .unwrap();
    let id = outcome.resource.id;

    // Archiving a pending item is an illegal transition.
    let err = engine
        .review(ResourceKind::TradeSubmission, id, &actor_of(&org.coach), WorkflowAction::Archive, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalTransition { .. }));

    engine
        .review(ResourceKind::TradeSubmission, id, &actor_of(&org.coach), WorkflowAction::Approve, None)
        .await
        .unwrap();
    let archived = engine
        .review(ResourceKind::TradeSubmission, id, &actor_of(&org.coach), WorkflowAction::Archive, None)
        .await
        .unwrap();
    assert_eq!(archived.resource.status, "archived");
    assert!(archived.resource.archived_at.is_some());

    // Terminal: nothing more is legal.
    let err = engine
        .review(ResourceKind::TradeSubmission, id, &actor_of(&org.coach), WorkflowAction::Archive, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyArchived));
}

#[tokio::test]
async fn reject_is_not_available_for_trade_submissions() {
    let org = org().await;
    let engine = engine(&org.store);

    let outcome = engine
        .submit(
            ResourceKind::TradeSubmission,
            &actor_of(&org.student),
            org.student.id,
            payload("trade-1"),
        )
        .await
        .unwrap();

    let err = engine
        .review(
            ResourceKind::TradeSubmission,
            outcome.resource.id,
            &actor_of(&org.coach),
            WorkflowAction::Reject,
            Some("other"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));
}

#[tokio::test]
async fn learner_cannot_submit_for_someone_else() {
    let org = org().await;
    let engine = engine(&org.store);
    let other = common::identity("S2", "student", Some(org.l2.id), None);
    org.store.put_identity(other.clone());

    let err = engine
        .submit(
            ResourceKind::WeeklySummary,
            &actor_of(&org.student),
            other.id,
            payload("2026-W30"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));
}

struct CountingHook {
    calls: AtomicU32,
}

#[async_trait]
impl LearningStatusHook for CountingHook {
    async fn course_access_granted(&self, _subject_id: Uuid, _lesson: i32) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn concurrent_approvals_apply_exactly_once() {
    let org = org().await;
    let hook = Arc::new(CountingHook { calls: AtomicU32::new(0) });
    let engine = Arc::new(engine_with_hook(&org.store, hook.clone()));

    let outcome = engine
        .submit(
            ResourceKind::CourseAccess,
            &actor_of(&org.student),
            org.student.id,
            payload("1"),
        )
        .await
        .unwrap();
    let id = outcome.resource.id;
    let notifications_before = org.store.notification_count();

    let a = {
        let engine = engine.clone();
        let actor = actor_of(&org.l2);
        tokio::spawn(async move {
            engine.review(ResourceKind::CourseAccess, id, &actor, WorkflowAction::Approve, None).await
        })
    };
    let b = {
        let engine = engine.clone();
        let actor = actor_of(&org.l1);
        tokio::spawn(async move {
            engine.review(ResourceKind::CourseAccess, id, &actor, WorkflowAction::Approve, None).await
        })
    };

    let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one approve wins");
    let loser = if ra.is_ok() { rb } else { ra };
    assert!(matches!(loser.unwrap_err(), WorkflowError::AlreadyReviewed));

    // Status moved once, side effects fired once.
    let row = org.store.get(ResourceKind::CourseAccess, id).await.unwrap().unwrap();
    assert_eq!(row.status, "approved");
    assert!(row.reviewed_at.is_some());
    assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    assert_eq!(org.store.notification_count(), notifications_before + 1);
}
