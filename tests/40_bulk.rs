mod common;

use academy_api_rust::store::{NotificationStore, ResourceStore};
use academy_api_rust::workflow::engine::WorkflowError;
use academy_api_rust::workflow::kind::ResourceKind;
use academy_api_rust::workflow::status::WorkflowAction;

use common::{actor_of, engine, identity, org, payload};

#[tokio::test]
async fn bulk_approve_updates_every_row_and_notifies_per_subject() {
    let org = org().await;
    let engine = engine(&org.store);
    let s2 = identity("S2", "student", Some(org.l2.id), None);
    org.store.put_identity(s2.clone());

    let mut ids = Vec::new();
    for key in ["w1", "w2"] {
        let o = engine
            .submit(ResourceKind::WeeklySummary, &actor_of(&org.student), org.student.id, payload(key))
            .await
            .unwrap();
        ids.push(o.resource.id);
    }
    let o = engine
        .submit(ResourceKind::WeeklySummary, &actor_of(&s2), s2.id, payload("w1"))
        .await
        .unwrap();
    ids.push(o.resource.id);

    let student_inbox_before = org.store.list_for(org.student.id, 50, 0).await.unwrap().len();

    let outcome = engine
        .review_many(ResourceKind::WeeklySummary, &ids, &actor_of(&org.l2), WorkflowAction::Approve, None)
        .await
        .unwrap();

    assert_eq!(outcome.updated.len(), 3);
    assert!(outcome.skipped.is_empty());
    for id in &ids {
        let row = org.store.get(ResourceKind::WeeklySummary, *id).await.unwrap().unwrap();
        assert_eq!(row.status, "approved");
        assert_eq!(row.reviewed_by, Some(org.l2.id));
    }

    // One decision notification per subject, not per row.
    let student_inbox = org.store.list_for(org.student.id, 50, 0).await.unwrap();
    assert_eq!(student_inbox.len() - student_inbox_before, 1);
    assert_eq!(org.store.list_for(s2.id, 50, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn one_out_of_scope_ref_rejects_the_whole_batch() {
    let org = org().await;
    let engine = engine(&org.store);
    // A learner in a foreign org.
    let foreign_leader = identity("FL", "leader", None, None);
    let foreign = identity("F", "student", Some(foreign_leader.id), None);
    org.store.put_identity(foreign_leader.clone());
    org.store.put_identity(foreign.clone());

    let mine = engine
        .submit(ResourceKind::WeeklySummary, &actor_of(&org.student), org.student.id, payload("w1"))
        .await
        .unwrap();
    let theirs = engine
        .submit(ResourceKind::WeeklySummary, &actor_of(&foreign), foreign.id, payload("w1"))
        .await
        .unwrap();

    let err = engine
        .review_many(
            ResourceKind::WeeklySummary,
            &[mine.resource.id, theirs.resource.id],
            &actor_of(&org.l2),
            WorkflowAction::Approve,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));

    // Nothing was mutated, not even the in-scope row.
    let row = org.store.get(ResourceKind::WeeklySummary, mine.resource.id).await.unwrap().unwrap();
    assert_eq!(row.status, "submitted");
}

#[tokio::test]
async fn unknown_id_in_the_batch_is_not_found() {
    let org = org().await;
    let engine = engine(&org.store);

    let mine = engine
        .submit(ResourceKind::WeeklySummary, &actor_of(&org.student), org.student.id, payload("w1"))
        .await
        .unwrap();

    let err = engine
        .review_many(
            ResourceKind::WeeklySummary,
            &[mine.resource.id, uuid::Uuid::new_v4()],
            &actor_of(&org.l2),
            WorkflowAction::Approve,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_ids_in_a_batch_apply_once() {
    let org = org().await;
    let engine = engine(&org.store);

    let mine = engine
        .submit(ResourceKind::WeeklySummary, &actor_of(&org.student), org.student.id, payload("w1"))
        .await
        .unwrap();
    let id = mine.resource.id;

    let outcome = engine
        .review_many(
            ResourceKind::WeeklySummary,
            &[id, id],
            &actor_of(&org.l2),
            WorkflowAction::Approve,
            None,
        )
        .await
        .unwrap();

    // One row, one effect: never both updated and skipped.
    assert_eq!(outcome.updated, vec![id]);
    assert!(outcome.skipped.is_empty());

    let row = org.store.get(ResourceKind::WeeklySummary, id).await.unwrap().unwrap();
    assert_eq!(row.status, "approved");
}

#[tokio::test]
async fn already_decided_rows_are_skipped_with_a_reason() {
    let org = org().await;
    let engine = engine(&org.store);

    let a = engine
        .submit(ResourceKind::WeeklySummary, &actor_of(&org.student), org.student.id, payload("w1"))
        .await
        .unwrap();
    let b = engine
        .submit(ResourceKind::WeeklySummary, &actor_of(&org.student), org.student.id, payload("w2"))
        .await
        .unwrap();
    engine
        .review(ResourceKind::WeeklySummary, a.resource.id, &actor_of(&org.coach), WorkflowAction::Approve, None)
        .await
        .unwrap();

    let outcome = engine
        .review_many(
            ResourceKind::WeeklySummary,
            &[a.resource.id, b.resource.id],
            &actor_of(&org.l2),
            WorkflowAction::Reject,
            Some("below_standard"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.updated, vec![b.resource.id]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].0, a.resource.id);
    assert!(outcome.skipped[0].1.contains("approved"));

    let row = org.store.get(ResourceKind::WeeklySummary, b.resource.id).await.unwrap().unwrap();
    assert_eq!(row.status, "rejected");
    assert_eq!(row.rejection_reason.as_deref(), Some("below_standard"));
}
