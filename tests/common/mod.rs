#![allow(dead_code)]
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use academy_api_rust::identity::Identity;
use academy_api_rust::learning::{LearningStatusHook, NoopLearningStatus};
use academy_api_rust::scope::Actor;
use academy_api_rust::store::memory::MemoryStore;
use academy_api_rust::workflow::engine::{ApprovalEngine, SubmitPayload};

pub const MAX_TREE_DEPTH: u32 = 16;

/// Build an active identity row for fixtures.
pub fn identity(
    name: &str,
    role: &str,
    leader_id: Option<Uuid>,
    created_by: Option<Uuid>,
) -> Identity {
    let now = Utc::now();
    Identity {
        id: Uuid::new_v4(),
        name: name.to_string(),
        role: role.to_string(),
        leader_id,
        created_by,
        status: "active".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn actor_of(identity: &Identity) -> Actor {
    Actor {
        id: identity.id,
        role: identity.parsed_role(),
        leader_id: identity.leader_id,
    }
}

pub fn engine(store: &Arc<MemoryStore>) -> ApprovalEngine {
    engine_with_hook(store, Arc::new(NoopLearningStatus))
}

pub fn engine_with_hook(
    store: &Arc<MemoryStore>,
    hook: Arc<dyn LearningStatusHook>,
) -> ApprovalEngine {
    ApprovalEngine::new(store.clone(), store.clone(), store.clone(), hook, MAX_TREE_DEPTH)
}

pub fn payload(key: &str) -> SubmitPayload {
    SubmitPayload { resource_key: key.to_string(), bucket: None, path: None }
}

/// A small org: leader L1 -> sub-leader L2 -> student S, with coach C
/// assigned to S and assistant A (under L2) who provisioned S.
pub struct Org {
    pub store: Arc<MemoryStore>,
    pub l1: Identity,
    pub l2: Identity,
    pub student: Identity,
    pub coach: Identity,
    pub assistant: Identity,
    pub admin: Identity,
}

pub async fn org() -> Org {
    let store = Arc::new(MemoryStore::new());

    let l1 = identity("L1", "leader", None, None);
    let l2 = identity("L2", "leader", Some(l1.id), None);
    let assistant = identity("A", "assistant", Some(l2.id), None);
    let student = identity("S", "student", Some(l2.id), Some(assistant.id));
    let coach = identity("C", "coach", None, None);
    let admin = identity("root", "super_admin", None, None);

    for row in [&l1, &l2, &assistant, &student, &coach, &admin] {
        store.put_identity(row.clone());
    }
    use academy_api_rust::store::IdentityStore;
    store.assign_coach(student.id, coach.id).await.unwrap();

    Org { store, l1, l2, student, coach, assistant, admin }
}
