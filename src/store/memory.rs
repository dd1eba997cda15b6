// In-memory store with the same compare-and-set semantics as the Postgres
// implementation. Deterministic collaborator for tests and local runs.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::identity::Identity;
use crate::notify::Notification;
use crate::store::{
    IdentityStore, NewNotification, NotificationStore, ResourceFilter, ResourceStore,
    StatusChange, StoreError,
};
use crate::workflow::kind::ResourceKind;
use crate::workflow::resource::ApprovableResource;
use crate::workflow::status::ResourceStatus;

#[derive(Default)]
struct Inner {
    identities: HashMap<Uuid, Identity>,
    coach_assignments: HashMap<Uuid, Uuid>,
    resources: HashMap<Uuid, ApprovableResource>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test fixture helper: insert or replace an identity row.
    pub fn put_identity(&self, identity: Identity) {
        let mut inner = self.inner.lock().unwrap();
        inner.identities.insert(identity.id, identity);
    }

    /// Test fixture helper: place a resource row directly.
    pub fn put_resource(&self, resource: ApprovableResource) {
        let mut inner = self.inner.lock().unwrap();
        inner.resources.insert(resource.id, resource);
    }

    pub fn notification_count(&self) -> usize {
        self.inner.lock().unwrap().notifications.len()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.inner.lock().unwrap().identities.get(&id).cloned())
    }

    async fn children_of(&self, leader_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .identities
            .values()
            .filter(|i| i.leader_id == Some(leader_id))
            .map(|i| i.id)
            .collect())
    }

    async fn coached_by(&self, coach_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .coach_assignments
            .iter()
            .filter(|(_, c)| **c == coach_id)
            .map(|(u, _)| *u)
            .collect())
    }

    async fn coach_of(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self.inner.lock().unwrap().coach_assignments.get(&user_id).copied())
    }

    async fn created_by(
        &self,
        assistant_id: Uuid,
        leader_id: Option<Uuid>,
    ) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .identities
            .values()
            .filter(|i| i.created_by == Some(assistant_id))
            .filter(|i| leader_id.is_none() || i.leader_id == leader_id)
            .map(|i| i.id)
            .collect())
    }

    async fn super_admin_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .identities
            .values()
            .filter(|i| i.role == "super_admin")
            .map(|i| i.id)
            .collect())
    }

    async fn assign_coach(&self, user_id: Uuid, coach_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.coach_assignments.insert(user_id, coach_id);
        Ok(())
    }

    async fn unassign_coach(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.coach_assignments.remove(&user_id).is_some())
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ApprovableResource>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .resources
            .get(&id)
            .filter(|r| r.kind == kind.as_str())
            .cloned())
    }

    async fn get_many(
        &self,
        kind: ResourceKind,
        ids: &[Uuid],
    ) -> Result<Vec<ApprovableResource>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.resources.get(id))
            .filter(|r| r.kind == kind.as_str())
            .cloned()
            .collect())
    }

    async fn find_by_key(
        &self,
        kind: ResourceKind,
        subject: Uuid,
        resource_key: &str,
    ) -> Result<Option<ApprovableResource>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .resources
            .values()
            .find(|r| {
                r.kind == kind.as_str()
                    && r.subject_user_id == subject
                    && r.resource_key == resource_key
            })
            .cloned())
    }

    async fn insert(&self, resource: &ApprovableResource) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.resources.insert(resource.id, resource.clone());
        Ok(())
    }

    async fn update_status_if(
        &self,
        kind: ResourceKind,
        id: Uuid,
        expected: &[ResourceStatus],
        change: StatusChange,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(row) = inner.resources.get_mut(&id) else {
            return Ok(false);
        };
        if row.kind != kind.as_str() {
            return Ok(false);
        }
        let guard_holds = row
            .parsed_status()
            .map(|s| expected.contains(&s))
            .unwrap_or(false);
        if !guard_holds {
            return Ok(false);
        }

        match change {
            StatusChange::Reopen { status } => {
                row.status = status.as_str().to_string();
                row.reviewed_by = None;
                row.reviewed_at = None;
                row.rejection_reason = None;
            }
            StatusChange::Decide { status, reviewed_by, reviewed_at, rejection_reason } => {
                row.status = status.as_str().to_string();
                row.reviewed_by = Some(reviewed_by);
                row.reviewed_at = Some(reviewed_at);
                row.rejection_reason = rejection_reason.map(|r| r.as_str().to_string());
            }
            StatusChange::Archive { archived_by, archived_at } => {
                row.status = ResourceStatus::Archived.as_str().to_string();
                row.archived_by = Some(archived_by);
                row.archived_at = Some(archived_at);
            }
        }
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ResourceFilter,
    ) -> Result<Vec<ApprovableResource>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<ApprovableResource> = inner
            .resources
            .values()
            .filter(|r| r.kind == kind.as_str())
            .filter(|r| match &filter.scope {
                None => true,
                Some(ids) => ids.contains(&r.subject_user_id),
            })
            .filter(|r| match filter.status {
                None => true,
                Some(s) => r.status == s.as_str(),
            })
            .filter(|r| match filter.subject {
                None => true,
                Some(s) => r.subject_user_id == s,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.offset.max(0) as usize;
        let limit = filter.limit.max(0) as usize;
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(
        &self,
        kind: ResourceKind,
        filter: &ResourceFilter,
    ) -> Result<i64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .resources
            .values()
            .filter(|r| r.kind == kind.as_str())
            .filter(|r| match &filter.scope {
                None => true,
                Some(ids) => ids.contains(&r.subject_user_id),
            })
            .filter(|r| match filter.status {
                None => true,
                Some(s) => r.status == s.as_str(),
            })
            .filter(|r| match filter.subject {
                None => true,
                Some(s) => r.subject_user_id == s,
            })
            .count() as i64)
    }

    async fn has_submission(
        &self,
        kind: ResourceKind,
        subject: Uuid,
        resource_key: &str,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.resources.values().any(|r| {
            r.kind == kind.as_str()
                && r.subject_user_id == subject
                && r.resource_key == resource_key
                && r.parsed_status()
                    .map(|s| s != ResourceStatus::Rejected && s != ResourceStatus::Archived)
                    .unwrap_or(false)
        }))
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_many(&self, notifications: &[NewNotification]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        for n in notifications {
            inner.notifications.push(Notification {
                id: Uuid::new_v4(),
                to_user_id: n.to_user_id,
                from_user_id: n.from_user_id,
                title: n.title.clone(),
                content: n.content.clone(),
                created_at: now,
                read_at: None,
            });
        }
        Ok(())
    }

    async fn list_for(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.to_user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for n in inner.notifications.iter_mut() {
            if n.id == id && n.to_user_id == user_id {
                if n.read_at.is_none() {
                    n.read_at = Some(Utc::now());
                }
                return Ok(true);
            }
        }
        Ok(false)
    }
}
