// Postgres implementation of the store traits.
//
// Expected tables (provisioned by the deployment's schema templates, not
// managed here):
//   identities        (id uuid pk, name text, role text, leader_id uuid null,
//                      created_by uuid null, status text,
//                      created_at timestamptz, updated_at timestamptz)
//   coach_assignments (assigned_user_id uuid pk, coach_id uuid,
//                      created_at timestamptz)
//   resources         (id uuid pk, kind text, subject_user_id uuid,
//                      owner_leader_id uuid null, resource_key text,
//                      bucket text null, path text null, status text,
//                      reviewed_by uuid null, reviewed_at timestamptz null,
//                      rejection_reason text null, archived_by uuid null,
//                      archived_at timestamptz null,
//                      created_at timestamptz, updated_at timestamptz,
//                      unique (kind, subject_user_id, resource_key))
//   notifications     (id uuid pk, to_user_id uuid, from_user_id uuid null,
//                      title text, content text, created_at timestamptz,
//                      read_at timestamptz null)
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
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

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using DATABASE_URL.
    pub async fn connect() -> Result<Self, StoreError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::QueryError("DATABASE_URL is not set".to_string()))?;
        let pool = PgPoolOptions::new().connect(&url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PostgresStore {
    async fn get(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, Identity>(
            "SELECT id, name, role, leader_id, created_by, status, created_at, updated_at
             FROM identities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn children_of(&self, leader_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM identities WHERE leader_id = $1 AND status <> 'deleted'",
        )
        .bind(leader_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn coached_by(&self, coach_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT assigned_user_id FROM coach_assignments WHERE coach_id = $1",
        )
        .bind(coach_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn coach_of(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT coach_id FROM coach_assignments WHERE assigned_user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn created_by(
        &self,
        assistant_id: Uuid,
        leader_id: Option<Uuid>,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM identities
             WHERE created_by = $1
               AND status <> 'deleted'
               AND ($2::uuid IS NULL OR leader_id = $2)",
        )
        .bind(assistant_id)
        .bind(leader_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn super_admin_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM identities WHERE role = 'super_admin' AND status = 'active'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn assign_coach(&self, user_id: Uuid, coach_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO coach_assignments (assigned_user_id, coach_id, created_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (assigned_user_id)
             DO UPDATE SET coach_id = EXCLUDED.coach_id, created_at = EXCLUDED.created_at",
        )
        .bind(user_id)
        .bind(coach_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unassign_coach(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM coach_assignments WHERE assigned_user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

const RESOURCE_COLUMNS: &str = "id, kind, subject_user_id, owner_leader_id, resource_key, \
     bucket, path, status, reviewed_by, reviewed_at, rejection_reason, archived_by, \
     archived_at, created_at, updated_at";

#[async_trait]
impl ResourceStore for PostgresStore {
    async fn get(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ApprovableResource>, StoreError> {
        let sql = format!("SELECT {} FROM resources WHERE id = $1 AND kind = $2", RESOURCE_COLUMNS);
        let row = sqlx::query_as::<_, ApprovableResource>(&sql)
            .bind(id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_many(
        &self,
        kind: ResourceKind,
        ids: &[Uuid],
    ) -> Result<Vec<ApprovableResource>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {} FROM resources WHERE id = ANY($1) AND kind = $2",
            RESOURCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApprovableResource>(&sql)
            .bind(ids)
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_key(
        &self,
        kind: ResourceKind,
        subject: Uuid,
        resource_key: &str,
    ) -> Result<Option<ApprovableResource>, StoreError> {
        let sql = format!(
            "SELECT {} FROM resources
             WHERE kind = $1 AND subject_user_id = $2 AND resource_key = $3",
            RESOURCE_COLUMNS
        );
        let row = sqlx::query_as::<_, ApprovableResource>(&sql)
            .bind(kind.as_str())
            .bind(subject)
            .bind(resource_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, resource: &ApprovableResource) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO resources
               (id, kind, subject_user_id, owner_leader_id, resource_key, bucket, path,
                status, reviewed_by, reviewed_at, rejection_reason, archived_by,
                archived_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(resource.id)
        .bind(&resource.kind)
        .bind(resource.subject_user_id)
        .bind(resource.owner_leader_id)
        .bind(&resource.resource_key)
        .bind(&resource.bucket)
        .bind(&resource.path)
        .bind(&resource.status)
        .bind(resource.reviewed_by)
        .bind(resource.reviewed_at)
        .bind(&resource.rejection_reason)
        .bind(resource.archived_by)
        .bind(resource.archived_at)
        .bind(resource.created_at)
        .bind(resource.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status_if(
        &self,
        kind: ResourceKind,
        id: Uuid,
        expected: &[ResourceStatus],
        change: StatusChange,
    ) -> Result<bool, StoreError> {
        // Row-level compare-and-set: the status guard lives in the WHERE
        // clause, so concurrent reviewers cannot both apply.
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();
        let now = Utc::now();

        let result = match change {
            StatusChange::Reopen { status } => {
                sqlx::query(
                    "UPDATE resources
                     SET status = $1, reviewed_by = NULL, reviewed_at = NULL,
                         rejection_reason = NULL, updated_at = $2
                     WHERE id = $3 AND kind = $4 AND status = ANY($5)",
                )
                .bind(status.as_str())
                .bind(now)
                .bind(id)
                .bind(kind.as_str())
                .bind(&expected)
                .execute(&self.pool)
                .await?
            }
            StatusChange::Decide { status, reviewed_by, reviewed_at, rejection_reason } => {
                sqlx::query(
                    "UPDATE resources
                     SET status = $1, reviewed_by = $2, reviewed_at = $3,
                         rejection_reason = $4, updated_at = $5
                     WHERE id = $6 AND kind = $7 AND status = ANY($8)",
                )
                .bind(status.as_str())
                .bind(reviewed_by)
                .bind(reviewed_at)
                .bind(rejection_reason.map(|r| r.as_str()))
                .bind(now)
                .bind(id)
                .bind(kind.as_str())
                .bind(&expected)
                .execute(&self.pool)
                .await?
            }
            StatusChange::Archive { archived_by, archived_at } => {
                sqlx::query(
                    "UPDATE resources
                     SET status = 'archived', archived_by = $1, archived_at = $2,
                         updated_at = $3
                     WHERE id = $4 AND kind = $5 AND status = ANY($6)",
                )
                .bind(archived_by)
                .bind(archived_at)
                .bind(now)
                .bind(id)
                .bind(kind.as_str())
                .bind(&expected)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ResourceFilter,
    ) -> Result<Vec<ApprovableResource>, StoreError> {
        let sql = format!(
            "SELECT {} FROM resources
             WHERE kind = $1
               AND ($2::uuid[] IS NULL OR subject_user_id = ANY($2))
               AND ($3::text IS NULL OR status = $3)
               AND ($4::uuid IS NULL OR subject_user_id = $4)
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6",
            RESOURCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApprovableResource>(&sql)
            .bind(kind.as_str())
            .bind(&filter.scope)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.subject)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(
        &self,
        kind: ResourceKind,
        filter: &ResourceFilter,
    ) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM resources
             WHERE kind = $1
               AND ($2::uuid[] IS NULL OR subject_user_id = ANY($2))
               AND ($3::text IS NULL OR status = $3)
               AND ($4::uuid IS NULL OR subject_user_id = $4)",
        )
        .bind(kind.as_str())
        .bind(&filter.scope)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.subject)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    async fn has_submission(
        &self,
        kind: ResourceKind,
        subject: Uuid,
        resource_key: &str,
    ) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (
               SELECT 1 FROM resources
               WHERE kind = $1 AND subject_user_id = $2 AND resource_key = $3
                 AND status NOT IN ('rejected', 'archived')
             )",
        )
        .bind(kind.as_str())
        .bind(subject)
        .bind(resource_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert_many(&self, notifications: &[NewNotification]) -> Result<(), StoreError> {
        // Small batches (a handful of reviewers); one insert per row inside a
        // transaction keeps this simple.
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        for n in notifications {
            sqlx::query(
                "INSERT INTO notifications
                   (id, to_user_id, from_user_id, title, content, created_at, read_at)
                 VALUES ($1, $2, $3, $4, $5, $6, NULL)",
            )
            .bind(Uuid::new_v4())
            .bind(n.to_user_id)
            .bind(n.from_user_id)
            .bind(&n.title)
            .bind(&n.content)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_for(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT id, to_user_id, from_user_id, title, content, created_at, read_at
             FROM notifications
             WHERE to_user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications
             SET read_at = COALESCE(read_at, $1)
             WHERE id = $2 AND to_user_id = $3",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
