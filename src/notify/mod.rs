// Notification records and the fan-out dispatcher. Notifications are
// append-only: nothing is ever mutated after insert except read_at.
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::store::{IdentityStore, NewNotification, NotificationStore, StoreError};
use crate::workflow::kind::KindDescriptor;
use crate::workflow::status::RejectionReason;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub to_user_id: Uuid,
    /// None for system-generated messages.
    pub from_user_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification store failure: {0}")]
    Store(#[from] StoreError),
}

/// Fans out notification records on workflow transitions. Delivery is
/// fire-and-forget relative to the state transition: the engine logs a
/// failure and reports it as a partial failure, never as a rollback.
pub struct NotificationDispatcher {
    identities: Arc<dyn IdentityStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl NotificationDispatcher {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self { identities, notifications }
    }

    /// Submission fan-out: every reviewer whose scope would contain the
    /// submitter. In practice that is the direct leader, the assigned coach
    /// (for coach-relevant kinds), the provisioning assistant and all
    /// super-admins. Recipients are deduplicated and the submitter excluded.
    pub async fn on_submission(
        &self,
        descriptor: &KindDescriptor,
        subject_id: Uuid,
        subject_name: &str,
    ) -> Result<usize, NotifyError> {
        // BTreeSet gives dedup plus a stable insert order.
        let mut recipients: BTreeSet<Uuid> = BTreeSet::new();

        if let Some(subject) = self.identities.get(subject_id).await? {
            if let Some(leader_id) = subject.leader_id {
                recipients.insert(leader_id);
            }
            if let Some(assistant_id) = subject.created_by {
                recipients.insert(assistant_id);
            }
        }
        if descriptor.coach_relevant {
            if let Some(coach_id) = self.identities.coach_of(subject_id).await? {
                recipients.insert(coach_id);
            }
        }
        for admin_id in self.identities.super_admin_ids().await? {
            recipients.insert(admin_id);
        }
        recipients.remove(&subject_id);

        let title = format!("新的{}待审核 / New {} pending review", descriptor.labels.zh, descriptor.labels.en);
        let content = format!(
            "{} 提交了{}，请及时审核。/ {} submitted a {}; please review.",
            subject_name, descriptor.labels.zh, subject_name, descriptor.labels.en
        );

        let batch: Vec<NewNotification> = recipients
            .into_iter()
            .map(|to| NewNotification {
                to_user_id: to,
                from_user_id: Some(subject_id),
                title: title.clone(),
                content: content.clone(),
            })
            .collect();

        if !batch.is_empty() {
            self.notifications.insert_many(&batch).await?;
        }
        Ok(batch.len())
    }

    /// Decision fan-out: exactly the subject learner, bilingual copy with the
    /// decision and, for rejections, the normalized reason.
    pub async fn on_decision(
        &self,
        descriptor: &KindDescriptor,
        subject_id: Uuid,
        reviewer_id: Uuid,
        approved: bool,
        reason: Option<RejectionReason>,
    ) -> Result<(), NotifyError> {
        let (verdict_zh, verdict_en) = if approved { ("已通过", "approved") } else { ("已拒绝", "rejected") };
        let title = format!("{}{} / {} {}", descriptor.labels.zh, verdict_zh, descriptor.labels.en, verdict_en);
        let content = match reason {
            Some(r) => format!(
                "你的{}审核未通过，原因：{}。/ Your {} was rejected: {}.",
                descriptor.labels.zh,
                r.label_zh(),
                descriptor.labels.en,
                r.label_en()
            ),
            None => format!(
                "你的{}审核{}。/ Your {} was {}.",
                descriptor.labels.zh, verdict_zh, descriptor.labels.en, verdict_en
            ),
        };

        self.notifications
            .insert_many(&[NewNotification {
                to_user_id: subject_id,
                from_user_id: Some(reviewer_id),
                title,
                content,
            }])
            .await?;
        Ok(())
    }
}
