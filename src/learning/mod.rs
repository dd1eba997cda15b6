// Aggregate learning-status recomputation hook. Invoked after a course-access
// approval; it has its own failure domain: the engine logs a failure and
// moves on, the approval itself is already committed.
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait LearningStatusHook: Send + Sync {
    async fn course_access_granted(&self, subject_id: Uuid, lesson: i32) -> anyhow::Result<()>;
}

/// Default no-op hook for tests and deployments without the aggregate service.
pub struct NoopLearningStatus;

#[async_trait]
impl LearningStatusHook for NoopLearningStatus {
    async fn course_access_granted(&self, _subject_id: Uuid, _lesson: i32) -> anyhow::Result<()> {
        Ok(())
    }
}
