// Sequencing Guard: lesson k of the course track may only be requested (or
// served) once the learner has submitted their course note for lesson k-1.
// Pure read-side check, independent of the approval engine; evaluated at both
// request time and content-serving time.
use uuid::Uuid;

use crate::store::{ResourceStore, StoreError};
use crate::workflow::kind::ResourceKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceCheck {
    Allowed,
    Blocked { missing_lesson: i32 },
}

impl SequenceCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SequenceCheck::Allowed)
    }
}

/// Check the lesson-ordering prerequisite. Kinds without sequencing always
/// pass, as does lesson 1 and any key that is not a lesson number (non-course
/// keys are not ordered).
pub async fn check_prerequisite(
    resources: &dyn ResourceStore,
    kind: ResourceKind,
    subject_id: Uuid,
    resource_key: &str,
) -> Result<SequenceCheck, StoreError> {
    if !kind.descriptor().sequenced {
        return Ok(SequenceCheck::Allowed);
    }

    let lesson: i32 = match resource_key.trim().parse() {
        Ok(n) => n,
        Err(_) => return Ok(SequenceCheck::Allowed),
    };
    if lesson <= 1 {
        return Ok(SequenceCheck::Allowed);
    }

    let prior = lesson - 1;
    // Submission is enough; the note does not need to be reviewed yet.
    let submitted = resources
        .has_submission(ResourceKind::CourseNote, subject_id, &prior.to_string())
        .await?;

    if submitted {
        Ok(SequenceCheck::Allowed)
    } else {
        Ok(SequenceCheck::Blocked { missing_lesson: prior })
    }
}
