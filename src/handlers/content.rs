use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use crate::config;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::sequence::{check_prerequisite, SequenceCheck};
use crate::state::AppState;
use crate::workflow::kind::ResourceKind;
use crate::workflow::status::ResourceStatus;

/// GET /api/courses/:lesson/content - signed download URL for lesson content.
///
/// Requires an approved course-access row AND re-evaluates the sequencing
/// guard at serve time: an access granted before a policy change must not
/// bypass the lesson ordering.
pub async fn course_content(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(lesson): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let key = lesson.to_string();

    let access = state
        .resources
        .find_by_key(ResourceKind::CourseAccess, user.user_id, &key)
        .await?
        .ok_or_else(|| ApiError::forbidden("no access to this lesson"))?;

    match access.parsed_status() {
        Some(ResourceStatus::Approved) | Some(ResourceStatus::Completed) => {}
        _ => return Err(ApiError::forbidden("lesson access has not been approved")),
    }

    match check_prerequisite(state.resources.as_ref(), ResourceKind::CourseAccess, user.user_id, &key)
        .await?
    {
        SequenceCheck::Allowed => {}
        SequenceCheck::Blocked { missing_lesson } => {
            return Err(ApiError::conflict(format!(
                "submit your note for lesson {} before opening lesson {}",
                missing_lesson, lesson
            )));
        }
    }

    let bucket = access.bucket.clone().unwrap_or_else(|| "courses".to_string());
    let path = access
        .path
        .clone()
        .unwrap_or_else(|| format!("lessons/{}", lesson));

    let ttl = Duration::from_secs(config::config().signing.url_ttl_secs);
    let signed = state
        .url_cache
        .sign_download(state.signer.as_ref(), &bucket, &path, ttl)
        .await
        .map_err(|e| {
            tracing::error!("URL signing failed for {}/{}: {}", bucket, path, e);
            ApiError::service_unavailable("content storage is temporarily unavailable")
        })?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "url": signed.url,
            "expires_at": signed.expires_at,
        }
    })))
}
