use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{page_params, parse_kind};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::store::ResourceFilter;
use crate::workflow::status::{ResourceStatus, WorkflowAction};

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/review/:kind - scope-filtered review queue
pub async fn queue(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    let descriptor = kind.descriptor();

    let Some(role) = user.role else {
        return Err(ApiError::forbidden("unrecognized role"));
    };
    if !descriptor.allows_reviewer(role) {
        return Err(ApiError::forbidden(format!("role '{}' may not review {}", role, kind)));
    }

    let status = match query.status.as_deref() {
        Some(s) => Some(
            ResourceStatus::parse(s)
                .ok_or_else(|| ApiError::invalid_body(format!("unknown status '{}'", s)))?,
        ),
        // Default view is the pending queue.
        None => Some(descriptor.pending_status),
    };
    let (limit, offset) = page_params(query.limit, query.offset);

    let scope = state.engine().scope_for(&user.actor()).await?;
    let filter = ResourceFilter {
        scope: scope.as_filter(),
        status,
        subject: None,
        limit,
        offset,
    };
    let rows = state.resources.list(kind, &filter).await?;
    let total = state.resources.count(kind, &filter).await?;

    Ok(Json(json!({
        "success": true,
        "data": rows,
        "total": total,
        "limit": limit,
        "offset": offset,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub action: WorkflowAction,
    pub reason: Option<String>,
}

/// POST /api/review/:kind/:id - single review decision
pub async fn decide(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    if body.action == WorkflowAction::Submit {
        return Err(ApiError::invalid_body("use the submission endpoint to submit"));
    }

    let outcome = state
        .engine()
        .review(kind, id, &user.actor(), body.action, body.reason.as_deref())
        .await?;

    let mut response = json!({ "success": true, "data": outcome.resource });
    if outcome.notify_failed {
        response["warning"] = json!("NOTIFY_FAILED");
    }
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct BulkReviewBody {
    pub ids: Vec<Uuid>,
    pub action: WorkflowAction,
    pub reason: Option<String>,
}

/// POST /api/review/:kind/bulk - bulk review decision
pub async fn decide_bulk(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Json(body): Json<BulkReviewBody>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    if body.ids.is_empty() {
        return Err(ApiError::invalid_body("ids must not be empty"));
    }
    if body.action == WorkflowAction::Submit {
        return Err(ApiError::invalid_body("use the submission endpoint to submit"));
    }

    let outcome = state
        .engine()
        .review_many(kind, &body.ids, &user.actor(), body.action, body.reason.as_deref())
        .await?;

    let skipped: Vec<Value> = outcome
        .skipped
        .iter()
        .map(|(id, why)| json!({ "id": id, "reason": why }))
        .collect();

    let mut response = json!({
        "success": true,
        "data": {
            "updated": outcome.updated,
            "skipped": skipped,
        }
    });
    if outcome.notify_failed {
        response["warning"] = json!("NOTIFY_FAILED");
    }
    Ok(Json(response))
}
