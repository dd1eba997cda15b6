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
use crate::workflow::engine::SubmitPayload;
use crate::workflow::status::ResourceStatus;

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub resource_key: String,
    pub bucket: Option<String>,
    pub path: Option<String>,
    /// Optional on-behalf subject; must be inside the actor's scope.
    pub subject_user_id: Option<Uuid>,
}

/// POST /api/:kind/submit - learner request/submit
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    if body.resource_key.trim().is_empty() {
        return Err(ApiError::invalid_body("resource_key must not be empty"));
    }

    let subject = body.subject_user_id.unwrap_or(user.user_id);
    let outcome = state
        .engine()
        .submit(
            kind,
            &user.actor(),
            subject,
            SubmitPayload {
                resource_key: body.resource_key,
                bucket: body.bucket,
                path: body.path,
            },
        )
        .await?;

    let mut response = json!({ "success": true, "data": outcome.resource });
    if outcome.notify_failed {
        response["warning"] = json!("NOTIFY_FAILED");
    }
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct MineQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/:kind/mine - the actor's own rows
pub async fn mine(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Query(query): Query<MineQuery>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    let status = match query.status.as_deref() {
        Some(s) => Some(
            ResourceStatus::parse(s)
                .ok_or_else(|| ApiError::invalid_body(format!("unknown status '{}'", s)))?,
        ),
        None => None,
    };
    let (limit, offset) = page_params(query.limit, query.offset);

    let filter = ResourceFilter {
        scope: None,
        status,
        subject: Some(user.user_id),
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
