use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::page_params;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/notifications - the actor's notifications, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let (limit, offset) = page_params(query.limit, query.offset);
    let rows = state.notifications.list_for(user.user_id, limit, offset).await?;
    Ok(Json(json!({
        "success": true,
        "data": rows,
        "limit": limit,
        "offset": offset,
    })))
}

/// PUT /api/notifications/:id/read - mark one notification read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let updated = state.notifications.mark_read(id, user.user_id).await?;
    if !updated {
        return Err(ApiError::not_found("notification not found"));
    }
    Ok(Json(json!({ "success": true })))
}
