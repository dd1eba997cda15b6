use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub coach_id: Uuid,
}

/// PUT /api/assignments/:user_id - upsert the learner's coach
pub async fn assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AssignBody>,
) -> Result<Json<Value>, ApiError> {
    state.engine().assign_coach(&user.actor(), user_id, body.coach_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/assignments/:user_id - remove the learner's coach
pub async fn unassign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.engine().unassign_coach(&user.actor(), user_id).await?;
    Ok(Json(json!({ "success": true })))
}
