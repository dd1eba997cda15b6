use axum::{response::Json, Extension};
use serde_json::{json, Value};

use crate::middleware::AuthUser;

/// GET /api/auth/whoami - current actor details as validated against the
/// identities table.
pub async fn whoami(Extension(user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "id": user.user_id,
            "name": user.name,
            "role": user.role_raw,
            "leader_id": user.leader_id,
        }
    }))
}
