use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::identity::{AccountStatus, Role};
use crate::state::AppState;

/// Middleware that validates the JWT actor against the identities table.
/// Ensures the account exists and is active; frozen accounts get a stable
/// FROZEN code. The database row wins over the token: role and leader_id in
/// the request extension are refreshed from the row, so a stale claim can
/// never widen scope after a demotion.
pub async fn validate_identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| {
            ApiError::unauthorized("JWT authentication required before identity validation")
        })?;

    let identity = state
        .identities
        .get(auth_user.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Database error validating identity {}: {}", auth_user.user_id, e);
            ApiError::internal_server_error("Failed to validate identity")
        })?
        .ok_or_else(|| {
            tracing::warn!("Identity validation failed: {} not found", auth_user.user_id);
            ApiError::forbidden("Account not found")
        })?;

    match identity.parsed_status() {
        Some(AccountStatus::Active) => {}
        Some(AccountStatus::Frozen) => {
            tracing::warn!("Identity validation failed: {} is frozen", identity.id);
            return Err(ApiError::frozen("Account is frozen"));
        }
        Some(AccountStatus::Deleted) | None => {
            tracing::warn!(
                "Identity validation failed: {} has status '{}'",
                identity.id,
                identity.status
            );
            return Err(ApiError::forbidden("Account is not active"));
        }
    }

    // Refresh actor context from the database row.
    let validated = AuthUser {
        user_id: identity.id,
        name: identity.name.clone(),
        role: Role::parse(&identity.role),
        role_raw: identity.role.clone(),
        leader_id: identity.leader_id,
    };
    request.extensions_mut().insert(validated);

    Ok(next.run(request).await)
}
