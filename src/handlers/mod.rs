// Handlers for the authenticated API surface. Every resource kind goes
// through the same parameterized submit/review handlers; there is no
// per-kind route file.
pub mod assignments;
pub mod auth;
pub mod content;
pub mod notifications;
pub mod review;
pub mod submission;

use crate::config;
use crate::error::ApiError;
use crate::workflow::kind::ResourceKind;

/// Parse the `:kind` path segment.
pub(crate) fn parse_kind(segment: &str) -> Result<ResourceKind, ApiError> {
    ResourceKind::from_path(segment)
        .ok_or_else(|| ApiError::not_found(format!("unknown resource kind '{}'", segment)))
}

/// Clamp caller-supplied pagination to configured bounds.
pub(crate) fn page_params(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let cfg = config::config();
    let limit = limit.unwrap_or(cfg.api.default_page_size).clamp(1, cfg.api.max_page_size);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
