//! Caller identity extractor
//!
//! Authentication happens upstream; the gateway forwards the user id in
//! `X-User-Id`. The websocket upgrade cannot set headers from a browser, so
//! it reads `user_id` from the query string instead (see `api::ws`).

use axum::extract::FromRequestParts;
use http::request::Parts;
use shared::error::AppError;
use shared::relay::ObserverId;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const OBSERVER_ID_HEADER: &str = "x-observer-id";
pub const BOARD_VERSION_HEADER: &str = "x-board-version";

/// The user behind a request, plus the relay session that issued it (if any)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    /// Relay observer to exclude from the broadcast of this request's changes
    pub origin: Option<ObserverId>,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(caller) = parts.extensions.get::<Caller>() {
            return Ok(caller.clone());
        }

        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| {
                tracing::debug!(uri = %parts.uri, "Request without a valid X-User-Id");
                AppError::not_authenticated()
            })?;

        let origin = parts
            .headers
            .get(OBSERVER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let caller = Caller { user_id, origin };
        parts.extensions.insert(caller.clone());
        Ok(caller)
    }
}
