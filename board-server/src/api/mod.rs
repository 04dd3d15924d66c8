//! API routes for board-server
//!
//! Each write handler:
//! 1. Resolve the board and check the caller's access
//! 2. Open a transaction that first bumps the board version
//! 3. Write, commit
//! 4. Publish the change to the board's other observers
//! 5. Return the row with an `X-Board-Version` header

pub mod boards;
pub mod health;
pub mod lists;
pub mod tasks;
pub mod ws;

use axum::Router;
use axum::response::{IntoResponse, Response};
use axum::{Json, http::StatusCode};
use http::{HeaderName, HeaderValue, Method};
use serde::Serialize;
use shared::error::AppError;
use sqlx::{Sqlite, Transaction};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::caller::{BOARD_VERSION_HEADER, OBSERVER_ID_HEADER, USER_ID_HEADER};
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// All routes, no middleware
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(boards::router())
        .merge(lists::router())
        .merge(tasks::router())
        .merge(ws::router())
}

/// Fully configured application
pub fn create_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.client_origins));

    build_router().layer(middleware).with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            http::header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(OBSERVER_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(BOARD_VERSION_HEADER)])
}

/// Level of access a handler needs on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Need {
    View,
    Mutate,
    Administer,
}

/// Refuse unless the caller has `need` on the board
///
/// An invisible board answers like a missing one; a visible board answers 403.
pub(crate) async fn authorize(
    state: &AppState,
    user_id: i64,
    board_id: i64,
    need: Need,
) -> ServiceResult<()> {
    let access = &state.access;
    let allowed = match need {
        Need::View => access.can_view(user_id, board_id).await?,
        Need::Mutate => access.can_mutate(user_id, board_id).await?,
        Need::Administer => access.can_administer(user_id, board_id).await?,
    };
    if allowed {
        return Ok(());
    }
    if need == Need::View || !access.can_view(user_id, board_id).await? {
        return Err(AppError::board_access_denied(board_id).into());
    }
    Err(match need {
        Need::Administer => {
            AppError::permission_denied("Board owner or admin role required")
                .with_detail("board_id", board_id)
        }
        _ => AppError::board_read_only(board_id),
    }
    .into())
}

/// Start a board write: the version bump takes the database write lock
pub(crate) async fn begin_board_write(
    state: &AppState,
    board_id: i64,
) -> ServiceResult<(Transaction<'static, Sqlite>, i64)> {
    let mut tx = state.pool.begin().await?;
    let version = db::boards::bump_version(&mut tx, board_id)
        .await?
        .ok_or_else(|| AppError::board_not_found(board_id))?;
    Ok((tx, version))
}

/// JSON body with the board version header
pub(crate) fn versioned<T: Serialize>(status: StatusCode, version: i64, body: T) -> Response {
    (
        status,
        [(BOARD_VERSION_HEADER, version.to_string())],
        Json(body),
    )
        .into_response()
}

pub(crate) fn require_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    Ok(())
}
