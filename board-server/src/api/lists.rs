//! List (board column) API handlers

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{post, put},
};
use shared::error::{ApiResponse, AppError};
use shared::models::{TaskList, TaskListCreate, TaskListUpdate};
use shared::relay::BoardEvent;

use super::{Need, authorize, begin_board_write, require_title, versioned};
use crate::auth::Caller;
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/lists", post(create_list))
        .route("/api/lists/{id}", put(update_list).delete(delete_list))
}

async fn find_list(state: &AppState, list_id: i64) -> ServiceResult<TaskList> {
    Ok(db::lists::find(&state.pool, list_id)
        .await?
        .ok_or_else(|| AppError::list_not_found(list_id))?)
}

/// POST /api/lists
pub async fn create_list(
    State(state): State<AppState>,
    caller: Caller,
    Json(data): Json<TaskListCreate>,
) -> ServiceResult<Response> {
    require_title(&data.title)?;
    authorize(&state, caller.user_id, data.board_id, Need::Mutate).await?;

    let (mut tx, version) = begin_board_write(&state, data.board_id).await?;
    let list = db::lists::create(&mut tx, &data).await?;
    tx.commit().await?;

    tracing::info!(board_id = list.board_id, list_id = list.id, version, "List created");
    state.relay.publish(
        BoardEvent::ListCreated {
            board_id: list.board_id,
            version,
            list: list.clone(),
        },
        caller.origin.as_deref(),
    );
    Ok(versioned(StatusCode::CREATED, version, list))
}

/// PUT /api/lists/{id}
pub async fn update_list(
    State(state): State<AppState>,
    caller: Caller,
    Path(list_id): Path<i64>,
    Json(data): Json<TaskListUpdate>,
) -> ServiceResult<Response> {
    let existing = find_list(&state, list_id).await?;
    authorize(&state, caller.user_id, existing.board_id, Need::Mutate).await?;
    if let Some(title) = &data.title {
        require_title(title)?;
    }

    let (mut tx, version) = begin_board_write(&state, existing.board_id).await?;
    let list = db::lists::update(&mut tx, list_id, &data)
        .await?
        .ok_or_else(|| AppError::list_not_found(list_id))?;
    tx.commit().await?;

    state.relay.publish(
        BoardEvent::ListUpdated {
            board_id: list.board_id,
            version,
            list: list.clone(),
        },
        caller.origin.as_deref(),
    );
    Ok(versioned(StatusCode::OK, version, list))
}

/// DELETE /api/lists/{id} (tasks are deleted with it)
pub async fn delete_list(
    State(state): State<AppState>,
    caller: Caller,
    Path(list_id): Path<i64>,
) -> ServiceResult<Response> {
    let list = find_list(&state, list_id).await?;
    authorize(&state, caller.user_id, list.board_id, Need::Mutate).await?;

    let locks = state.coordinator.locks();
    let version = {
        // No move may target the list while it goes away
        let _guard = locks.acquire(&[list_id]).await;
        let (mut tx, version) = begin_board_write(&state, list.board_id).await?;
        if !db::lists::delete(&mut tx, list_id).await? {
            return Err(AppError::list_not_found(list_id).into());
        }
        tx.commit().await?;
        version
    };
    locks.forget(list_id);

    tracing::info!(board_id = list.board_id, list_id, version, "List deleted");
    state.relay.publish(
        BoardEvent::ListDeleted {
            board_id: list.board_id,
            version,
            list_id,
        },
        caller.origin.as_deref(),
    );
    Ok(versioned(StatusCode::OK, version, ApiResponse::ok()))
}
