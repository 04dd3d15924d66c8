//! Task API handlers
//!
//! Placement (create, move) goes through the `MoveCoordinator`; field edits
//! and deletes follow the plain board write path.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;
use shared::error::{ApiResponse, AppError};
use shared::models::{Task, TaskCreate, TaskList, TaskMove, TaskUpdate};
use shared::relay::BoardEvent;

use super::{Need, authorize, begin_board_write, require_title, versioned};
use crate::auth::Caller;
use crate::db;
use crate::error::ServiceResult;
use crate::ordering::{CreateTask, MoveTask};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/board/{board_id}", get(board_tasks))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .route("/api/tasks/{id}/move", post(move_task).put(move_task))
}

/// Lists and tasks of one board, both in display order
#[derive(Debug, Serialize)]
pub struct BoardTasks {
    pub board_id: i64,
    pub version: i64,
    pub lists: Vec<TaskList>,
    pub tasks: Vec<Task>,
}

async fn find_task(state: &AppState, task_id: i64) -> ServiceResult<Task> {
    Ok(db::tasks::find(&state.pool, task_id)
        .await?
        .ok_or_else(|| AppError::task_not_found(task_id))?)
}

/// GET /api/tasks/board/{board_id}
pub async fn board_tasks(
    State(state): State<AppState>,
    caller: Caller,
    Path(board_id): Path<i64>,
) -> ServiceResult<Json<BoardTasks>> {
    authorize(&state, caller.user_id, board_id, Need::View).await?;
    let board = db::boards::find(&state.pool, board_id)
        .await?
        .ok_or_else(|| AppError::board_not_found(board_id))?;

    Ok(Json(BoardTasks {
        board_id,
        version: board.version,
        lists: db::lists::list_for_board(&state.pool, board_id).await?,
        tasks: db::tasks::list_for_board(&state.pool, board_id).await?,
    }))
}

/// POST /api/tasks (appended unless `index` is given)
pub async fn create_task(
    State(state): State<AppState>,
    caller: Caller,
    Json(data): Json<TaskCreate>,
) -> ServiceResult<Response> {
    require_title(&data.title)?;
    let outcome = state
        .coordinator
        .insert_task(CreateTask {
            data,
            user_id: caller.user_id,
            origin: caller.origin,
        })
        .await?;
    let version = outcome.version.unwrap_or_default();
    Ok(versioned(StatusCode::CREATED, version, outcome.task))
}

/// POST|PUT /api/tasks/{id}/move
pub async fn move_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(task_id): Path<i64>,
    Json(data): Json<TaskMove>,
) -> ServiceResult<Response> {
    let outcome = state
        .coordinator
        .move_task(MoveTask {
            task_id,
            target_list_id: data.list_id,
            target_index: data.index,
            user_id: caller.user_id,
            origin: caller.origin,
        })
        .await?;

    Ok(match outcome.version {
        Some(version) => versioned(StatusCode::OK, version, outcome.task),
        // Nothing changed, so there is no new version to report
        None => Json(outcome.task).into_response(),
    })
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(task_id): Path<i64>,
    Json(data): Json<TaskUpdate>,
) -> ServiceResult<Response> {
    let existing = find_task(&state, task_id).await?;
    authorize(&state, caller.user_id, existing.board_id, Need::Mutate).await?;
    if let Some(title) = &data.title {
        require_title(title)?;
    }

    let (mut tx, version) = begin_board_write(&state, existing.board_id).await?;
    let task = db::tasks::update_fields(&mut tx, task_id, &data)
        .await?
        .ok_or_else(|| AppError::task_not_found(task_id))?;
    tx.commit().await?;

    tracing::debug!(task_id, version, "Task updated");
    state.relay.publish(
        BoardEvent::TaskUpdated {
            board_id: task.board_id,
            version,
            task: task.clone(),
        },
        caller.origin.as_deref(),
    );
    Ok(versioned(StatusCode::OK, version, task))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(task_id): Path<i64>,
) -> ServiceResult<Response> {
    let existing = find_task(&state, task_id).await?;
    authorize(&state, caller.user_id, existing.board_id, Need::Mutate).await?;

    let (mut tx, version) = begin_board_write(&state, existing.board_id).await?;
    let task = db::tasks::delete(&mut tx, task_id)
        .await?
        .ok_or_else(|| AppError::task_not_found(task_id))?;
    tx.commit().await?;

    tracing::info!(task_id, list_id = task.list_id, version, "Task deleted");
    state.relay.publish(
        BoardEvent::TaskDeleted {
            board_id: task.board_id,
            version,
            task_id,
            list_id: task.list_id,
        },
        caller.origin.as_deref(),
    );
    Ok(versioned(StatusCode::OK, version, ApiResponse::ok()))
}
