//! Board API handlers

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{
    Board, BoardCreate, BoardDetail, BoardMember, BoardRole, BoardSummary, BoardUpdate,
    MemberUpsert,
};
use shared::relay::BoardEvent;

use super::{Need, authorize, begin_board_write, require_title, versioned};
use crate::auth::Caller;
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/boards", get(list_boards).post(create_board))
        .route(
            "/api/boards/{id}",
            get(get_board).put(update_board).delete(delete_board),
        )
        .route("/api/boards/{id}/members", post(upsert_member))
}

async fn find_board(state: &AppState, board_id: i64) -> ServiceResult<Board> {
    Ok(db::boards::find(&state.pool, board_id)
        .await?
        .ok_or_else(|| AppError::board_not_found(board_id))?)
}

pub(crate) async fn load_detail(state: &AppState, board: Board) -> ServiceResult<BoardDetail> {
    let members = db::boards::members(&state.pool, board.id).await?;
    let lists = db::lists::list_for_board(&state.pool, board.id).await?;
    let tasks = db::tasks::list_for_board(&state.pool, board.id).await?;
    Ok(BoardDetail {
        board,
        members,
        lists,
        tasks,
    })
}

/// GET /api/boards
pub async fn list_boards(
    State(state): State<AppState>,
    caller: Caller,
) -> ServiceResult<Json<Vec<BoardSummary>>> {
    let boards = db::boards::list_for_user(&state.pool, caller.user_id).await?;
    Ok(Json(boards))
}

/// POST /api/boards
pub async fn create_board(
    State(state): State<AppState>,
    caller: Caller,
    Json(data): Json<BoardCreate>,
) -> ServiceResult<Response> {
    require_title(&data.title)?;
    let board = db::boards::create(&state.pool, caller.user_id, &data).await?;
    tracing::info!(board_id = board.id, owner_id = caller.user_id, "Board created");

    let version = board.version;
    let detail = load_detail(&state, board).await?;
    Ok(versioned(StatusCode::CREATED, version, detail))
}

/// GET /api/boards/{id}
pub async fn get_board(
    State(state): State<AppState>,
    caller: Caller,
    Path(board_id): Path<i64>,
) -> ServiceResult<Json<BoardDetail>> {
    let board = find_board(&state, board_id).await?;
    authorize(&state, caller.user_id, board_id, Need::View).await?;
    Ok(Json(load_detail(&state, board).await?))
}

/// PUT /api/boards/{id}
pub async fn update_board(
    State(state): State<AppState>,
    caller: Caller,
    Path(board_id): Path<i64>,
    Json(data): Json<BoardUpdate>,
) -> ServiceResult<Response> {
    find_board(&state, board_id).await?;
    authorize(&state, caller.user_id, board_id, Need::Administer).await?;
    if let Some(title) = &data.title {
        require_title(title)?;
    }

    let (mut tx, version) = begin_board_write(&state, board_id).await?;
    let board = db::boards::update(&mut tx, board_id, &data)
        .await?
        .ok_or_else(|| AppError::board_not_found(board_id))?;
    tx.commit().await?;

    state.relay.publish(
        BoardEvent::BoardUpdated {
            board_id,
            version,
            board: board.clone(),
        },
        caller.origin.as_deref(),
    );
    Ok(versioned(StatusCode::OK, version, board))
}

/// DELETE /api/boards/{id} (owner only)
pub async fn delete_board(
    State(state): State<AppState>,
    caller: Caller,
    Path(board_id): Path<i64>,
) -> ServiceResult<Json<ApiResponse<()>>> {
    let board = find_board(&state, board_id).await?;
    if board.owner_id != caller.user_id {
        authorize(&state, caller.user_id, board_id, Need::View).await?;
        return Err(AppError::new(ErrorCode::BoardOwnerRequired)
            .with_detail("board_id", board_id)
            .into());
    }

    let lists = db::lists::list_for_board(&state.pool, board_id).await?;
    db::boards::delete(&state.pool, board_id).await?;
    // Lists went with the board (cascade)
    let locks = state.coordinator.locks();
    for list in &lists {
        locks.forget(list.id);
    }
    tracing::info!(board_id, lists = lists.len(), "Board deleted");
    Ok(Json(ApiResponse::ok()))
}

/// POST /api/boards/{id}/members
pub async fn upsert_member(
    State(state): State<AppState>,
    caller: Caller,
    Path(board_id): Path<i64>,
    Json(data): Json<MemberUpsert>,
) -> ServiceResult<Response> {
    let board = find_board(&state, board_id).await?;
    authorize(&state, caller.user_id, board_id, Need::Administer).await?;
    if data.role == BoardRole::Owner || data.user_id == board.owner_id {
        return Err(AppError::validation("Board ownership cannot be changed here").into());
    }

    let (mut tx, version) = begin_board_write(&state, board_id).await?;
    let member: BoardMember = db::boards::upsert_member(&mut tx, board_id, &data).await?;
    let board = db::boards::find(&mut *tx, board_id)
        .await?
        .ok_or_else(|| AppError::board_not_found(board_id))?;
    tx.commit().await?;

    tracing::info!(board_id, user_id = member.user_id, role = ?member.role, "Board member updated");
    // Membership has no event of its own; the board row carries the new version
    state.relay.publish(
        BoardEvent::BoardUpdated {
            board_id,
            version,
            board,
        },
        caller.origin.as_deref(),
    );
    Ok(versioned(StatusCode::OK, version, member))
}
