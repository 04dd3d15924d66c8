//! Ordered-list repositioning
//!
//! ```text
//! HTTP handler
//!       │ MoveTask / CreateTask
//!       ▼
//! MoveCoordinator
//!   ├── BoardAccess::can_mutate      (before any write)
//!   ├── ListLocks                    (source + target, ascending id)
//!   ├── tx: bump board version → read slots → allocator → write
//!   └── commit → locks released → BoardRelay::publish
//! ```

pub mod allocator;
pub mod coordinator;
pub mod locks;

pub use coordinator::{CreateTask, MoveCoordinator, MoveOutcome, MoveTask};
pub use locks::ListLocks;

use shared::error::{AppError, ErrorCode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a move or insert could not find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Task(i64),
    List(i64),
    Board(i64),
}

/// Why a requested destination is unusable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTarget {
    #[error("list {list_id} does not belong to board {board_id}")]
    ForeignList { list_id: i64, board_id: i64 },
    #[error("index {index} is outside 0..={max}")]
    Index { index: i64, max: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("{0:?} not found")]
    NotFound(Missing),
    /// Board is not visible to the caller
    #[error("no access to board {board_id}")]
    AccessDenied { board_id: i64 },
    /// Board is visible but the caller may not change it
    #[error("board {board_id} is read-only for this user")]
    ReadOnly { board_id: i64 },
    #[error(transparent)]
    InvalidTarget(#[from] InvalidTarget),
    /// Lost the race too many times; safe to retry later
    #[error("move conflicted after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error("database error: {0}")]
    Database(BoxError),
}

impl From<sqlx::Error> for MoveError {
    fn from(e: sqlx::Error) -> Self {
        MoveError::Database(e.into())
    }
}

impl From<MoveError> for AppError {
    fn from(e: MoveError) -> Self {
        match e {
            MoveError::NotFound(Missing::Task(id)) => AppError::task_not_found(id),
            MoveError::NotFound(Missing::List(id)) => AppError::list_not_found(id),
            MoveError::NotFound(Missing::Board(id)) => AppError::board_not_found(id),
            MoveError::AccessDenied { board_id } => AppError::board_access_denied(board_id),
            MoveError::ReadOnly { board_id } => AppError::board_read_only(board_id),
            MoveError::InvalidTarget(target) => {
                let message = target.to_string();
                match target {
                    InvalidTarget::ForeignList { list_id, board_id } => {
                        AppError::with_message(ErrorCode::ListNotInBoard, message)
                            .with_detail("list_id", list_id)
                            .with_detail("board_id", board_id)
                    }
                    InvalidTarget::Index { index, max } => {
                        AppError::with_message(ErrorCode::InvalidTargetIndex, message)
                            .with_detail("index", index)
                            .with_detail("max", max)
                    }
                }
            }
            MoveError::Conflict { attempts } => {
                AppError::new(ErrorCode::MoveConflict).with_detail("attempts", attempts)
            }
            MoveError::Database(err) => {
                tracing::error!(error = %err, "Move database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}
