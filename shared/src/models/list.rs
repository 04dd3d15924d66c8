//! List Model (a board column)

use serde::{Deserialize, Serialize};

/// Ordered column of tasks inside a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TaskList {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub color: Option<String>,
    pub position: i64,
    pub created_at: i64,
}

/// Create list payload; new lists are appended after the board's last list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListCreate {
    #[serde(alias = "boardId", deserialize_with = "crate::util::flexible_id::deserialize")]
    pub board_id: i64,
    pub title: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskListUpdate {
    pub title: Option<String>,
    pub color: Option<String>,
}
