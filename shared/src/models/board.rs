//! Board Model

use serde::{Deserialize, Serialize};

use super::list::TaskList;
use super::task::Task;

pub const DEFAULT_BOARD_COLOR: &str = "#3b82f6";

/// Board entity, the scope of real-time broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Board {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub color: String,
    pub is_private: bool,
    pub owner_id: i64,
    /// Bumped once by every committed mutation inside the board
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Membership role on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum BoardRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl BoardRole {
    /// May create, edit, move and delete lists and tasks
    pub fn can_mutate(&self) -> bool {
        !matches!(self, BoardRole::Viewer)
    }

    /// May edit the board itself and manage members
    pub fn can_administer(&self) -> bool {
        matches!(self, BoardRole::Owner | BoardRole::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BoardMember {
    pub board_id: i64,
    pub user_id: i64,
    pub role: BoardRole,
    pub joined_at: i64,
}

/// Board list entry with counts (dashboard view)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BoardSummary {
    #[cfg_attr(feature = "db", sqlx(flatten))]
    #[serde(flatten)]
    pub board: Board,
    pub list_count: i64,
    pub task_count: i64,
}

/// Full board with ordered lists and tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub members: Vec<BoardMember>,
    pub lists: Vec<TaskList>,
    pub tasks: Vec<Task>,
}

/// Create board payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardCreate {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    #[serde(default, alias = "isPrivate")]
    pub is_private: Option<bool>,
}

/// Update board payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    #[serde(default, alias = "isPrivate")]
    pub is_private: Option<bool>,
}

/// Add or change a member's role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberUpsert {
    #[serde(alias = "userId", deserialize_with = "crate::util::flexible_id::deserialize")]
    pub user_id: i64,
    pub role: BoardRole,
}
