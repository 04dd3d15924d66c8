//! Task Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

/// Task entity
///
/// Tasks in one list are totally ordered by `(position, created_at, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Task {
    pub id: i64,
    pub board_id: i64,
    pub list_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub assignee_id: Option<i64>,
    pub creator_id: i64,
    pub due_date: Option<i64>,
    pub completed_at: Option<i64>,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Ordering key inside a list
    pub fn sort_key(&self) -> (i64, i64, i64) {
        (self.position, self.created_at, self.id)
    }
}

/// Create task payload
///
/// Without `index` the task is appended to the end of the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    pub description: Option<String>,
    #[serde(alias = "listId", deserialize_with = "crate::util::flexible_id::deserialize")]
    pub list_id: i64,
    #[serde(default, alias = "assigneeId", deserialize_with = "crate::util::flexible_id::option::deserialize")]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub index: Option<i64>,
}

/// Update task payload (all optional)
///
/// Membership and position are not editable here; use the move endpoint.
/// Clearable fields are `Option<Option<_>>`: absent leaves the value alone,
/// `null` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::util::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        alias = "assigneeId",
        deserialize_with = "crate::util::flexible_id::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignee_id: Option<Option<i64>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    #[serde(
        default,
        alias = "dueDate",
        deserialize_with = "crate::util::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<i64>>,
}

/// Move request body
///
/// Accepts both the snake_case field names and the camelCase names used by
/// drag-and-drop clients (`targetCollectionId`, `targetIndex`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMove {
    #[serde(
        alias = "targetCollectionId",
        alias = "listId",
        deserialize_with = "crate::util::flexible_id::deserialize"
    )]
    pub list_id: i64,
    /// Signed so a negative index reaches validation instead of failing JSON parsing
    #[serde(alias = "targetIndex", alias = "position")]
    pub index: i64,
}
