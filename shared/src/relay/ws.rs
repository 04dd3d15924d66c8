//! Board relay websocket protocol
//!
//! Server → Client: [`RelayMessage`]
//! Client → Server: [`RelayCommand`] (board membership)

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::models::{Board, Task, TaskList};

/// Opaque id of one connected observer (one websocket session)
pub type ObserverId = String;

/// A committed change inside a board
///
/// Every event carries the board `version` produced by the mutation, so an
/// observer can drop duplicates and notice missed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BoardEvent {
    /// A task changed list and/or position
    #[serde(rename = "item-moved")]
    TaskMoved {
        board_id: i64,
        version: i64,
        task_id: i64,
        source_list_id: i64,
        target_list_id: i64,
        new_position: i64,
        /// Target list positions were rewritten; local patching is not enough
        #[serde(default)]
        renumbered: bool,
    },
    TaskCreated {
        board_id: i64,
        version: i64,
        task: Task,
        #[serde(default)]
        renumbered: bool,
    },
    TaskUpdated {
        board_id: i64,
        version: i64,
        task: Task,
    },
    TaskDeleted {
        board_id: i64,
        version: i64,
        task_id: i64,
        list_id: i64,
    },
    ListCreated {
        board_id: i64,
        version: i64,
        list: TaskList,
    },
    ListUpdated {
        board_id: i64,
        version: i64,
        list: TaskList,
    },
    ListDeleted {
        board_id: i64,
        version: i64,
        list_id: i64,
    },
    BoardUpdated {
        board_id: i64,
        version: i64,
        board: Board,
    },
}

impl BoardEvent {
    pub fn board_id(&self) -> i64 {
        match self {
            Self::TaskMoved { board_id, .. }
            | Self::TaskCreated { board_id, .. }
            | Self::TaskUpdated { board_id, .. }
            | Self::TaskDeleted { board_id, .. }
            | Self::ListCreated { board_id, .. }
            | Self::ListUpdated { board_id, .. }
            | Self::ListDeleted { board_id, .. }
            | Self::BoardUpdated { board_id, .. } => *board_id,
        }
    }

    pub fn version(&self) -> i64 {
        match self {
            Self::TaskMoved { version, .. }
            | Self::TaskCreated { version, .. }
            | Self::TaskUpdated { version, .. }
            | Self::TaskDeleted { version, .. }
            | Self::ListCreated { version, .. }
            | Self::ListUpdated { version, .. }
            | Self::ListDeleted { version, .. }
            | Self::BoardUpdated { version, .. } => *version,
        }
    }

    /// Wire name of the event, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskMoved { .. } => "item-moved",
            Self::TaskCreated { .. } => "task-created",
            Self::TaskUpdated { .. } => "task-updated",
            Self::TaskDeleted { .. } => "task-deleted",
            Self::ListCreated { .. } => "list-created",
            Self::ListUpdated { .. } => "list-updated",
            Self::ListDeleted { .. } => "list-deleted",
            Self::BoardUpdated { .. } => "board-updated",
        }
    }
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayMessage {
    /// Session established; send `observer_id` as `X-Observer-Id` on HTTP
    /// mutations so this session is not notified of its own changes
    Ready { observer_id: ObserverId },
    /// Joined a board at the given version
    Joined { board_id: i64, version: i64 },
    Left { board_id: i64 },
    Event { event: BoardEvent },
    /// A command was refused (unknown board, no access, malformed command)
    Error { code: ErrorCode, message: String },
}

/// Client → Server command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayCommand {
    JoinBoard {
        #[serde(alias = "boardId", deserialize_with = "crate::util::flexible_id::deserialize")]
        board_id: i64,
    },
    LeaveBoard {
        #[serde(alias = "boardId", deserialize_with = "crate::util::flexible_id::deserialize")]
        board_id: i64,
    },
}
