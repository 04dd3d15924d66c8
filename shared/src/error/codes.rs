//! Unified error codes for the board server
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Board errors (boards, lists, tasks, ordering)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller identity missing or malformed
    NotAuthenticated = 1001,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Board is visible but read-only for the caller
    BoardReadOnly = 2101,
    /// Board is not visible to the caller (reported as not found)
    BoardAccessDenied = 2102,

    // ==================== 4xxx: Board ====================
    /// Board not found
    BoardNotFound = 4001,
    /// Only the board owner may perform this action
    BoardOwnerRequired = 4002,
    /// List not found
    ListNotFound = 4101,
    /// List belongs to a different board
    ListNotInBoard = 4102,
    /// Task not found
    TaskNotFound = 4201,
    /// Target index outside the list bounds
    InvalidTargetIndex = 4202,
    /// Concurrent moves kept conflicting, retry later
    MoveConflict = 4203,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check whether this code represents success
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::BoardReadOnly => "Board is read-only for this user",
            ErrorCode::BoardAccessDenied => "Board not found or access denied",

            // Board
            ErrorCode::BoardNotFound => "Board not found",
            ErrorCode::BoardOwnerRequired => "Only the board owner can do this",
            ErrorCode::ListNotFound => "List not found",
            ErrorCode::ListNotInBoard => "List does not belong to this board",
            ErrorCode::TaskNotFound => "Task not found",
            ErrorCode::InvalidTargetIndex => "Target index is out of range",
            ErrorCode::MoveConflict => "Task move conflicted with concurrent changes",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2101 => Ok(ErrorCode::BoardReadOnly),
            2102 => Ok(ErrorCode::BoardAccessDenied),

            // Board
            4001 => Ok(ErrorCode::BoardNotFound),
            4002 => Ok(ErrorCode::BoardOwnerRequired),
            4101 => Ok(ErrorCode::ListNotFound),
            4102 => Ok(ErrorCode::ListNotInBoard),
            4201 => Ok(ErrorCode::TaskNotFound),
            4202 => Ok(ErrorCode::InvalidTargetIndex),
            4203 => Ok(ErrorCode::MoveConflict),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
