//! Data models
//!
//! Shared between board-server and clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflakes (SQLite INTEGER PRIMARY KEY).

pub mod board;
pub mod list;
pub mod task;

// Re-exports
pub use board::*;
pub use list::*;
pub use task::*;
