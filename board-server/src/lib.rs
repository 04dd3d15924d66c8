//! board-server: kanban boards with ordered-list repositioning
//!
//! - REST CRUD for boards, lists and tasks (axum + SQLite)
//! - `ordering`: position allocation and the move coordinator
//! - `live`: per-board relay of committed changes to websocket observers

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod live;
pub mod logger;
pub mod ordering;
pub mod state;

pub use config::Config;
pub use state::AppState;
