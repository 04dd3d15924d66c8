//! Shared types for the board server
//!
//! Domain models, error codes, relay protocol types and small utilities
//! used by the server and by observer clients.

pub mod error;
pub mod models;
pub mod relay;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use relay::{BoardEvent, BoardView, ObserverId, Reconcile, RelayCommand, RelayMessage};
