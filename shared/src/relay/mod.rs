//! Board relay protocol types
//!
//! Shared between board-server (publisher) and any observer client.

pub mod view;
pub mod ws;

pub use view::{BoardView, Reconcile};
pub use ws::*;
