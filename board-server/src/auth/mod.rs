//! Caller identity and board access

pub mod access;
pub mod caller;

pub use access::{BoardAccess, SqlBoardAccess};
pub use caller::Caller;
