//! Board access collaborator
//!
//! Mutations ask `can_mutate` before touching the store. When it says no,
//! `can_view` decides between "not found" (board invisible) and "read-only".

use async_trait::async_trait;
use shared::models::BoardRole;
use sqlx::SqlitePool;

use crate::db::{self, BoxError};

#[async_trait]
pub trait BoardAccess: Send + Sync {
    async fn can_view(&self, user_id: i64, board_id: i64) -> Result<bool, BoxError>;
    async fn can_mutate(&self, user_id: i64, board_id: i64) -> Result<bool, BoxError>;
    /// Edit the board itself and manage its members
    async fn can_administer(&self, user_id: i64, board_id: i64) -> Result<bool, BoxError>;
}

/// Role-based access backed by `boards.owner_id` and `board_members`
#[derive(Clone)]
pub struct SqlBoardAccess {
    pool: SqlitePool,
}

impl SqlBoardAccess {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn role(&self, user_id: i64, board_id: i64) -> Result<Option<BoardRole>, BoxError> {
        db::boards::role_of(&self.pool, board_id, user_id).await
    }
}

#[async_trait]
impl BoardAccess for SqlBoardAccess {
    async fn can_view(&self, user_id: i64, board_id: i64) -> Result<bool, BoxError> {
        Ok(self.role(user_id, board_id).await?.is_some())
    }

    async fn can_mutate(&self, user_id: i64, board_id: i64) -> Result<bool, BoxError> {
        Ok(self
            .role(user_id, board_id)
            .await?
            .is_some_and(|r| r.can_mutate()))
    }

    async fn can_administer(&self, user_id: i64, board_id: i64) -> Result<bool, BoxError> {
        Ok(self
            .role(user_id, board_id)
            .await?
            .is_some_and(|r| r.can_administer()))
    }
}
