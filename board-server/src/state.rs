//! Application state for board-server

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{BoardAccess, SqlBoardAccess};
use crate::config::Config;
use crate::db::DbService;
use crate::live::BoardRelay;
use crate::ordering::MoveCoordinator;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// Board fan-out to websocket observers
    pub relay: BoardRelay,
    /// Owns the per-list locks; every task placement goes through it
    pub coordinator: MoveCoordinator,
    pub access: Arc<dyn BoardAccess>,
    pub config: Arc<Config>,
    /// Process start, for the health endpoint
    pub started_at: std::time::Instant,
}

impl AppState {
    /// Open the database and wire the collaborators
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let db = DbService::new(&config.database_path).await?;
        Ok(Self::with_pool(db.pool, config.clone()))
    }

    pub fn with_pool(pool: SqlitePool, config: Config) -> Self {
        let relay = BoardRelay::new(config.relay_buffer);
        let access: Arc<dyn BoardAccess> = Arc::new(SqlBoardAccess::new(pool.clone()));
        let coordinator = MoveCoordinator::new(
            pool.clone(),
            access.clone(),
            relay.clone(),
            config.move_max_retries,
        );
        Self {
            pool,
            relay,
            coordinator,
            access,
            config: Arc::new(config),
            started_at: std::time::Instant::now(),
        }
    }
}
