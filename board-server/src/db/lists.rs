//! List (board column) database operations

use shared::models::{TaskList, TaskListCreate, TaskListUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use super::BoxError;

pub async fn find<'e, E>(executor: E, list_id: i64) -> Result<Option<TaskList>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TaskList>("SELECT * FROM lists WHERE id = ?")
        .bind(list_id)
        .fetch_optional(executor)
        .await
}

pub async fn list_for_board(pool: &SqlitePool, board_id: i64) -> Result<Vec<TaskList>, BoxError> {
    let rows = sqlx::query_as::<_, TaskList>(
        "SELECT * FROM lists WHERE board_id = ? ORDER BY position, created_at, id",
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Append a list after the board's last one
pub async fn create(conn: &mut SqliteConnection, data: &TaskListCreate) -> Result<TaskList, BoxError> {
    let list = sqlx::query_as::<_, TaskList>(
        r#"
        INSERT INTO lists (id, board_id, title, color, position, created_at)
        VALUES (?1, ?2, ?3, ?4,
                (SELECT COALESCE(MAX(position), -1) + 1 FROM lists WHERE board_id = ?2),
                ?5)
        RETURNING *
        "#,
    )
    .bind(snowflake_id())
    .bind(data.board_id)
    .bind(data.title.trim())
    .bind(&data.color)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    Ok(list)
}

pub async fn update(
    conn: &mut SqliteConnection,
    list_id: i64,
    data: &TaskListUpdate,
) -> Result<Option<TaskList>, BoxError> {
    let list = sqlx::query_as::<_, TaskList>(
        "UPDATE lists SET title = COALESCE(?, title), color = COALESCE(?, color) WHERE id = ? RETURNING *",
    )
    .bind(data.title.as_deref().map(str::trim))
    .bind(&data.color)
    .bind(list_id)
    .fetch_optional(conn)
    .await?;
    Ok(list)
}

/// Delete a list; its tasks go with it (FK cascade)
pub async fn delete(conn: &mut SqliteConnection, list_id: i64) -> Result<bool, BoxError> {
    let rows = sqlx::query("DELETE FROM lists WHERE id = ?")
        .bind(list_id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}
