//! Board database operations

use shared::models::{
    Board, BoardCreate, BoardMember, BoardRole, BoardSummary, BoardUpdate, DEFAULT_BOARD_COLOR,
    MemberUpsert,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use super::BoxError;

/// Lists every new board starts with: (title, color)
const DEFAULT_LISTS: [(&str, Option<&str>); 3] = [
    ("To Do", None),
    ("In Progress", Some("#f59e0b")),
    ("Done", Some("#10b981")),
];

// ── Read ──

pub async fn find<'e, E>(executor: E, board_id: i64) -> Result<Option<Board>, BoxError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let board = sqlx::query_as::<_, Board>("SELECT * FROM boards WHERE id = ?")
        .bind(board_id)
        .fetch_optional(executor)
        .await?;
    Ok(board)
}

/// Boards the user owns or is a member of, most recently touched first
pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<BoardSummary>, BoxError> {
    let rows = sqlx::query_as::<_, BoardSummary>(
        r#"
        SELECT b.*,
               (SELECT COUNT(*) FROM lists l WHERE l.board_id = b.id) AS list_count,
               (SELECT COUNT(*) FROM tasks t WHERE t.board_id = b.id) AS task_count
        FROM boards b
        WHERE b.owner_id = ?1
           OR EXISTS (SELECT 1 FROM board_members m WHERE m.board_id = b.id AND m.user_id = ?1)
        ORDER BY b.updated_at DESC, b.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn members(pool: &SqlitePool, board_id: i64) -> Result<Vec<BoardMember>, BoxError> {
    let rows = sqlx::query_as::<_, BoardMember>(
        "SELECT * FROM board_members WHERE board_id = ? ORDER BY joined_at, user_id",
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Effective role of a user on a board; the owner column wins over membership
pub async fn role_of(
    pool: &SqlitePool,
    board_id: i64,
    user_id: i64,
) -> Result<Option<BoardRole>, BoxError> {
    let row: Option<(i64, Option<BoardRole>)> = sqlx::query_as(
        r#"
        SELECT b.owner_id, m.role
        FROM boards b
        LEFT JOIN board_members m ON m.board_id = b.id AND m.user_id = ?2
        WHERE b.id = ?1
        "#,
    )
    .bind(board_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(owner_id, role)| {
        if owner_id == user_id {
            Some(BoardRole::Owner)
        } else {
            role
        }
    }))
}

// ── Write ──

/// Insert a board, its owner membership and the default lists
pub async fn create(pool: &SqlitePool, owner_id: i64, data: &BoardCreate) -> Result<Board, BoxError> {
    let now = now_millis();
    let board = Board {
        id: snowflake_id(),
        title: data.title.trim().to_string(),
        description: data.description.clone(),
        color: data
            .color
            .clone()
            .unwrap_or_else(|| DEFAULT_BOARD_COLOR.to_string()),
        is_private: data.is_private.unwrap_or(false),
        owner_id,
        version: 0,
        created_at: now,
        updated_at: now,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO boards (id, title, description, color, is_private, owner_id, version, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(board.id)
    .bind(&board.title)
    .bind(&board.description)
    .bind(&board.color)
    .bind(board.is_private)
    .bind(owner_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO board_members (board_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
        .bind(board.id)
        .bind(owner_id)
        .bind(BoardRole::Owner)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    for (position, (title, color)) in DEFAULT_LISTS.iter().enumerate() {
        sqlx::query(
            "INSERT INTO lists (id, board_id, title, color, position, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(snowflake_id())
        .bind(board.id)
        .bind(*title)
        .bind(*color)
        .bind(position as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(board)
}

/// Bump the board version; returns the new version, `None` if the board is gone
///
/// Must be the first statement of a write transaction: it takes SQLite's
/// write lock, so every later read in the transaction sees committed state.
pub async fn bump_version(conn: &mut SqliteConnection, board_id: i64) -> Result<Option<i64>, sqlx::Error> {
    let version: Option<i64> = sqlx::query_scalar(
        "UPDATE boards SET version = version + 1, updated_at = ? WHERE id = ? RETURNING version",
    )
    .bind(now_millis())
    .bind(board_id)
    .fetch_optional(conn)
    .await?;
    Ok(version)
}

pub async fn update(
    conn: &mut SqliteConnection,
    board_id: i64,
    data: &BoardUpdate,
) -> Result<Option<Board>, BoxError> {
    let board = sqlx::query_as::<_, Board>(
        r#"
        UPDATE boards
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            color = COALESCE(?, color),
            is_private = COALESCE(?, is_private)
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(data.title.as_deref().map(str::trim))
    .bind(&data.description)
    .bind(&data.color)
    .bind(data.is_private)
    .bind(board_id)
    .fetch_optional(conn)
    .await?;
    Ok(board)
}

pub async fn delete(pool: &SqlitePool, board_id: i64) -> Result<bool, BoxError> {
    let rows = sqlx::query("DELETE FROM boards WHERE id = ?")
        .bind(board_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn upsert_member(
    conn: &mut SqliteConnection,
    board_id: i64,
    data: &MemberUpsert,
) -> Result<BoardMember, BoxError> {
    let member = sqlx::query_as::<_, BoardMember>(
        r#"
        INSERT INTO board_members (board_id, user_id, role, joined_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (board_id, user_id) DO UPDATE SET role = excluded.role
        RETURNING *
        "#,
    )
    .bind(board_id)
    .bind(data.user_id)
    .bind(data.role)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    Ok(member)
}
