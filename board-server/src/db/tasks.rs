//! Task database operations
//!
//! Position writes (`insert`, `set_location`, `renumber`) are only called by
//! the move coordinator, inside a transaction and under the list lock.

use shared::models::{Task, TaskPriority, TaskStatus, TaskUpdate};
use shared::util::now_millis;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use super::BoxError;

/// One occupied slot of a list, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Slot {
    pub id: i64,
    pub position: i64,
}

/// Row values for a new task; `position` is filled in by the allocator
#[derive(Debug, Clone)]
pub struct NewTask {
    pub id: i64,
    pub board_id: i64,
    pub list_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub assignee_id: Option<i64>,
    pub creator_id: i64,
    pub due_date: Option<i64>,
}

// ── Read ──

pub async fn find<'e, E>(executor: E, task_id: i64) -> Result<Option<Task>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(task_id)
        .fetch_optional(executor)
        .await
}

/// All tasks of a board, each list in display order
pub async fn list_for_board(pool: &SqlitePool, board_id: i64) -> Result<Vec<Task>, BoxError> {
    let rows = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE board_id = ? ORDER BY list_id, position, created_at, id",
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Ordered slots of a list, optionally leaving one task out
pub async fn slots(
    conn: &mut SqliteConnection,
    list_id: i64,
    exclude: Option<i64>,
) -> Result<Vec<Slot>, sqlx::Error> {
    sqlx::query_as::<_, Slot>(
        r#"
        SELECT id, position FROM tasks
        WHERE list_id = ?1 AND (?2 IS NULL OR id <> ?2)
        ORDER BY position, created_at, id
        "#,
    )
    .bind(list_id)
    .bind(exclude)
    .fetch_all(conn)
    .await
}

// ── Position writes ──

pub async fn insert(
    conn: &mut SqliteConnection,
    task: &NewTask,
    position: i64,
) -> Result<(), sqlx::Error> {
    let now = now_millis();
    sqlx::query(
        r#"
        INSERT INTO tasks (id, board_id, list_id, title, description, priority, status,
                           assignee_id, creator_id, due_date, position, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(task.id)
    .bind(task.board_id)
    .bind(task.list_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.priority)
    .bind(TaskStatus::default())
    .bind(task.assignee_id)
    .bind(task.creator_id)
    .bind(task.due_date)
    .bind(position)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_location(
    conn: &mut SqliteConnection,
    task_id: i64,
    list_id: i64,
    position: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tasks SET list_id = ?, position = ?, updated_at = ? WHERE id = ?")
        .bind(list_id)
        .bind(position)
        .bind(now_millis())
        .bind(task_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Write dense positions; `positions` comes from `allocator::renumber`
pub async fn renumber(
    conn: &mut SqliteConnection,
    list_id: i64,
    positions: &[(i64, i64)],
) -> Result<(), sqlx::Error> {
    for &(task_id, position) in positions {
        sqlx::query("UPDATE tasks SET list_id = ?, position = ? WHERE id = ?")
            .bind(list_id)
            .bind(position)
            .bind(task_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// ── Field edits ──

/// Update editable fields; entering DONE stamps `completed_at`, leaving clears it
///
/// Clearable columns carry a presence flag so an explicit `null` writes NULL.
pub async fn update_fields(
    conn: &mut SqliteConnection,
    task_id: i64,
    data: &TaskUpdate,
) -> Result<Option<Task>, BoxError> {
    let now = now_millis();
    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks
        SET title = COALESCE(?1, title),
            description = CASE WHEN ?2 THEN ?3 ELSE description END,
            assignee_id = CASE WHEN ?4 THEN ?5 ELSE assignee_id END,
            priority = COALESCE(?6, priority),
            status = COALESCE(?7, status),
            due_date = CASE WHEN ?8 THEN ?9 ELSE due_date END,
            completed_at = CASE
                WHEN ?7 IS NULL THEN completed_at
                WHEN ?7 = 'DONE' THEN COALESCE(completed_at, ?10)
                ELSE NULL
            END,
            updated_at = ?10
        WHERE id = ?11
        RETURNING *
        "#,
    )
    .bind(data.title.as_deref().map(str::trim))
    .bind(data.description.is_some())
    .bind(data.description.clone().flatten())
    .bind(data.assignee_id.is_some())
    .bind(data.assignee_id.flatten())
    .bind(data.priority)
    .bind(data.status)
    .bind(data.due_date.is_some())
    .bind(data.due_date.flatten())
    .bind(now)
    .bind(task_id)
    .fetch_optional(conn)
    .await?;
    Ok(task)
}

pub async fn delete(conn: &mut SqliteConnection, task_id: i64) -> Result<Option<Task>, BoxError> {
    let task = sqlx::query_as::<_, Task>("DELETE FROM tasks WHERE id = ? RETURNING *")
        .bind(task_id)
        .fetch_optional(conn)
        .await?;
    Ok(task)
}
