//! Move Coordinator
//!
//! Relocates a task inside a list or between two lists of one board, and
//! places newly created tasks. Every write runs in one SQLite transaction
//! under the per-list locks; the relay is only told after commit.

use std::sync::Arc;
use std::time::Duration;

use shared::models::{Task, TaskCreate};
use shared::relay::{BoardEvent, ObserverId};
use shared::util::snowflake_id;
use sqlx::{SqliteConnection, SqlitePool};

use super::allocator;
use super::locks::ListLocks;
use super::{InvalidTarget, Missing, MoveError};
use crate::auth::BoardAccess;
use crate::db::{self, tasks::NewTask};
use crate::live::BoardRelay;

/// Request to relocate one task
#[derive(Debug, Clone)]
pub struct MoveTask {
    pub task_id: i64,
    pub target_list_id: i64,
    /// Index in the target list after the move; validated, so signed
    pub target_index: i64,
    pub user_id: i64,
    /// Relay observer that issued the request (not notified)
    pub origin: Option<ObserverId>,
}

/// Request to create a task at an optional index (tail by default)
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub data: TaskCreate,
    pub user_id: i64,
    pub origin: Option<ObserverId>,
}

#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub task: Task,
    /// Board version after the write; `None` when nothing changed
    pub version: Option<i64>,
    /// The target list was renumbered to dense positions
    pub renumbered: bool,
}

/// Per-attempt result of the locked section
enum Attempt<T> {
    Done(T),
    /// Task left its list between the pre-read and the locked re-read
    Stale,
}

#[derive(Clone)]
pub struct MoveCoordinator {
    pool: SqlitePool,
    locks: ListLocks,
    access: Arc<dyn BoardAccess>,
    relay: BoardRelay,
    max_retries: u32,
}

impl MoveCoordinator {
    pub fn new(
        pool: SqlitePool,
        access: Arc<dyn BoardAccess>,
        relay: BoardRelay,
        max_retries: u32,
    ) -> Self {
        Self {
            pool,
            locks: ListLocks::new(),
            access,
            relay,
            max_retries,
        }
    }

    pub fn locks(&self) -> &ListLocks {
        &self.locks
    }

    /// Move a task to `target_index` of `target_list_id`
    pub async fn move_task(&self, cmd: MoveTask) -> Result<MoveOutcome, MoveError> {
        let task = db::tasks::find(&self.pool, cmd.task_id)
            .await?
            .ok_or(MoveError::NotFound(Missing::Task(cmd.task_id)))?;
        self.authorize(cmd.user_id, task.board_id).await?;

        let target = db::lists::find(&self.pool, cmd.target_list_id)
            .await?
            .ok_or(MoveError::NotFound(Missing::List(cmd.target_list_id)))?;
        if target.board_id != task.board_id {
            return Err(InvalidTarget::ForeignList {
                list_id: target.id,
                board_id: task.board_id,
            }
            .into());
        }
        if cmd.target_index < 0 {
            return Err(InvalidTarget::Index {
                index: cmd.target_index,
                max: 0,
            }
            .into());
        }

        let mut source_list_id = task.list_id;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = {
                let _guards = self.locks.acquire(&[source_list_id, target.id]).await;
                self.try_move(&cmd, task.board_id, source_list_id).await
            };

            match result {
                Ok(Attempt::Done(outcome)) => {
                    if let Some(version) = outcome.version {
                        tracing::info!(
                            task_id = cmd.task_id,
                            source_list_id,
                            target_list_id = target.id,
                            position = outcome.task.position,
                            version,
                            renumbered = outcome.renumbered,
                            "Task moved"
                        );
                        self.relay.publish(
                            BoardEvent::TaskMoved {
                                board_id: task.board_id,
                                version,
                                task_id: outcome.task.id,
                                source_list_id,
                                target_list_id: target.id,
                                new_position: outcome.task.position,
                                renumbered: outcome.renumbered,
                            },
                            cmd.origin.as_deref(),
                        );
                    }
                    return Ok(outcome);
                }
                Ok(Attempt::Stale) => {
                    // Re-read where the task lives now and lock that list instead
                    let current = db::tasks::find(&self.pool, cmd.task_id)
                        .await?
                        .ok_or(MoveError::NotFound(Missing::Task(cmd.task_id)))?;
                    source_list_id = current.list_id;
                }
                Err(MoveError::Database(err)) if is_busy_box(&err) => {
                    tracing::debug!(task_id = cmd.task_id, attempts, "Move hit a busy database");
                }
                Err(e) => return Err(e),
            }

            if attempts > self.max_retries {
                tracing::warn!(task_id = cmd.task_id, attempts, "Move gave up after conflicts");
                return Err(MoveError::Conflict { attempts });
            }
            tokio::time::sleep(backoff(attempts)).await;
        }
    }

    /// Locked section of a move: one transaction, all or nothing
    async fn try_move(
        &self,
        cmd: &MoveTask,
        board_id: i64,
        source_list_id: i64,
    ) -> Result<Attempt<MoveOutcome>, MoveError> {
        let mut tx = self.pool.begin().await?;

        let version = db::boards::bump_version(&mut tx, board_id)
            .await?
            .ok_or(MoveError::NotFound(Missing::Board(board_id)))?;

        let task = db::tasks::find(&mut *tx, cmd.task_id)
            .await?
            .ok_or(MoveError::NotFound(Missing::Task(cmd.task_id)))?;
        if task.list_id != source_list_id {
            return Ok(Attempt::Stale);
        }
        if db::lists::find(&mut *tx, cmd.target_list_id).await?.is_none() {
            return Err(MoveError::NotFound(Missing::List(cmd.target_list_id)));
        }

        let same_list = task.list_id == cmd.target_list_id;
        let current_index = if same_list {
            db::tasks::slots(&mut tx, task.list_id, None)
                .await?
                .iter()
                .position(|s| s.id == task.id)
        } else {
            None
        };

        let others = db::tasks::slots(&mut tx, cmd.target_list_id, Some(task.id)).await?;
        let index = checked_index(cmd.target_index, others.len())?;

        if current_index == Some(index) {
            // Dropping the transaction rolls back the version bump
            return Ok(Attempt::Done(MoveOutcome {
                task,
                version: None,
                renumbered: false,
            }));
        }

        let positions: Vec<i64> = others.iter().map(|s| s.position).collect();
        let allocation = allocator::allocate(&positions, index);
        let renumbered = allocation.renumber_required;
        if renumbered {
            renumber_around(&mut tx, &others, index, task.id, cmd.target_list_id).await?;
        } else {
            db::tasks::set_location(&mut tx, task.id, cmd.target_list_id, allocation.position)
                .await?;
        }

        let task = db::tasks::find(&mut *tx, cmd.task_id)
            .await?
            .ok_or(MoveError::NotFound(Missing::Task(cmd.task_id)))?;
        tx.commit().await?;

        Ok(Attempt::Done(MoveOutcome {
            task,
            version: Some(version),
            renumbered,
        }))
    }

    /// Create a task at `data.index` of its list (tail when absent)
    pub async fn insert_task(&self, cmd: CreateTask) -> Result<MoveOutcome, MoveError> {
        let list_id = cmd.data.list_id;
        let list = db::lists::find(&self.pool, list_id)
            .await?
            .ok_or(MoveError::NotFound(Missing::List(list_id)))?;
        self.authorize(cmd.user_id, list.board_id).await?;
        if let Some(index) = cmd.data.index
            && index < 0
        {
            return Err(InvalidTarget::Index { index, max: 0 }.into());
        }

        let new_task = NewTask {
            id: snowflake_id(),
            board_id: list.board_id,
            list_id,
            title: cmd.data.title.trim().to_string(),
            description: cmd.data.description.clone(),
            priority: cmd.data.priority.unwrap_or_default(),
            assignee_id: cmd.data.assignee_id,
            creator_id: cmd.user_id,
            due_date: cmd.data.due_date,
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = {
                let _guards = self.locks.acquire(&[list_id]).await;
                self.try_insert(&new_task, cmd.data.index).await
            };

            match result {
                Ok(outcome) => {
                    let version = outcome.version.unwrap_or_default();
                    tracing::info!(
                        task_id = outcome.task.id,
                        list_id,
                        position = outcome.task.position,
                        version,
                        "Task created"
                    );
                    self.relay.publish(
                        BoardEvent::TaskCreated {
                            board_id: list.board_id,
                            version,
                            task: outcome.task.clone(),
                            renumbered: outcome.renumbered,
                        },
                        cmd.origin.as_deref(),
                    );
                    return Ok(outcome);
                }
                Err(MoveError::Database(err)) if is_busy_box(&err) => {
                    tracing::debug!(list_id, attempts, "Insert hit a busy database");
                }
                Err(e) => return Err(e),
            }

            if attempts > self.max_retries {
                return Err(MoveError::Conflict { attempts });
            }
            tokio::time::sleep(backoff(attempts)).await;
        }
    }

    async fn try_insert(&self, new_task: &NewTask, index: Option<i64>) -> Result<MoveOutcome, MoveError> {
        let mut tx = self.pool.begin().await?;

        let version = db::boards::bump_version(&mut tx, new_task.board_id)
            .await?
            .ok_or(MoveError::NotFound(Missing::Board(new_task.board_id)))?;
        if db::lists::find(&mut *tx, new_task.list_id).await?.is_none() {
            return Err(MoveError::NotFound(Missing::List(new_task.list_id)));
        }

        let others = db::tasks::slots(&mut tx, new_task.list_id, None).await?;
        let index = match index {
            Some(i) => checked_index(i, others.len())?,
            None => others.len(),
        };

        let positions: Vec<i64> = others.iter().map(|s| s.position).collect();
        let allocation = allocator::allocate(&positions, index);
        let renumbered = allocation.renumber_required;
        let position = if renumbered {
            index as i64
        } else {
            allocation.position
        };
        db::tasks::insert(&mut tx, new_task, position).await?;
        if renumbered {
            renumber_around(&mut tx, &others, index, new_task.id, new_task.list_id).await?;
        }

        let task = db::tasks::find(&mut *tx, new_task.id)
            .await?
            .ok_or(MoveError::NotFound(Missing::Task(new_task.id)))?;
        tx.commit().await?;

        Ok(MoveOutcome {
            task,
            version: Some(version),
            renumbered,
        })
    }

    /// Refuse before any write: invisible board reads as missing, visible as read-only
    async fn authorize(&self, user_id: i64, board_id: i64) -> Result<(), MoveError> {
        if self
            .access
            .can_mutate(user_id, board_id)
            .await
            .map_err(MoveError::Database)?
        {
            return Ok(());
        }
        let visible = self
            .access
            .can_view(user_id, board_id)
            .await
            .map_err(MoveError::Database)?;
        tracing::debug!(user_id, board_id, visible, "Board mutation refused");
        if visible {
            Err(MoveError::ReadOnly { board_id })
        } else {
            Err(MoveError::AccessDenied { board_id })
        }
    }
}

/// Rewrite `list_id` densely with `task_id` placed at `index`
///
/// `others` is the list without the task, in display order. The task itself
/// is rewritten too, which also moves it into `list_id`.
async fn renumber_around(
    conn: &mut SqliteConnection,
    others: &[db::tasks::Slot],
    index: usize,
    task_id: i64,
    list_id: i64,
) -> Result<(), sqlx::Error> {
    let mut order: Vec<i64> = others.iter().map(|s| s.id).collect();
    order.insert(index, task_id);
    db::tasks::renumber(conn, list_id, &allocator::renumber(&order)).await?;
    db::tasks::set_location(conn, task_id, list_id, index as i64).await
}

fn checked_index(index: i64, len: usize) -> Result<usize, MoveError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i <= len)
        .ok_or(MoveError::InvalidTarget(InvalidTarget::Index { index, max: len }))
}

fn is_busy_box(err: &db::BoxError) -> bool {
    err.downcast_ref::<sqlx::Error>().is_some_and(db::is_busy)
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(10 * u64::from(attempt.min(10)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SqlBoardAccess;
    use crate::db::testing::temp_db;
    use crate::db::DbService;
    use shared::models::{BoardCreate, BoardRole, MemberUpsert, TaskList};
    use shared::relay::RelayMessage;

    const OWNER: i64 = 1;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: DbService,
        relay: BoardRelay,
        coordinator: MoveCoordinator,
        board_id: i64,
        lists: Vec<TaskList>,
    }

    async fn fixture() -> Fixture {
        let (dir, db) = temp_db().await;
        let board = db::boards::create(
            &db.pool,
            OWNER,
            &BoardCreate {
                title: "B".into(),
                description: None,
                color: None,
                is_private: None,
            },
        )
        .await
        .unwrap();
        let lists = db::lists::list_for_board(&db.pool, board.id).await.unwrap();
        let relay = BoardRelay::new(64);
        let coordinator = MoveCoordinator::new(
            db.pool.clone(),
            Arc::new(SqlBoardAccess::new(db.pool.clone())),
            relay.clone(),
            3,
        );
        Fixture {
            _dir: dir,
            db,
            relay,
            coordinator,
            board_id: board.id,
            lists,
        }
    }

    impl Fixture {
        async fn create(&self, list: usize, title: &str, index: Option<i64>) -> Task {
            self.coordinator
                .insert_task(CreateTask {
                    data: TaskCreate {
                        title: title.into(),
                        description: None,
                        list_id: self.lists[list].id,
                        assignee_id: None,
                        priority: None,
                        due_date: None,
                        index,
                    },
                    user_id: OWNER,
                    origin: None,
                })
                .await
                .unwrap()
                .task
        }

        async fn move_to(&self, task: &Task, list: usize, index: i64) -> Result<MoveOutcome, MoveError> {
            self.coordinator
                .move_task(MoveTask {
                    task_id: task.id,
                    target_list_id: self.lists[list].id,
                    target_index: index,
                    user_id: OWNER,
                    origin: None,
                })
                .await
        }

        async fn order(&self, list: usize) -> Vec<i64> {
            let mut conn = self.db.pool.acquire().await.unwrap();
            db::tasks::slots(&mut conn, self.lists[list].id, None)
                .await
                .unwrap()
                .iter()
                .map(|s| s.id)
                .collect()
        }

        async fn positions(&self, list: usize) -> Vec<i64> {
            let mut conn = self.db.pool.acquire().await.unwrap();
            db::tasks::slots(&mut conn, self.lists[list].id, None)
                .await
                .unwrap()
                .iter()
                .map(|s| s.position)
                .collect()
        }

        async fn version(&self) -> i64 {
            db::boards::find(&self.db.pool, self.board_id)
                .await
                .unwrap()
                .unwrap()
                .version
        }
    }

    #[tokio::test]
    async fn moves_first_to_last() {
        let f = fixture().await;
        let a = f.create(0, "A", None).await;
        let b = f.create(0, "B", None).await;
        let c = f.create(0, "C", None).await;
        assert_eq!(f.order(0).await, vec![a.id, b.id, c.id]);

        let outcome = f.move_to(&a, 0, 2).await.unwrap();
        assert_eq!(f.order(0).await, vec![b.id, c.id, a.id]);
        assert_eq!(outcome.task.id, a.id);
        assert_eq!(outcome.version, Some(4));
        assert!(!outcome.renumbered);
    }

    #[tokio::test]
    async fn moves_between_lists_to_exact_index() {
        let f = fixture().await;
        let a = f.create(0, "A", None).await;
        let x = f.create(1, "X", None).await;
        let y = f.create(1, "Y", None).await;

        let outcome = f.move_to(&a, 1, 1).await.unwrap();
        assert_eq!(outcome.task.list_id, f.lists[1].id);
        assert_eq!(f.order(1).await, vec![x.id, a.id, y.id]);
        assert!(f.order(0).await.is_empty());

        // Past the end of the target is rejected, the end itself is fine
        let err = f.move_to(&x, 2, 1).await.unwrap_err();
        assert!(matches!(err, MoveError::InvalidTarget(InvalidTarget::Index { index: 1, max: 0 })));
        f.move_to(&x, 2, 0).await.unwrap();
        assert_eq!(f.order(2).await, vec![x.id]);
    }

    #[tokio::test]
    async fn same_index_is_a_noop() {
        let f = fixture().await;
        let a = f.create(0, "A", None).await;
        let b = f.create(0, "B", None).await;
        let before = f.version().await;

        let (observer, mut rx) = f.relay.register();
        f.relay.subscribe(&observer, f.board_id);

        let outcome = f.move_to(&b, 0, 1).await.unwrap();
        assert_eq!(outcome.version, None);
        assert_eq!(outcome.task.position, b.position);
        assert_eq!(f.version().await, before);
        assert_eq!(f.order(0).await, vec![a.id, b.id]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn head_inserts_strictly_decrease() {
        let f = fixture().await;
        f.create(0, "seed", None).await;
        for i in 0..10 {
            f.create(0, &format!("head {i}"), Some(0)).await;
        }
        let positions = f.positions(0).await;
        assert_eq!(positions.len(), 11);
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn exhausted_gap_renumbers_densely() {
        let f = fixture().await;
        let mut conn = f.db.pool.acquire().await.unwrap();
        let a = db::tasks::testing::insert_at(&mut conn, &f.lists[0], 10, "a").await;
        let b = db::tasks::testing::insert_at(&mut conn, &f.lists[0], 11, "b").await;
        let c = db::tasks::testing::insert_at(&mut conn, &f.lists[0], 12, "c").await;
        drop(conn);

        // No integer fits between 10 and 11
        let outcome = f.move_to(&c, 0, 1).await.unwrap();
        assert!(outcome.renumbered);
        assert_eq!(outcome.task.position, 1);
        assert_eq!(f.order(0).await, vec![a.id, c.id, b.id]);
        assert_eq!(f.positions(0).await, vec![0, 1, 2]);

        // Gap is still tight at 0..1, so the next insert renumbers again and succeeds
        let d = f.create(0, "d", Some(1)).await;
        assert_eq!(f.order(0).await, vec![a.id, d.id, c.id, b.id]);
        assert_eq!(f.positions(0).await, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn rejects_negative_index_and_missing_rows() {
        let f = fixture().await;
        let a = f.create(0, "A", None).await;

        let err = f.move_to(&a, 1, -1).await.unwrap_err();
        assert!(matches!(err, MoveError::InvalidTarget(InvalidTarget::Index { index: -1, .. })));

        let err = f
            .coordinator
            .move_task(MoveTask {
                task_id: a.id,
                target_list_id: 999,
                target_index: 0,
                user_id: OWNER,
                origin: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MoveError::NotFound(Missing::List(999))));

        let mut ghost = a.clone();
        ghost.id = 424242;
        let err = f.move_to(&ghost, 1, 0).await.unwrap_err();
        assert!(matches!(err, MoveError::NotFound(Missing::Task(424242))));

        // Nothing moved, nothing bumped beyond the create
        assert_eq!(f.order(0).await, vec![a.id]);
        assert_eq!(f.version().await, 1);
    }

    #[tokio::test]
    async fn rejects_list_of_another_board() {
        let f = fixture().await;
        let a = f.create(0, "A", None).await;
        let second = db::boards::create(
            &f.db.pool,
            OWNER,
            &BoardCreate {
                title: "Second".into(),
                description: None,
                color: None,
                is_private: None,
            },
        )
        .await
        .unwrap();
        let target = db::lists::list_for_board(&f.db.pool, second.id)
            .await
            .unwrap()
            .remove(0);

        let err = f
            .coordinator
            .move_task(MoveTask {
                task_id: a.id,
                target_list_id: target.id,
                target_index: 0,
                user_id: OWNER,
                origin: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MoveError::InvalidTarget(InvalidTarget::ForeignList { .. })));
        assert_eq!(f.order(0).await, vec![a.id]);
    }

    #[tokio::test]
    async fn access_is_checked_before_writing() {
        let f = fixture().await;
        let a = f.create(0, "A", None).await;
        let mut conn = f.db.pool.acquire().await.unwrap();
        db::boards::upsert_member(
            &mut conn,
            f.board_id,
            &MemberUpsert {
                user_id: 2,
                role: BoardRole::Viewer,
            },
        )
        .await
        .unwrap();
        drop(conn);
        let before = f.version().await;

        let attempt = |user_id| MoveTask {
            task_id: a.id,
            target_list_id: f.lists[1].id,
            target_index: 0,
            user_id,
            origin: None,
        };

        let err = f.coordinator.move_task(attempt(2)).await.unwrap_err();
        assert!(matches!(err, MoveError::ReadOnly { .. }));
        let err = f.coordinator.move_task(attempt(3)).await.unwrap_err();
        assert!(matches!(err, MoveError::AccessDenied { .. }));

        assert_eq!(f.version().await, before);
        assert_eq!(f.order(0).await, vec![a.id]);
    }

    #[tokio::test]
    async fn publishes_to_everyone_but_the_origin() {
        let f = fixture().await;
        let a = f.create(0, "A", None).await;

        let (origin, mut origin_rx) = f.relay.register();
        let (other, mut other_rx) = f.relay.register();
        f.relay.subscribe(&origin, f.board_id);
        f.relay.subscribe(&other, f.board_id);

        let outcome = f
            .coordinator
            .move_task(MoveTask {
                task_id: a.id,
                target_list_id: f.lists[2].id,
                target_index: 0,
                user_id: OWNER,
                origin: Some(origin.clone()),
            })
            .await
            .unwrap();

        match other_rx.recv().await.unwrap() {
            RelayMessage::Event {
                event:
                    BoardEvent::TaskMoved {
                        board_id,
                        version,
                        task_id,
                        source_list_id,
                        target_list_id,
                        new_position,
                        renumbered,
                    },
            } => {
                assert_eq!(board_id, f.board_id);
                assert_eq!(Some(version), outcome.version);
                assert_eq!(task_id, a.id);
                assert_eq!(source_list_id, f.lists[0].id);
                assert_eq!(target_list_id, f.lists[2].id);
                assert_eq!(new_position, outcome.task.position);
                assert!(!renumbered);
            }
            other => panic!("Expected TaskMoved, got {other:?}"),
        }
        assert!(origin_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn concurrent_moves_to_different_indices_stay_consistent() {
        let f = fixture().await;
        // Seed the target so every index in 0..=4 stays valid throughout
        let mut seeds = Vec::new();
        for i in 0..4 {
            seeds.push(f.create(1, &format!("s{i}"), None).await.id);
        }
        let mut tasks = Vec::new();
        for i in 0..8 {
            tasks.push(f.create(0, &format!("t{i}"), None).await);
        }

        let mut handles = Vec::new();
        for (i, task) in tasks.iter().enumerate() {
            let coordinator = f.coordinator.clone();
            let cmd = MoveTask {
                task_id: task.id,
                target_list_id: f.lists[1].id,
                target_index: (i % 5) as i64,
                user_id: OWNER,
                origin: None,
            };
            let delay = (i % 3) as u64;
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                coordinator.move_task(cmd).await
            }));
        }
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert_eq!(outcome.task.list_id, f.lists[1].id);
            assert!(outcome.version.is_some());
        }

        let order = f.order(1).await;
        assert_eq!(order.len(), 12);
        assert!(f.order(0).await.is_empty());
        for task in &tasks {
            assert!(order.contains(&task.id));
        }
        // Seeds were never moved, so they keep their relative order
        let seed_order: Vec<i64> = order.iter().copied().filter(|id| seeds.contains(id)).collect();
        assert_eq!(seed_order, seeds);

        let positions = f.positions(1).await;
        let mut unique = positions.clone();
        unique.dedup();
        assert_eq!(unique.len(), positions.len(), "duplicate positions: {positions:?}");

        // 12 creates + 8 moves, each bumped the version exactly once
        assert_eq!(f.version().await, 20);
    }
}
