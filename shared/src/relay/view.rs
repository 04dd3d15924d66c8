//! Observer-side board state
//!
//! A client viewing one board keeps a `BoardView` built from the board detail
//! snapshot and feeds it every relay event. Events are patched in place when
//! they carry enough data; otherwise the view asks for a full re-fetch, which
//! also heals any event the relay dropped.

use crate::models::{Board, BoardDetail, Task, TaskList};

use super::ws::BoardEvent;

/// Outcome of applying one relay event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Local state updated, no round trip needed
    Patched,
    /// Event is for another board, already seen, or older than the snapshot
    Ignored,
    /// Local state can no longer be trusted; reload the board detail
    Refetch,
}

#[derive(Debug, Clone)]
pub struct BoardView {
    board: Board,
    lists: Vec<TaskList>,
    tasks: Vec<Task>,
}

impl BoardView {
    pub fn from_detail(detail: BoardDetail) -> Self {
        let mut view = Self {
            board: detail.board,
            lists: detail.lists,
            tasks: detail.tasks,
        };
        view.lists.sort_by_key(|l| (l.position, l.created_at, l.id));
        view.tasks.sort_by_key(Task::sort_key);
        view
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn version(&self) -> i64 {
        self.board.version
    }

    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    pub fn task(&self, task_id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Task ids of one list in display order
    pub fn list_order(&self, list_id: i64) -> Vec<i64> {
        self.tasks
            .iter()
            .filter(|t| t.list_id == list_id)
            .map(|t| t.id)
            .collect()
    }

    /// Apply a relay event for the viewed board
    pub fn apply(&mut self, event: &BoardEvent) -> Reconcile {
        if event.board_id() != self.board.id || event.version() <= self.board.version {
            return Reconcile::Ignored;
        }
        if event.version() != self.board.version + 1 {
            // At least one event was lost between the last one and this one
            return Reconcile::Refetch;
        }

        let outcome = match event {
            BoardEvent::TaskMoved {
                task_id,
                target_list_id,
                new_position,
                renumbered,
                ..
            } => {
                if *renumbered {
                    Reconcile::Refetch
                } else if let Some(task) = self.tasks.iter_mut().find(|t| t.id == *task_id) {
                    task.list_id = *target_list_id;
                    task.position = *new_position;
                    Reconcile::Patched
                } else {
                    Reconcile::Refetch
                }
            }
            BoardEvent::TaskCreated {
                task, renumbered, ..
            } => {
                if *renumbered {
                    Reconcile::Refetch
                } else {
                    self.tasks.retain(|t| t.id != task.id);
                    self.tasks.push(task.clone());
                    Reconcile::Patched
                }
            }
            BoardEvent::TaskUpdated { task, .. } => {
                match self.tasks.iter_mut().find(|t| t.id == task.id) {
                    Some(existing) => {
                        *existing = task.clone();
                        Reconcile::Patched
                    }
                    None => Reconcile::Refetch,
                }
            }
            BoardEvent::TaskDeleted { task_id, .. } => {
                self.tasks.retain(|t| t.id != *task_id);
                Reconcile::Patched
            }
            BoardEvent::ListCreated { list, .. } | BoardEvent::ListUpdated { list, .. } => {
                self.lists.retain(|l| l.id != list.id);
                self.lists.push(list.clone());
                Reconcile::Patched
            }
            BoardEvent::ListDeleted { list_id, .. } => {
                self.lists.retain(|l| l.id != *list_id);
                self.tasks.retain(|t| t.list_id != *list_id);
                Reconcile::Patched
            }
            BoardEvent::BoardUpdated { board, .. } => {
                self.board = board.clone();
                Reconcile::Patched
            }
        };

        if outcome == Reconcile::Patched {
            self.board.version = event.version();
            self.resort();
        }
        outcome
    }

    /// Optimistic drag-and-drop update before the server answers
    ///
    /// Places the task at `index` of `list_id` with a provisional position;
    /// [`BoardView::confirm`] replaces it with the authoritative row.
    pub fn apply_local_move(&mut self, task_id: i64, list_id: i64, index: usize) -> bool {
        let Some(pos) = self.tasks.iter().position(|t| t.id == task_id) else {
            return false;
        };
        let mut task = self.tasks.remove(pos);

        let siblings: Vec<&Task> = self.tasks.iter().filter(|t| t.list_id == list_id).collect();
        let index = index.min(siblings.len());
        task.list_id = list_id;
        task.position = match (index.checked_sub(1).map(|i| siblings[i]), siblings.get(index)) {
            (None, None) => 0,
            (None, Some(next)) => next.position.saturating_sub(1),
            (Some(prev), None) => prev.position.saturating_add(1),
            // Provisional only: ties sort by creation, confirm() fixes it
            (Some(prev), Some(_)) => prev.position,
        };

        // Insert right before the task currently at `index` to keep the visual order
        let insert_at = siblings
            .get(index)
            .and_then(|next| self.tasks.iter().position(|t| t.id == next.id))
            .unwrap_or_else(|| {
                self.tasks
                    .iter()
                    .rposition(|t| t.list_id == list_id)
                    .map(|i| i + 1)
                    .unwrap_or(self.tasks.len())
            });
        self.tasks.insert(insert_at, task);
        true
    }

    /// Replace a task with the server's copy after our own mutation
    ///
    /// `version` is the board version returned with the response; the relay
    /// never echoes our own change back, so this is how the view catches up.
    pub fn confirm(&mut self, task: Task, version: i64) -> Reconcile {
        if version != self.board.version + 1 {
            return Reconcile::Refetch;
        }
        self.tasks.retain(|t| t.id != task.id);
        self.tasks.push(task);
        self.board.version = version;
        self.resort();
        Reconcile::Patched
    }

    fn resort(&mut self) {
        self.lists.sort_by_key(|l| (l.position, l.created_at, l.id));
        self.tasks.sort_by_key(Task::sort_key);
    }
}
