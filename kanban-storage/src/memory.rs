//! In-memory store with snapshot transactions
//!
//! `begin` takes the store-wide lock and clones the state into a working
//! copy. `commit` writes the copy back, `rollback` or drop throws it away.
//! Holding the lock for the whole transaction serializes every transaction,
//! which is stronger than the per-owner serialization the PostgreSQL store
//! gives and fine for tests and local runs.

use crate::{LedgerStore, LedgerTx, StorageError, StorageResult};
use async_trait::async_trait;
use kanban_core::{
    Board, BoardId, Column, ColumnId, Container, EntityRef, Position, Shift, Task, TaskContent,
    TaskId, Timestamp, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

// ============================================================================
// STATE
// ============================================================================

/// Everything the store holds.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    boards: HashMap<BoardId, Board>,
    columns: HashMap<ColumnId, Column>,
    tasks: HashMap<TaskId, Task>,
}

impl MemoryState {
    pub fn boards(&self) -> impl Iterator<Item = &Board> {
        self.boards.values()
    }

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Columns of `board` ordered by position.
    pub fn columns_of(&self, board: BoardId) -> Vec<Column> {
        let mut columns: Vec<Column> = self
            .columns
            .values()
            .filter(|c| c.board_id == board)
            .cloned()
            .collect();
        columns.sort_by_key(|c| c.position);
        columns
    }

    /// Tasks of `column` ordered by position.
    pub fn tasks_of(&self, column: ColumnId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.column_id == column)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.position);
        tasks
    }

    fn positions_of(&self, container: Container) -> Vec<Position> {
        match container {
            Container::Board(board) => self
                .columns
                .values()
                .filter(|c| c.board_id == board)
                .map(|c| c.position)
                .collect(),
            Container::Column(column) => self
                .tasks
                .values()
                .filter(|t| t.column_id == column)
                .map(|t| t.position)
                .collect(),
        }
    }

    fn owner_of(&self, entity: EntityRef) -> Option<UserId> {
        match entity {
            EntityRef::Board(id) => self.boards.get(&id).map(|b| b.user_id),
            EntityRef::Column(id) => self
                .columns
                .get(&id)
                .and_then(|c| self.owner_of(EntityRef::Board(c.board_id))),
            EntityRef::Task(id) => self
                .tasks
                .get(&id)
                .and_then(|t| self.owner_of(EntityRef::Column(t.column_id))),
        }
    }

    /// Same check as the deferred unique constraints of the SQL schema.
    fn check_unique_positions(&self) -> StorageResult<()> {
        let mut columns = HashSet::new();
        for column in self.columns.values() {
            if !columns.insert((column.board_id, column.position)) {
                return Err(StorageError::Constraint {
                    reason: format!(
                        "duplicate column position {} in board {}",
                        column.position, column.board_id
                    ),
                });
            }
        }
        let mut tasks = HashSet::new();
        for task in self.tasks.values() {
            if !tasks.insert((task.column_id, task.position)) {
                return Err(StorageError::Constraint {
                    reason: format!(
                        "duplicate task position {} in column {}",
                        task.position, task.column_id
                    ),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// STORE
// ============================================================================

/// In-memory [`LedgerStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_at: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th write from now fail. `0` disables injection.
    pub fn fail_nth_write(&self, n: usize) {
        self.fail_at.store(n, Ordering::SeqCst);
    }

    /// Copy of the committed state. Waits for any open transaction.
    pub async fn snapshot(&self) -> MemoryState {
        let state = self.state.lock().await;
        (*state).clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StorageResult<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(MemoryTx {
            guard,
            working,
            fail_at: self.fail_at.clone(),
        })
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Open transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_at: Arc<AtomicUsize>,
}

impl MemoryTx {
    fn check_write(&self, operation: &str) -> StorageResult<()> {
        let previous = self
            .fail_at
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match previous {
            Ok(1) => {
                tracing::debug!(operation, "Injected write failure");
                Err(StorageError::Injected {
                    operation: operation.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn column_mut(&mut self, id: ColumnId) -> StorageResult<&mut Column> {
        self.working
            .columns
            .get_mut(&id)
            .ok_or_else(|| StorageError::Query {
                reason: format!("column {id} does not exist"),
            })
    }

    fn task_mut(&mut self, id: TaskId) -> StorageResult<&mut Task> {
        self.working
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StorageError::Query {
                reason: format!("task {id} does not exist"),
            })
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn owner_of(&mut self, entity: EntityRef) -> StorageResult<Option<UserId>> {
        Ok(self.working.owner_of(entity))
    }

    async fn lock_owner(&mut self, _owner: UserId) -> StorageResult<()> {
        // Already exclusive: the store lock is held for the whole transaction.
        Ok(())
    }

    async fn count(&mut self, container: Container) -> StorageResult<usize> {
        Ok(self.working.positions_of(container).len())
    }

    async fn next_position(&mut self, container: Container) -> StorageResult<Position> {
        let max = self
            .working
            .positions_of(container)
            .into_iter()
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    async fn shift(&mut self, container: Container, shift: Shift) -> StorageResult<u64> {
        self.check_write("shift")?;
        let mut touched = 0;
        match container {
            Container::Board(board) => {
                for column in self.working.columns.values_mut() {
                    if column.board_id == board && shift.range.contains(column.position) {
                        column.position = shift.apply(column.position);
                        touched += 1;
                    }
                }
            }
            Container::Column(id) => {
                for task in self.working.tasks.values_mut() {
                    if task.column_id == id && shift.range.contains(task.position) {
                        task.position = shift.apply(task.position);
                        touched += 1;
                    }
                }
            }
        }
        Ok(touched)
    }

    async fn insert_board(&mut self, board: &Board) -> StorageResult<()> {
        self.check_write("insert_board")?;
        self.working.boards.insert(board.id, board.clone());
        Ok(())
    }

    async fn get_board(&mut self, id: BoardId) -> StorageResult<Option<Board>> {
        Ok(self.working.boards.get(&id).cloned())
    }

    async fn list_boards(&mut self, owner: UserId) -> StorageResult<Vec<Board>> {
        let mut boards: Vec<Board> = self
            .working
            .boards
            .values()
            .filter(|b| b.user_id == owner)
            .cloned()
            .collect();
        boards.sort_by_key(|b| (b.created_at, b.id));
        Ok(boards)
    }

    async fn rename_board(&mut self, id: BoardId, name: &str, at: Timestamp) -> StorageResult<()> {
        self.check_write("rename_board")?;
        let board = self
            .working
            .boards
            .get_mut(&id)
            .ok_or_else(|| StorageError::Query {
                reason: format!("board {id} does not exist"),
            })?;
        board.name = name.to_string();
        board.updated_at = at;
        Ok(())
    }

    async fn delete_board(&mut self, id: BoardId) -> StorageResult<()> {
        self.check_write("delete_board")?;
        self.working.boards.remove(&id);
        let columns: HashSet<ColumnId> = self
            .working
            .columns
            .values()
            .filter(|c| c.board_id == id)
            .map(|c| c.id)
            .collect();
        self.working.columns.retain(|_, c| c.board_id != id);
        self.working
            .tasks
            .retain(|_, t| !columns.contains(&t.column_id));
        Ok(())
    }

    async fn insert_column(&mut self, column: &Column) -> StorageResult<()> {
        self.check_write("insert_column")?;
        if !self.working.boards.contains_key(&column.board_id) {
            return Err(StorageError::Constraint {
                reason: format!("board {} does not exist", column.board_id),
            });
        }
        self.working.columns.insert(column.id, column.clone());
        Ok(())
    }

    async fn get_column(&mut self, id: ColumnId) -> StorageResult<Option<Column>> {
        Ok(self.working.columns.get(&id).cloned())
    }

    async fn list_columns(&mut self, board: BoardId) -> StorageResult<Vec<Column>> {
        Ok(self.working.columns_of(board))
    }

    async fn rename_column(&mut self, id: ColumnId, name: &str, at: Timestamp) -> StorageResult<()> {
        self.check_write("rename_column")?;
        let column = self.column_mut(id)?;
        column.name = name.to_string();
        column.updated_at = at;
        Ok(())
    }

    async fn set_column_position(
        &mut self,
        id: ColumnId,
        position: Position,
        at: Timestamp,
    ) -> StorageResult<()> {
        self.check_write("set_column_position")?;
        let column = self.column_mut(id)?;
        column.position = position;
        column.updated_at = at;
        Ok(())
    }

    async fn delete_column(&mut self, id: ColumnId) -> StorageResult<()> {
        self.check_write("delete_column")?;
        self.working.columns.remove(&id);
        self.working.tasks.retain(|_, t| t.column_id != id);
        Ok(())
    }

    async fn insert_task(&mut self, task: &Task) -> StorageResult<()> {
        self.check_write("insert_task")?;
        if !self.working.columns.contains_key(&task.column_id) {
            return Err(StorageError::Constraint {
                reason: format!("column {} does not exist", task.column_id),
            });
        }
        self.working.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&mut self, id: TaskId) -> StorageResult<Option<Task>> {
        Ok(self.working.tasks.get(&id).cloned())
    }

    async fn list_tasks(&mut self, column: ColumnId) -> StorageResult<Vec<Task>> {
        Ok(self.working.tasks_of(column))
    }

    async fn update_task_content(
        &mut self,
        id: TaskId,
        content: &TaskContent,
        at: Timestamp,
    ) -> StorageResult<()> {
        self.check_write("update_task_content")?;
        let task = self.task_mut(id)?;
        content.apply_to(task);
        task.updated_at = at;
        Ok(())
    }

    async fn set_task_position(
        &mut self,
        id: TaskId,
        column: ColumnId,
        position: Position,
        at: Timestamp,
    ) -> StorageResult<()> {
        self.check_write("set_task_position")?;
        if !self.working.columns.contains_key(&column) {
            return Err(StorageError::Constraint {
                reason: format!("column {column} does not exist"),
            });
        }
        let task = self.task_mut(id)?;
        task.column_id = column;
        task.position = position;
        task.updated_at = at;
        Ok(())
    }

    async fn delete_task(&mut self, id: TaskId) -> StorageResult<()> {
        self.check_write("delete_task")?;
        self.working.tasks.remove(&id);
        Ok(())
    }

    async fn commit(self) -> StorageResult<()> {
        let MemoryTx {
            mut guard, working, ..
        } = self;
        working.check_unique_positions()?;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kanban_core::{EntityIdType, PositionRange};

    fn board(owner: UserId) -> Board {
        let now = Utc::now();
        Board {
            id: BoardId::now_v7(),
            user_id: owner,
            name: "Board".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn column(board: BoardId, position: Position) -> Column {
        let now = Utc::now();
        Column {
            id: ColumnId::now_v7(),
            board_id: board,
            name: format!("Column {position}"),
            position,
            created_at: now,
            updated_at: now,
        }
    }

    fn task(column: ColumnId, position: Position) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId::now_v7(),
            column_id: column,
            name: format!("Task {position}"),
            description: String::new(),
            position,
            done: false,
            deadline: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let owner = UserId::now_v7();
        let b = board(owner);

        let mut tx = store.begin().await.unwrap();
        tx.insert_board(&b).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.snapshot().await.board_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_discards_writes() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_board(&board(UserId::now_v7())).await.unwrap();
        }
        assert_eq!(store.snapshot().await.board_count(), 0);
    }

    #[tokio::test]
    async fn test_owner_walks_chain() {
        let store = MemoryStore::new();
        let owner = UserId::now_v7();
        let b = board(owner);
        let c = column(b.id, 1);
        let t = task(c.id, 1);

        let mut tx = store.begin().await.unwrap();
        tx.insert_board(&b).await.unwrap();
        tx.insert_column(&c).await.unwrap();
        tx.insert_task(&t).await.unwrap();

        assert_eq!(tx.owner_of(EntityRef::Task(t.id)).await.unwrap(), Some(owner));
        assert_eq!(tx.owner_of(EntityRef::Column(c.id)).await.unwrap(), Some(owner));
        assert_eq!(
            tx.owner_of(EntityRef::Task(TaskId::now_v7())).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_next_position_and_shift() {
        let store = MemoryStore::new();
        let b = board(UserId::now_v7());
        let mut tx = store.begin().await.unwrap();
        tx.insert_board(&b).await.unwrap();
        let container = Container::Board(b.id);
        assert_eq!(tx.next_position(container).await.unwrap(), 1);

        for position in 1..=3 {
            tx.insert_column(&column(b.id, position)).await.unwrap();
        }
        assert_eq!(tx.next_position(container).await.unwrap(), 4);

        let touched = tx
            .shift(container, Shift::open(PositionRange::from(2)))
            .await
            .unwrap();
        assert_eq!(touched, 2);
        let positions: Vec<Position> = tx
            .list_columns(b.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.position)
            .collect();
        assert_eq!(positions, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_commit_rejects_duplicate_positions() {
        let store = MemoryStore::new();
        let b = board(UserId::now_v7());
        let mut tx = store.begin().await.unwrap();
        tx.insert_board(&b).await.unwrap();
        tx.insert_column(&column(b.id, 1)).await.unwrap();
        tx.insert_column(&column(b.id, 1)).await.unwrap();

        assert!(matches!(
            tx.commit().await,
            Err(StorageError::Constraint { .. })
        ));
        assert_eq!(store.snapshot().await.board_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_board_cascades() {
        let store = MemoryStore::new();
        let b = board(UserId::now_v7());
        let c = column(b.id, 1);
        let mut tx = store.begin().await.unwrap();
        tx.insert_board(&b).await.unwrap();
        tx.insert_column(&c).await.unwrap();
        tx.insert_task(&task(c.id, 1)).await.unwrap();
        tx.delete_board(b.id).await.unwrap();
        tx.commit().await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.column_count(), 0);
        assert_eq!(state.task_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_fault_hits_nth_write() {
        let store = MemoryStore::new();
        store.fail_nth_write(2);
        let mut tx = store.begin().await.unwrap();
        tx.insert_board(&board(UserId::now_v7())).await.unwrap();
        let err = tx
            .insert_board(&board(UserId::now_v7()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Injected { .. }));
        // Disarmed after firing.
        tx.insert_board(&board(UserId::now_v7())).await.unwrap();
    }
}
