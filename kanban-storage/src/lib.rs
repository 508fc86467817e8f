//! Kanban Storage - Transaction Seam and In-Memory Store
//!
//! A [`LedgerStore`] hands out [`LedgerTx`] transactions. Each transaction
//! exposes the primitive statements a ledger operation is built from and is
//! consumed by `commit` or `rollback`. Dropping a transaction without either
//! must discard every write it made.
//!
//! The PostgreSQL implementation lives in kanban-api next to its pool.

pub mod memory;

pub use memory::{MemoryState, MemoryStore, MemoryTx};

use async_trait::async_trait;
use kanban_core::{
    Board, BoardId, Column, ColumnId, Container, EntityRef, KanbanError, Position, Shift, Task,
    TaskContent, TaskId, Timestamp, UserId,
};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Failures raised by a store. They never reach a caller verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("connection unavailable: {reason}")]
    Connection { reason: String },

    #[error("query failed: {reason}")]
    Query { reason: String },

    #[error("constraint violated: {reason}")]
    Constraint { reason: String },

    #[error("transaction already finished")]
    TransactionClosed,

    #[error("injected fault during {operation}")]
    Injected { operation: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for KanbanError {
    fn from(err: StorageError) -> Self {
        KanbanError::internal(err.to_string())
    }
}

// ============================================================================
// TRAITS
// ============================================================================

/// Source of transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Open a transaction.
    async fn begin(&self) -> StorageResult<Self::Tx>;

    /// Round-trip to the backing store, used by readiness checks.
    async fn ping(&self) -> StorageResult<()>;
}

/// One open transaction.
///
/// Reads see the transaction's own writes. Nothing is visible to other
/// transactions until `commit` returns.
#[async_trait]
pub trait LedgerTx: Send + Sized {
    // ========================================================================
    // OWNERSHIP
    // ========================================================================

    /// Walk the containment chain of `entity` to its owning user.
    async fn owner_of(&mut self, entity: EntityRef) -> StorageResult<Option<UserId>>;

    /// Block until no other transaction holds the lock for `owner`.
    /// Held until this transaction ends.
    async fn lock_owner(&mut self, owner: UserId) -> StorageResult<()>;

    // ========================================================================
    // CONTAINERS
    // ========================================================================

    /// Number of items currently in `container`.
    async fn count(&mut self, container: Container) -> StorageResult<usize>;

    /// `max(position) + 1`, or 1 for an empty container.
    async fn next_position(&mut self, container: Container) -> StorageResult<Position>;

    /// Apply `shift` to every item of `container`. Returns the rows touched.
    async fn shift(&mut self, container: Container, shift: Shift) -> StorageResult<u64>;

    // ========================================================================
    // BOARDS
    // ========================================================================

    async fn insert_board(&mut self, board: &Board) -> StorageResult<()>;

    async fn get_board(&mut self, id: BoardId) -> StorageResult<Option<Board>>;

    async fn list_boards(&mut self, owner: UserId) -> StorageResult<Vec<Board>>;

    async fn rename_board(&mut self, id: BoardId, name: &str, at: Timestamp)
        -> StorageResult<()>;

    /// Delete a board together with its columns and their tasks.
    async fn delete_board(&mut self, id: BoardId) -> StorageResult<()>;

    // ========================================================================
    // COLUMNS
    // ========================================================================

    async fn insert_column(&mut self, column: &Column) -> StorageResult<()>;

    async fn get_column(&mut self, id: ColumnId) -> StorageResult<Option<Column>>;

    /// Columns of a board ordered by position.
    async fn list_columns(&mut self, board: BoardId) -> StorageResult<Vec<Column>>;

    async fn rename_column(&mut self, id: ColumnId, name: &str, at: Timestamp)
        -> StorageResult<()>;

    async fn set_column_position(
        &mut self,
        id: ColumnId,
        position: Position,
        at: Timestamp,
    ) -> StorageResult<()>;

    /// Delete a column together with its tasks. No compaction.
    async fn delete_column(&mut self, id: ColumnId) -> StorageResult<()>;

    // ========================================================================
    // TASKS
    // ========================================================================

    async fn insert_task(&mut self, task: &Task) -> StorageResult<()>;

    async fn get_task(&mut self, id: TaskId) -> StorageResult<Option<Task>>;

    /// Tasks of a column ordered by position.
    async fn list_tasks(&mut self, column: ColumnId) -> StorageResult<Vec<Task>>;

    async fn update_task_content(
        &mut self,
        id: TaskId,
        content: &TaskContent,
        at: Timestamp,
    ) -> StorageResult<()>;

    /// Place a task at `position` of `column`, which may differ from its
    /// current column.
    async fn set_task_position(
        &mut self,
        id: TaskId,
        column: ColumnId,
        position: Position,
        at: Timestamp,
    ) -> StorageResult<()>;

    /// Delete a task. No compaction.
    async fn delete_task(&mut self, id: TaskId) -> StorageResult<()>;

    // ========================================================================
    // COMPLETION
    // ========================================================================

    async fn commit(self) -> StorageResult<()>;

    async fn rollback(self) -> StorageResult<()>;
}
