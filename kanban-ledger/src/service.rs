//! Service facade over the ledger
//!
//! One method per operation. Each opens its own unit of work, runs the
//! ledger function and commits or rolls back before returning.

use crate::capacity::Limits;
use crate::coordinator::UnitOfWork;
use crate::ledger;
use kanban_core::{
    Board, BoardId, Column, ColumnId, ColumnUpdate, KanbanResult, Position, Task, TaskContent,
    TaskId, TaskUpdate, UserId,
};
use kanban_storage::LedgerStore;
use std::sync::Arc;

/// Entry point for every board, column and task operation.
pub struct KanbanService<S: LedgerStore> {
    store: Arc<S>,
    limits: Limits,
}

impl<S: LedgerStore> Clone for KanbanService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            limits: self.limits,
        }
    }
}

impl<S: LedgerStore> KanbanService<S> {
    pub fn new(store: Arc<S>, limits: Limits) -> Self {
        Self { store, limits }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn begin(&self, operation: &'static str) -> KanbanResult<UnitOfWork<S::Tx>> {
        UnitOfWork::begin(self.store.as_ref(), operation).await
    }

    // ========================================================================
    // BOARDS
    // ========================================================================

    pub async fn create_board(&self, caller: UserId, name: &str) -> KanbanResult<Board> {
        let mut work = self.begin("create_board").await?;
        let result = ledger::create_board(work.tx(), caller, name).await;
        let board = work.finish(result).await?;
        tracing::info!(%caller, board_id = %board.id, "Board created");
        Ok(board)
    }

    pub async fn list_boards(&self, caller: UserId) -> KanbanResult<Vec<Board>> {
        let mut work = self.begin("list_boards").await?;
        let result = ledger::list_boards(work.tx(), caller).await;
        work.finish(result).await
    }

    pub async fn get_board(&self, caller: UserId, id: BoardId) -> KanbanResult<Board> {
        let mut work = self.begin("get_board").await?;
        let result = ledger::get_board(work.tx(), caller, id).await;
        work.finish(result).await
    }

    pub async fn rename_board(
        &self,
        caller: UserId,
        id: BoardId,
        name: &str,
    ) -> KanbanResult<Board> {
        let mut work = self.begin("rename_board").await?;
        let result = ledger::rename_board(work.tx(), caller, id, name).await;
        let board = work.finish(result).await?;
        tracing::info!(%caller, board_id = %id, "Board renamed");
        Ok(board)
    }

    pub async fn delete_board(&self, caller: UserId, id: BoardId) -> KanbanResult<()> {
        let mut work = self.begin("delete_board").await?;
        let result = ledger::delete_board(work.tx(), caller, id).await;
        work.finish(result).await?;
        tracing::info!(%caller, board_id = %id, "Board deleted");
        Ok(())
    }

    // ========================================================================
    // COLUMNS
    // ========================================================================

    pub async fn create_column(
        &self,
        caller: UserId,
        board: BoardId,
        name: &str,
    ) -> KanbanResult<Column> {
        let mut work = self.begin("create_column").await?;
        let result = ledger::create_column(work.tx(), &self.limits, caller, board, name).await;
        let column = work.finish(result).await?;
        tracing::info!(
            %caller,
            board_id = %board,
            column_id = %column.id,
            position = column.position,
            "Column created"
        );
        Ok(column)
    }

    pub async fn list_columns(&self, caller: UserId, board: BoardId) -> KanbanResult<Vec<Column>> {
        let mut work = self.begin("list_columns").await?;
        let result = ledger::list_columns(work.tx(), caller, board).await;
        work.finish(result).await
    }

    pub async fn get_column(&self, caller: UserId, id: ColumnId) -> KanbanResult<Column> {
        let mut work = self.begin("get_column").await?;
        let result = ledger::get_column(work.tx(), caller, id).await;
        work.finish(result).await
    }

    pub async fn reorder_column(
        &self,
        caller: UserId,
        id: ColumnId,
        new_position: Position,
    ) -> KanbanResult<Column> {
        let mut work = self.begin("reorder_column").await?;
        let result = ledger::reorder_column(work.tx(), caller, id, new_position).await;
        let column = work.finish(result).await?;
        tracing::info!(%caller, column_id = %id, position = column.position, "Column reordered");
        Ok(column)
    }

    pub async fn update_column(
        &self,
        caller: UserId,
        id: ColumnId,
        update: ColumnUpdate,
    ) -> KanbanResult<Column> {
        let mut work = self.begin("update_column").await?;
        let result = ledger::update_column(work.tx(), caller, id, update).await;
        let column = work.finish(result).await?;
        tracing::info!(%caller, column_id = %id, position = column.position, "Column updated");
        Ok(column)
    }

    pub async fn delete_column(&self, caller: UserId, id: ColumnId) -> KanbanResult<()> {
        let mut work = self.begin("delete_column").await?;
        let result = ledger::delete_column(work.tx(), caller, id).await;
        work.finish(result).await?;
        tracing::info!(%caller, column_id = %id, "Column deleted");
        Ok(())
    }

    // ========================================================================
    // TASKS
    // ========================================================================

    pub async fn create_task(
        &self,
        caller: UserId,
        column: ColumnId,
        name: &str,
        description: &str,
    ) -> KanbanResult<Task> {
        let mut work = self.begin("create_task").await?;
        let result =
            ledger::create_task(work.tx(), &self.limits, caller, column, name, description).await;
        let task = work.finish(result).await?;
        tracing::info!(
            %caller,
            column_id = %column,
            task_id = %task.id,
            position = task.position,
            "Task created"
        );
        Ok(task)
    }

    pub async fn list_tasks(&self, caller: UserId, column: ColumnId) -> KanbanResult<Vec<Task>> {
        let mut work = self.begin("list_tasks").await?;
        let result = ledger::list_tasks(work.tx(), caller, column).await;
        work.finish(result).await
    }

    pub async fn get_task(&self, caller: UserId, id: TaskId) -> KanbanResult<Task> {
        let mut work = self.begin("get_task").await?;
        let result = ledger::get_task(work.tx(), caller, id).await;
        work.finish(result).await
    }

    pub async fn update_task_content(
        &self,
        caller: UserId,
        id: TaskId,
        content: &TaskContent,
    ) -> KanbanResult<Task> {
        let mut work = self.begin("update_task_content").await?;
        let result = ledger::update_task_content(work.tx(), caller, id, content).await;
        let task = work.finish(result).await?;
        tracing::info!(%caller, task_id = %id, "Task content updated");
        Ok(task)
    }

    pub async fn move_task_position(
        &self,
        caller: UserId,
        id: TaskId,
        new_position: Position,
    ) -> KanbanResult<Task> {
        let mut work = self.begin("move_task_position").await?;
        let result = ledger::move_task_position(work.tx(), caller, id, new_position).await;
        let task = work.finish(result).await?;
        tracing::info!(%caller, task_id = %id, position = task.position, "Task reordered");
        Ok(task)
    }

    pub async fn move_task_to_column(
        &self,
        caller: UserId,
        id: TaskId,
        dest: ColumnId,
        new_position: Position,
    ) -> KanbanResult<Task> {
        let mut work = self.begin("move_task_to_column").await?;
        let result = ledger::move_task_to_column(work.tx(), caller, id, dest, new_position).await;
        let task = work.finish(result).await?;
        tracing::info!(
            %caller,
            task_id = %id,
            column_id = %dest,
            position = task.position,
            "Task moved"
        );
        Ok(task)
    }

    /// Apply a classified task update in one transaction.
    pub async fn update_task(
        &self,
        caller: UserId,
        id: TaskId,
        update: TaskUpdate,
    ) -> KanbanResult<Task> {
        let mut work = self.begin("update_task").await?;
        let result = ledger::update_task(work.tx(), caller, id, update).await;
        let task = work.finish(result).await?;
        tracing::info!(
            %caller,
            task_id = %id,
            column_id = %task.column_id,
            position = task.position,
            "Task updated"
        );
        Ok(task)
    }

    pub async fn delete_task(&self, caller: UserId, id: TaskId) -> KanbanResult<()> {
        let mut work = self.begin("delete_task").await?;
        let result = ledger::delete_task(work.tx(), caller, id).await;
        work.finish(result).await?;
        tracing::info!(%caller, task_id = %id, "Task deleted");
        Ok(())
    }
}
