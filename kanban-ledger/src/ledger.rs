//! Position ledger operations
//!
//! Each function runs against an open transaction and leaves every
//! container it touched dense at `1..=count`. None of them commit: the
//! caller decides through [`crate::UnitOfWork`].
//!
//! Order inside every mutating operation is fixed: gate, re-read the row
//! under the owner lock, capacity (inserts only), plan, apply.

use crate::capacity::{check_capacity, Limits};
use crate::gate::authorize;
use chrono::Utc;
use kanban_core::{
    plan_move, plan_removal, plan_reorder, validate_name, Board, BoardId, Column, ColumnId,
    ColumnUpdate, Container, EntityIdType, EntityKind, EntityRef, KanbanError, KanbanResult,
    Position, Task, TaskContent, TaskId, TaskUpdate, UserId,
};
use kanban_storage::LedgerTx;

async fn load_board<T: LedgerTx>(tx: &mut T, id: BoardId) -> KanbanResult<Board> {
    tx.get_board(id).await?.ok_or(KanbanError::NotFound {
        kind: EntityKind::Board,
        id: id.as_uuid(),
    })
}

async fn load_column<T: LedgerTx>(tx: &mut T, id: ColumnId) -> KanbanResult<Column> {
    tx.get_column(id).await?.ok_or(KanbanError::NotFound {
        kind: EntityKind::Column,
        id: id.as_uuid(),
    })
}

async fn load_task<T: LedgerTx>(tx: &mut T, id: TaskId) -> KanbanResult<Task> {
    tx.get_task(id).await?.ok_or(KanbanError::NotFound {
        kind: EntityKind::Task,
        id: id.as_uuid(),
    })
}

// ============================================================================
// BOARDS
// ============================================================================

pub async fn create_board<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    name: &str,
) -> KanbanResult<Board> {
    let name = validate_name("name", name)?;
    tx.lock_owner(caller).await?;
    let now = Utc::now();
    let board = Board {
        id: BoardId::now_v7(),
        user_id: caller,
        name,
        created_at: now,
        updated_at: now,
    };
    tx.insert_board(&board).await?;
    Ok(board)
}

pub async fn list_boards<T: LedgerTx>(tx: &mut T, caller: UserId) -> KanbanResult<Vec<Board>> {
    Ok(tx.list_boards(caller).await?)
}

pub async fn get_board<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: BoardId,
) -> KanbanResult<Board> {
    authorize(tx, EntityRef::Board(id), caller).await?;
    load_board(tx, id).await
}

pub async fn rename_board<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: BoardId,
    name: &str,
) -> KanbanResult<Board> {
    let name = validate_name("name", name)?;
    authorize(tx, EntityRef::Board(id), caller).await?;
    load_board(tx, id).await?;
    tx.rename_board(id, &name, Utc::now()).await?;
    load_board(tx, id).await
}

/// Delete a board with all its columns and tasks.
pub async fn delete_board<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: BoardId,
) -> KanbanResult<()> {
    authorize(tx, EntityRef::Board(id), caller).await?;
    load_board(tx, id).await?;
    tx.delete_board(id).await?;
    Ok(())
}

// ============================================================================
// COLUMNS
// ============================================================================

/// Append a column at the end of `board`.
pub async fn create_column<T: LedgerTx>(
    tx: &mut T,
    limits: &Limits,
    caller: UserId,
    board: BoardId,
    name: &str,
) -> KanbanResult<Column> {
    let name = validate_name("name", name)?;
    authorize(tx, EntityRef::Board(board), caller).await?;

    let container = Container::Board(board);
    let count = tx.count(container).await?;
    check_capacity(container, count, limits.max_for(container))?;

    let position = tx.next_position(container).await?;
    let now = Utc::now();
    let column = Column {
        id: ColumnId::now_v7(),
        board_id: board,
        name,
        position,
        created_at: now,
        updated_at: now,
    };
    tx.insert_column(&column).await?;
    tracing::debug!(column_id = %column.id, %board, position, "Column appended");
    Ok(column)
}

pub async fn list_columns<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    board: BoardId,
) -> KanbanResult<Vec<Column>> {
    authorize(tx, EntityRef::Board(board), caller).await?;
    Ok(tx.list_columns(board).await?)
}

pub async fn get_column<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: ColumnId,
) -> KanbanResult<Column> {
    authorize(tx, EntityRef::Column(id), caller).await?;
    load_column(tx, id).await
}

/// Move a column to `new_position` within its board.
pub async fn reorder_column<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: ColumnId,
    new_position: Position,
) -> KanbanResult<Column> {
    authorize(tx, EntityRef::Column(id), caller).await?;
    let column = load_column(tx, id).await?;
    reorder_loaded_column(tx, column, new_position).await?;
    load_column(tx, id).await
}

async fn reorder_loaded_column<T: LedgerTx>(
    tx: &mut T,
    column: Column,
    new_position: Position,
) -> KanbanResult<()> {
    let container = Container::Board(column.board_id);
    let count = tx.count(container).await?;
    let Some(shift) = plan_reorder(column.position, new_position, count)? else {
        return Ok(());
    };
    tracing::debug!(column_id = %column.id, ?shift, "Reordering column");
    tx.shift(container, shift).await?;
    tx.set_column_position(column.id, new_position, Utc::now())
        .await?;
    Ok(())
}

/// Rename and/or reorder a column in one transaction.
pub async fn update_column<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: ColumnId,
    update: ColumnUpdate,
) -> KanbanResult<Column> {
    authorize(tx, EntityRef::Column(id), caller).await?;
    let column = load_column(tx, id).await?;
    if let Some(name) = &update.name {
        tx.rename_column(id, name, Utc::now()).await?;
    }
    if let Some(position) = update.position {
        reorder_loaded_column(tx, column, position).await?;
    }
    load_column(tx, id).await
}

/// Delete a column with its tasks and close the gap it leaves.
pub async fn delete_column<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: ColumnId,
) -> KanbanResult<()> {
    authorize(tx, EntityRef::Column(id), caller).await?;
    let column = load_column(tx, id).await?;
    tx.delete_column(id).await?;
    tx.shift(
        Container::Board(column.board_id),
        plan_removal(column.position),
    )
    .await?;
    Ok(())
}

// ============================================================================
// TASKS
// ============================================================================

/// Append a task at the end of `column`.
pub async fn create_task<T: LedgerTx>(
    tx: &mut T,
    limits: &Limits,
    caller: UserId,
    column: ColumnId,
    name: &str,
    description: &str,
) -> KanbanResult<Task> {
    let name = validate_name("name", name)?;
    authorize(tx, EntityRef::Column(column), caller).await?;
    load_column(tx, column).await?;

    let container = Container::Column(column);
    let count = tx.count(container).await?;
    check_capacity(container, count, limits.max_for(container))?;

    let position = tx.next_position(container).await?;
    let now = Utc::now();
    let task = Task {
        id: TaskId::now_v7(),
        column_id: column,
        name,
        description: description.to_string(),
        position,
        done: false,
        deadline: None,
        created_at: now,
        updated_at: now,
    };
    tx.insert_task(&task).await?;
    tracing::debug!(task_id = %task.id, %column, position, "Task appended");
    Ok(task)
}

pub async fn list_tasks<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    column: ColumnId,
) -> KanbanResult<Vec<Task>> {
    authorize(tx, EntityRef::Column(column), caller).await?;
    Ok(tx.list_tasks(column).await?)
}

pub async fn get_task<T: LedgerTx>(tx: &mut T, caller: UserId, id: TaskId) -> KanbanResult<Task> {
    authorize(tx, EntityRef::Task(id), caller).await?;
    load_task(tx, id).await
}

/// Overwrite the content fields present in `content`. Position is untouched.
pub async fn update_task_content<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: TaskId,
    content: &TaskContent,
) -> KanbanResult<Task> {
    if content.is_empty() {
        return Err(KanbanError::malformed("update has no fields"));
    }
    authorize(tx, EntityRef::Task(id), caller).await?;
    load_task(tx, id).await?;
    tx.update_task_content(id, content, Utc::now()).await?;
    load_task(tx, id).await
}

/// Reorder a task within its current column.
pub async fn move_task_position<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: TaskId,
    new_position: Position,
) -> KanbanResult<Task> {
    authorize(tx, EntityRef::Task(id), caller).await?;
    let task = load_task(tx, id).await?;
    reorder_loaded_task(tx, &task, new_position).await?;
    load_task(tx, id).await
}

async fn reorder_loaded_task<T: LedgerTx>(
    tx: &mut T,
    task: &Task,
    new_position: Position,
) -> KanbanResult<()> {
    let container = Container::Column(task.column_id);
    let count = tx.count(container).await?;
    let Some(shift) = plan_reorder(task.position, new_position, count)? else {
        return Ok(());
    };
    tracing::debug!(task_id = %task.id, ?shift, "Reordering task");
    tx.shift(container, shift).await?;
    tx.set_task_position(task.id, task.column_id, new_position, Utc::now())
        .await?;
    Ok(())
}

/// Move a task to `new_position` of another column.
///
/// Both the task and the destination column must belong to the caller.
/// A destination equal to the current column is a plain reorder.
pub async fn move_task_to_column<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: TaskId,
    dest: ColumnId,
    new_position: Position,
) -> KanbanResult<Task> {
    authorize(tx, EntityRef::Task(id), caller).await?;
    authorize(tx, EntityRef::Column(dest), caller).await?;
    let task = load_task(tx, id).await?;
    load_column(tx, dest).await?;

    if task.column_id == dest {
        reorder_loaded_task(tx, &task, new_position).await?;
        return load_task(tx, id).await;
    }

    let source = Container::Column(task.column_id);
    let destination = Container::Column(dest);
    let dest_count = tx.count(destination).await?;
    let plan = plan_move(task.position, new_position, dest_count)?;
    tracing::debug!(task_id = %id, from = %task.column_id, to = %dest, ?plan, "Moving task");

    tx.shift(destination, plan.open).await?;
    tx.set_task_position(id, dest, new_position, Utc::now())
        .await?;
    tx.shift(source, plan.close).await?;
    load_task(tx, id).await
}

/// Apply any of the three update shapes.
pub async fn update_task<T: LedgerTx>(
    tx: &mut T,
    caller: UserId,
    id: TaskId,
    update: TaskUpdate,
) -> KanbanResult<Task> {
    match update {
        TaskUpdate::Content(content) => update_task_content(tx, caller, id, &content).await,
        TaskUpdate::Position { position } => move_task_position(tx, caller, id, position).await,
        TaskUpdate::ColumnMove {
            column_id,
            position,
        } => move_task_to_column(tx, caller, id, column_id, position).await,
    }
}

/// Delete a task and close the gap it leaves.
pub async fn delete_task<T: LedgerTx>(tx: &mut T, caller: UserId, id: TaskId) -> KanbanResult<()> {
    authorize(tx, EntityRef::Task(id), caller).await?;
    let task = load_task(tx, id).await?;
    tx.delete_task(id).await?;
    tx.shift(
        Container::Column(task.column_id),
        plan_removal(task.position),
    )
    .await?;
    Ok(())
}
