//! Kanban Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for ids, names and ledger operation sequences
//! - Fixtures that seed boards through the service
//! - Assertions for the dense-position invariant and the error taxonomy

pub use kanban_core::{
    Board, BoardId, Column, ColumnId, EntityIdType, KanbanError, KanbanResult, Position, Task,
    TaskId, UserId,
};
pub use kanban_ledger::{KanbanService, Limits};
pub use kanban_storage::{MemoryState, MemoryStore};

use proptest::test_runner::TestCaseError;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Fresh in-memory service with default limits.
pub fn memory_service() -> KanbanService<MemoryStore> {
    memory_service_with(MemoryStore::new(), Limits::default())
}

/// Service over a caller-provided store, for tests that inspect or fault it.
pub fn memory_service_with(store: MemoryStore, limits: Limits) -> KanbanService<MemoryStore> {
    KanbanService::new(Arc::new(store), limits)
}

/// Runtime for driving async code inside `proptest!` bodies.
pub fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for kanban inputs.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::new)
    }

    /// Non-blank display name.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ]{0,23}"
    }

    /// Any position, including the invalid ones.
    pub fn arb_position() -> impl Strategy<Value = Position> {
        prop_oneof![
            4 => 1..=12i32,
            1 => Just(0),
            1 => -3..0i32,
        ]
    }

    /// One step of a random workload against a single board.
    ///
    /// Targets are picked by index into the current state modulo its size,
    /// so every generated step refers to something that exists when there
    /// is anything at all.
    #[derive(Debug, Clone)]
    pub enum LedgerOp {
        CreateColumn,
        ReorderColumn { column: usize, position: Position },
        DeleteColumn { column: usize },
        CreateTask { column: usize },
        MoveTaskPosition { task: usize, position: Position },
        MoveTaskToColumn { task: usize, column: usize, position: Position },
        DeleteTask { task: usize },
    }

    pub fn arb_ledger_op() -> impl Strategy<Value = LedgerOp> {
        prop_oneof![
            3 => Just(LedgerOp::CreateColumn),
            2 => (any::<usize>(), arb_position())
                .prop_map(|(column, position)| LedgerOp::ReorderColumn { column, position }),
            1 => any::<usize>().prop_map(|column| LedgerOp::DeleteColumn { column }),
            5 => any::<usize>().prop_map(|column| LedgerOp::CreateTask { column }),
            2 => (any::<usize>(), arb_position())
                .prop_map(|(task, position)| LedgerOp::MoveTaskPosition { task, position }),
            3 => (any::<usize>(), any::<usize>(), arb_position()).prop_map(
                |(task, column, position)| LedgerOp::MoveTaskToColumn { task, column, position }
            ),
            1 => any::<usize>().prop_map(|task| LedgerOp::DeleteTask { task }),
        ]
    }

    pub fn arb_ledger_ops(max_len: usize) -> impl Strategy<Value = Vec<LedgerOp>> {
        prop::collection::vec(arb_ledger_op(), 1..max_len)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Seeded boards built through the public service.

    use super::generators::LedgerOp;
    use super::*;

    /// A board with its columns (by position) and each column's tasks.
    #[derive(Debug, Clone)]
    pub struct SeededBoard {
        pub owner: UserId,
        pub board: Board,
        pub columns: Vec<Column>,
        pub tasks: Vec<Vec<Task>>,
    }

    /// Create a board with `columns` columns, each holding `tasks_per_column` tasks.
    pub async fn seed_board(
        service: &KanbanService<MemoryStore>,
        owner: UserId,
        columns: usize,
        tasks_per_column: usize,
    ) -> KanbanResult<SeededBoard> {
        let board = service.create_board(owner, "Seeded board").await?;
        let mut seeded = SeededBoard {
            owner,
            board,
            columns: Vec::with_capacity(columns),
            tasks: Vec::with_capacity(columns),
        };
        for c in 0..columns {
            let column = service
                .create_column(owner, seeded.board.id, &format!("Column {}", c + 1))
                .await?;
            let mut tasks = Vec::with_capacity(tasks_per_column);
            for t in 0..tasks_per_column {
                tasks.push(
                    service
                        .create_task(owner, column.id, &format!("Task {}.{}", c + 1, t + 1), "")
                        .await?,
                );
            }
            seeded.columns.push(column);
            seeded.tasks.push(tasks);
        }
        Ok(seeded)
    }

    /// Run one generated step. Client errors are expected outcomes and are
    /// returned, not raised.
    pub async fn apply_op(
        service: &KanbanService<MemoryStore>,
        owner: UserId,
        board: BoardId,
        op: &LedgerOp,
    ) -> KanbanResult<()> {
        let state = service.store().snapshot().await;
        let columns = state.columns_of(board);
        let tasks: Vec<Task> = columns
            .iter()
            .flat_map(|c| state.tasks_of(c.id))
            .collect();
        let column_at = |i: usize| columns.get(i % columns.len().max(1)).map(|c| c.id);
        let task_at = |i: usize| tasks.get(i % tasks.len().max(1)).map(|t| t.id);

        match *op {
            LedgerOp::CreateColumn => service
                .create_column(owner, board, "Generated")
                .await
                .map(|_| ()),
            LedgerOp::ReorderColumn { column, position } => match column_at(column) {
                Some(id) => service.reorder_column(owner, id, position).await.map(|_| ()),
                None => Ok(()),
            },
            LedgerOp::DeleteColumn { column } => match column_at(column) {
                Some(id) => service.delete_column(owner, id).await,
                None => Ok(()),
            },
            LedgerOp::CreateTask { column } => match column_at(column) {
                Some(id) => service
                    .create_task(owner, id, "Generated", "")
                    .await
                    .map(|_| ()),
                None => Ok(()),
            },
            LedgerOp::MoveTaskPosition { task, position } => match task_at(task) {
                Some(id) => service
                    .move_task_position(owner, id, position)
                    .await
                    .map(|_| ()),
                None => Ok(()),
            },
            LedgerOp::MoveTaskToColumn {
                task,
                column,
                position,
            } => match (task_at(task), column_at(column)) {
                (Some(task), Some(column)) => service
                    .move_task_to_column(owner, task, column, position)
                    .await
                    .map(|_| ()),
                _ => Ok(()),
            },
            LedgerOp::DeleteTask { task } => match task_at(task) {
                Some(id) => service.delete_task(owner, id).await,
                None => Ok(()),
            },
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Invariant checks and error-variant assertions.

    use super::*;
    use kanban_core::is_dense;

    /// Every board's columns and every column's tasks sit at `1..=count`.
    pub fn check_all_dense(state: &MemoryState) -> Result<(), String> {
        for board in state.boards() {
            let columns = state.columns_of(board.id);
            let positions: Vec<Position> = columns.iter().map(|c| c.position).collect();
            if !is_dense(positions.iter().copied()) {
                return Err(format!(
                    "board {} has column positions {:?}",
                    board.id, positions
                ));
            }
            for column in &columns {
                let positions: Vec<Position> =
                    state.tasks_of(column.id).iter().map(|t| t.position).collect();
                if !is_dense(positions.iter().copied()) {
                    return Err(format!(
                        "column {} has task positions {:?}",
                        column.id, positions
                    ));
                }
            }
        }
        Ok(())
    }

    #[track_caller]
    pub fn assert_all_dense(state: &MemoryState) {
        if let Err(message) = check_all_dense(state) {
            panic!("positions are not dense: {}", message);
        }
    }

    /// Column ids of `board` in position order.
    pub fn column_order(state: &MemoryState, board: BoardId) -> Vec<ColumnId> {
        state.columns_of(board).iter().map(|c| c.id).collect()
    }

    /// Task ids of `column` in position order.
    pub fn task_order(state: &MemoryState, column: ColumnId) -> Vec<TaskId> {
        state.tasks_of(column).iter().map(|t| t.id).collect()
    }

    #[track_caller]
    pub fn assert_forbidden<T: std::fmt::Debug>(result: &KanbanResult<T>) {
        match result {
            Err(KanbanError::Forbidden { .. }) => {}
            other => panic!("Expected Forbidden, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &KanbanResult<T>) {
        match result {
            Err(KanbanError::NotFound { .. }) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_invalid_position<T: std::fmt::Debug>(result: &KanbanResult<T>) {
        match result {
            Err(KanbanError::InvalidPosition { .. }) => {}
            other => panic!("Expected InvalidPosition, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_limit_reached<T: std::fmt::Debug>(result: &KanbanResult<T>, max: usize) {
        match result {
            Err(KanbanError::LimitReached { max: m, .. }) => {
                assert_eq!(*m, max, "Wrong limit in LimitReached");
            }
            other => panic!("Expected LimitReached({}), got: {:?}", max, other),
        }
    }

    #[track_caller]
    pub fn assert_malformed<T: std::fmt::Debug>(result: &KanbanResult<T>) {
        match result {
            Err(KanbanError::MalformedRequest { .. }) => {}
            other => panic!("Expected MalformedRequest, got: {:?}", other),
        }
    }
}
