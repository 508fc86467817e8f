//! Property-Based Tests for the position ledger
//!
//! **Property: Dense Positions**
//!
//! For any sequence of creates, reorders, moves and deletes on a board,
//! every container SHALL hold its items at exactly `1..=count` after each
//! committed step, and a rejected step SHALL leave the state unchanged.

use kanban_core::{EntityIdType, KanbanError};
use kanban_ledger::Limits;
use kanban_storage::MemoryStore;
use kanban_test_utils::assertions::{check_all_dense, column_order, task_order};
use kanban_test_utils::fixtures::{apply_op, seed_board};
use kanban_test_utils::generators::arb_ledger_ops;
use kanban_test_utils::{memory_service_with, test_runtime, UserId};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every step keeps all containers dense; failures only ever come from
    /// the client-error side of the taxonomy.
    #[test]
    fn prop_random_workload_stays_dense(ops in arb_ledger_ops(40)) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let limits = Limits { max_columns_per_board: 6, max_tasks_per_column: 8 };
            let service = memory_service_with(MemoryStore::new(), limits);
            let owner = UserId::now_v7();
            let seeded = seed_board(&service, owner, 2, 2)
                .await
                .map_err(|e| TestCaseError::fail(format!("seed failed: {e}")))?;

            for op in &ops {
                let before = service.store().snapshot().await;
                let result = apply_op(&service, owner, seeded.board.id, op).await;
                let after = service.store().snapshot().await;

                check_all_dense(&after).map_err(TestCaseError::fail)?;

                match result {
                    Ok(()) => {}
                    Err(err @ KanbanError::Internal { .. }) => {
                        return Err(TestCaseError::fail(format!("{op:?} failed: {err}")));
                    }
                    Err(_) => {
                        prop_assert_eq!(
                            column_order(&before, seeded.board.id),
                            column_order(&after, seeded.board.id)
                        );
                        for column in before.columns_of(seeded.board.id) {
                            prop_assert_eq!(
                                task_order(&before, column.id),
                                task_order(&after, column.id)
                            );
                        }
                    }
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Reordering any column twice, there and back, restores the order.
    #[test]
    fn prop_reorder_there_and_back(
        count in 1usize..10,
        from_seed in any::<usize>(),
        to_seed in any::<usize>(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let service = memory_service_with(MemoryStore::new(), Limits::default());
            let owner = UserId::now_v7();
            let seeded = seed_board(&service, owner, count, 0)
                .await
                .map_err(|e| TestCaseError::fail(format!("seed failed: {e}")))?;
            let original = column_order(&service.store().snapshot().await, seeded.board.id);

            let column = &seeded.columns[from_seed % count];
            let target = (to_seed % count) as i32 + 1;
            service
                .reorder_column(owner, column.id, target)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            service
                .reorder_column(owner, column.id, column.position)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let restored = column_order(&service.store().snapshot().await, seeded.board.id);
            prop_assert_eq!(original, restored);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
