//! Transaction coordinator
//!
//! A [`UnitOfWork`] wraps one store transaction for one named operation.
//! `finish` commits when the operation succeeded and rolls back otherwise.
//! A unit of work dropped before `finish` (a cancelled request) drops its
//! transaction, which the store rolls back.

use kanban_core::{KanbanError, KanbanResult};
use kanban_storage::{LedgerStore, LedgerTx};
use std::time::Instant;

pub struct UnitOfWork<T: LedgerTx> {
    tx: T,
    operation: &'static str,
    started: Instant,
}

impl<T: LedgerTx> UnitOfWork<T> {
    /// Open a transaction on `store` for `operation`.
    pub async fn begin<S>(store: &S, operation: &'static str) -> KanbanResult<Self>
    where
        S: LedgerStore<Tx = T>,
    {
        let tx = store.begin().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Failed to begin transaction");
            KanbanError::from(e)
        })?;
        Ok(Self {
            tx,
            operation,
            started: Instant::now(),
        })
    }

    pub fn tx(&mut self) -> &mut T {
        &mut self.tx
    }

    /// Commit on `Ok`, roll back on `Err`, and hand back the result.
    pub async fn finish<R>(self, result: KanbanResult<R>) -> KanbanResult<R> {
        let operation = self.operation;
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match result {
            Ok(value) => {
                self.tx.commit().await.map_err(|e| {
                    tracing::error!(operation, error = %e, "Commit failed");
                    KanbanError::from(e)
                })?;
                tracing::debug!(operation, elapsed_ms, "Transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.tx.rollback().await {
                    tracing::error!(operation, error = %rollback_err, "Rollback failed");
                }
                match &err {
                    KanbanError::Internal { reason } => {
                        tracing::error!(operation, reason = %reason, "Operation failed, rolled back");
                    }
                    other => {
                        tracing::debug!(operation, error = %other, elapsed_ms, "Operation rejected, rolled back");
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kanban_core::{Board, BoardId, EntityIdType, UserId};
    use kanban_storage::MemoryStore;

    fn board() -> Board {
        let now = Utc::now();
        Board {
            id: BoardId::now_v7(),
            user_id: UserId::now_v7(),
            name: "Board".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_ok_result_commits() {
        let store = MemoryStore::new();
        let mut work = UnitOfWork::begin(&store, "test").await.unwrap();
        work.tx().insert_board(&board()).await.unwrap();
        work.finish(Ok(())).await.unwrap();
        assert_eq!(store.snapshot().await.board_count(), 1);
    }

    #[tokio::test]
    async fn test_err_result_rolls_back() {
        let store = MemoryStore::new();
        let mut work = UnitOfWork::begin(&store, "test").await.unwrap();
        work.tx().insert_board(&board()).await.unwrap();
        let result: KanbanResult<()> = work.finish(Err(KanbanError::malformed("nope"))).await;
        assert!(result.is_err());
        assert_eq!(store.snapshot().await.board_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut work = UnitOfWork::begin(&store, "test").await.unwrap();
            work.tx().insert_board(&board()).await.unwrap();
        }
        assert_eq!(store.snapshot().await.board_count(), 0);
    }
}
