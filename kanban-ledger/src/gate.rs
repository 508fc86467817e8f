//! Ownership resolution and the authorization gate

use kanban_core::{EntityRef, KanbanError, KanbanResult, UserId};
use kanban_storage::LedgerTx;

/// Resolve the user at the root of `entity`'s containment chain.
pub async fn owner_of<T: LedgerTx>(tx: &mut T, entity: EntityRef) -> KanbanResult<UserId> {
    tx.owner_of(entity)
        .await?
        .ok_or_else(|| KanbanError::NotFound {
            kind: entity.kind(),
            id: entity.id(),
        })
}

/// Allow the operation only if `caller` owns `entity`.
///
/// On success the owner lock is taken, so every later statement in the
/// transaction runs serialized against other transactions on the same
/// owner's containers. A missing entity is `NotFound`, a foreign one is
/// `Forbidden`, and any store failure fails the operation.
pub async fn authorize<T: LedgerTx>(
    tx: &mut T,
    entity: EntityRef,
    caller: UserId,
) -> KanbanResult<()> {
    let owner = owner_of(tx, entity).await?;
    if owner != caller {
        tracing::warn!(%entity, %caller, "Authorization rejected");
        return Err(KanbanError::Forbidden {
            kind: entity.kind(),
            id: entity.id(),
        });
    }
    tx.lock_owner(owner).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kanban_core::{Board, BoardId, EntityIdType, EntityKind, TaskId};
    use kanban_storage::{LedgerStore, MemoryStore};

    #[tokio::test]
    async fn test_missing_entity_is_not_found_before_forbidden() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let task = TaskId::now_v7();
        let err = authorize(&mut tx, EntityRef::Task(task), UserId::now_v7())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            KanbanError::NotFound {
                kind: EntityKind::Task,
                id: task.as_uuid()
            }
        );
    }

    #[tokio::test]
    async fn test_owner_allowed_stranger_forbidden() {
        let store = MemoryStore::new();
        let owner = UserId::now_v7();
        let now = Utc::now();
        let board = Board {
            id: BoardId::now_v7(),
            user_id: owner,
            name: "Board".into(),
            created_at: now,
            updated_at: now,
        };
        let mut tx = store.begin().await.unwrap();
        tx.insert_board(&board).await.unwrap();

        assert!(authorize(&mut tx, board.id.into(), owner).await.is_ok());
        assert!(matches!(
            authorize(&mut tx, board.id.into(), UserId::now_v7()).await,
            Err(KanbanError::Forbidden { .. })
        ));
        assert_eq!(owner_of(&mut tx, board.id.into()).await.unwrap(), owner);
    }
}
