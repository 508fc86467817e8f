#![cfg(feature = "db-tests")]
//! Ledger behaviour against PostgreSQL.
//!
//! Requires a reachable database (`KANBAN_DB_*`). Run with
//! `--features db-tests`.

#[path = "support/db.rs"]
mod db_support;

use db_support::test_pg_service;
use kanban_core::{ColumnId, EntityIdType, KanbanError, TaskContent, TaskId, UserId};
use kanban_ledger::{KanbanService, Limits};
use kanban_api::PgStore;

async fn column_ids(
    service: &KanbanService<PgStore>,
    user: UserId,
    board: kanban_core::BoardId,
) -> Vec<ColumnId> {
    service
        .list_columns(user, board)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect()
}

async fn task_ids(service: &KanbanService<PgStore>, user: UserId, column: ColumnId) -> Vec<TaskId> {
    let tasks = service.list_tasks(user, column).await.unwrap();
    let positions: Vec<i32> = tasks.iter().map(|t| t.position).collect();
    assert_eq!(positions, (1..=tasks.len() as i32).collect::<Vec<_>>());
    tasks.into_iter().map(|t| t.id).collect()
}

#[tokio::test]
async fn test_column_reorder_persists() {
    let (service, _db) = test_pg_service(Limits::default()).await;
    let user = UserId::now_v7();
    let board = service.create_board(user, "pg board").await.unwrap();
    let c1 = service.create_column(user, board.id, "c1").await.unwrap();
    let c2 = service.create_column(user, board.id, "c2").await.unwrap();
    let c3 = service.create_column(user, board.id, "c3").await.unwrap();
    assert_eq!((c1.position, c2.position, c3.position), (1, 2, 3));

    service.reorder_column(user, c1.id, 3).await.unwrap();
    assert_eq!(column_ids(&service, user, board.id).await, vec![c2.id, c3.id, c1.id]);

    service.reorder_column(user, c1.id, 1).await.unwrap();
    assert_eq!(column_ids(&service, user, board.id).await, vec![c1.id, c2.id, c3.id]);
}

#[tokio::test]
async fn test_cross_column_move_and_delete() {
    let (service, _db) = test_pg_service(Limits::default()).await;
    let user = UserId::now_v7();
    let board = service.create_board(user, "moves").await.unwrap();
    let x = service.create_column(user, board.id, "x").await.unwrap();
    let y = service.create_column(user, board.id, "y").await.unwrap();

    let mut xs = Vec::new();
    for name in ["x1", "x2", "x3"] {
        xs.push(service.create_task(user, x.id, name, "").await.unwrap().id);
    }
    let mut ys = Vec::new();
    for name in ["y1", "y2"] {
        ys.push(service.create_task(user, y.id, name, "").await.unwrap().id);
    }

    let moved = service.move_task_to_column(user, xs[2], y.id, 1).await.unwrap();
    assert_eq!((moved.column_id, moved.position), (y.id, 1));
    assert_eq!(task_ids(&service, user, x.id).await, vec![xs[0], xs[1]]);
    assert_eq!(task_ids(&service, user, y.id).await, vec![xs[2], ys[0], ys[1]]);

    service.delete_task(user, ys[0]).await.unwrap();
    assert_eq!(task_ids(&service, user, y.id).await, vec![xs[2], ys[1]]);

    service.delete_column(user, x.id).await.unwrap();
    let remaining = service.list_columns(user, board.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!((remaining[0].id, remaining[0].position), (y.id, 1));
}

#[tokio::test]
async fn test_content_update_and_deadline_clear() {
    let (service, _db) = test_pg_service(Limits::default()).await;
    let user = UserId::now_v7();
    let board = service.create_board(user, "content").await.unwrap();
    let column = service.create_column(user, board.id, "todo").await.unwrap();
    let task = service.create_task(user, column.id, "task", "desc").await.unwrap();

    let deadline = chrono::Utc::now();
    let updated = service
        .update_task_content(
            user,
            task.id,
            &TaskContent {
                done: Some(true),
                deadline: Some(Some(deadline)),
                ..TaskContent::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.done);
    assert_eq!(updated.description, "desc");
    assert!(updated.deadline.is_some());

    let cleared = service
        .update_task_content(
            user,
            task.id,
            &TaskContent {
                deadline: Some(None),
                ..TaskContent::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.deadline.is_none());
    assert!(cleared.done);
}

#[tokio::test]
async fn test_limits_and_gate() {
    let (service, _db) = test_pg_service(Limits {
        max_columns_per_board: 2,
        max_tasks_per_column: 1,
    })
    .await;
    let owner = UserId::now_v7();
    let intruder = UserId::now_v7();
    let board = service.create_board(owner, "limits").await.unwrap();
    let column = service.create_column(owner, board.id, "a").await.unwrap();
    service.create_column(owner, board.id, "b").await.unwrap();

    let third = service.create_column(owner, board.id, "c").await;
    assert!(matches!(third, Err(KanbanError::LimitReached { max: 2, .. })));

    service.create_task(owner, column.id, "one", "").await.unwrap();
    let second = service.create_task(owner, column.id, "two", "").await;
    assert!(matches!(second, Err(KanbanError::LimitReached { max: 1, .. })));

    let forbidden = service.reorder_column(intruder, column.id, 1).await;
    assert!(matches!(forbidden, Err(KanbanError::Forbidden { .. })));
    let invalid = service.reorder_column(owner, column.id, 3).await;
    assert!(matches!(invalid, Err(KanbanError::InvalidPosition { .. })));
}

#[tokio::test]
async fn test_concurrent_creates_stay_dense() {
    let (service, _db) = test_pg_service(Limits::default()).await;
    let user = UserId::now_v7();
    let board = service.create_board(user, "race").await.unwrap();
    let column = service.create_column(user, board.id, "todo").await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = service.clone();
            let column = column.id;
            tokio::spawn(async move {
                service
                    .create_task(user, column, &format!("task {i}"), "")
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let tasks = task_ids(&service, user, column.id).await;
    assert_eq!(tasks.len(), 16);
}

#[tokio::test]
async fn test_concurrent_creates_stop_at_limit() {
    let (service, _db) = test_pg_service(Limits::default()).await;
    let user = UserId::now_v7();
    let board = service.create_board(user, "full").await.unwrap();
    let column = service.create_column(user, board.id, "todo").await.unwrap();

    let handles: Vec<_> = (0..Limits::DEFAULT_MAX_TASKS + 18)
        .map(|i| {
            let service = service.clone();
            let column = column.id;
            tokio::spawn(async move {
                service
                    .create_task(user, column, &format!("task {i}"), "")
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(KanbanError::LimitReached { max, .. }) => {
                assert_eq!(max, Limits::DEFAULT_MAX_TASKS)
            }
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(created, Limits::DEFAULT_MAX_TASKS);
    let tasks = task_ids(&service, user, column.id).await;
    assert_eq!(tasks.len(), Limits::DEFAULT_MAX_TASKS);
}

#[tokio::test]
async fn test_concurrent_moves_keep_every_container_dense() {
    let (service, _db) = test_pg_service(Limits::default()).await;
    let user = UserId::now_v7();
    let board = service.create_board(user, "shuffle").await.unwrap();

    let mut columns = Vec::new();
    let mut tasks = Vec::new();
    for c in 0..3 {
        let column = service
            .create_column(user, board.id, &format!("c{c}"))
            .await
            .unwrap();
        for t in 0..6 {
            let task = service
                .create_task(user, column.id, &format!("c{c} t{t}"), "")
                .await
                .unwrap();
            tasks.push(task.id);
        }
        columns.push(column.id);
    }

    let handles: Vec<_> = (0..48usize)
        .map(|i| {
            let service = service.clone();
            let task = tasks[(i * 7) % tasks.len()];
            let column = columns[i % columns.len()];
            let position = (i % 3) as i32 + 1;
            tokio::spawn(async move {
                match i % 3 {
                    0 => service
                        .move_task_position(user, task, position)
                        .await
                        .map(|_| ()),
                    1 => service
                        .move_task_to_column(user, task, column, 1)
                        .await
                        .map(|_| ()),
                    _ => service
                        .reorder_column(user, column, position)
                        .await
                        .map(|_| ()),
                }
            })
        })
        .collect();

    for handle in handles {
        match handle.await.unwrap() {
            // A column drained by an earlier move may be too short now.
            Ok(()) | Err(KanbanError::InvalidPosition { .. }) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    let listed = service.list_columns(user, board.id).await.unwrap();
    let positions: Vec<i32> = listed.iter().map(|c| c.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);

    let mut seen = Vec::new();
    for column in columns {
        seen.extend(task_ids(&service, user, column).await);
    }
    seen.sort();
    tasks.sort();
    assert_eq!(seen, tasks);
}

#[tokio::test]
async fn test_board_delete_cascades() {
    let (service, db) = test_pg_service(Limits::default()).await;
    let user = UserId::now_v7();
    let board = service.create_board(user, "cascade").await.unwrap();
    let column = service.create_column(user, board.id, "todo").await.unwrap();
    service.create_task(user, column.id, "t", "").await.unwrap();

    service.delete_board(user, board.id).await.unwrap();

    let conn = db.get_conn().await.unwrap();
    let row = conn
        .query_one(
            "SELECT count(*) FROM task WHERE column_id = $1",
            &[&column.id.as_uuid()],
        )
        .await
        .unwrap();
    let remaining: i64 = row.get(0);
    assert_eq!(remaining, 0);
    let missing = service.get_column(user, column.id).await;
    assert!(matches!(missing, Err(KanbanError::NotFound { .. })));
}
