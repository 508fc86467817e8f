//! PostgreSQL Ledger Store
//!
//! [`PgStore`] hands out [`PgTx`] transactions, each pinned to one pooled
//! connection for its whole life. Every statement the ledger issues runs
//! on that connection between `BEGIN` and `COMMIT`/`ROLLBACK`.
//!
//! Serialization: `lock_owner` takes a transaction-scoped advisory lock
//! keyed by the owning user. All containers on a chain share that user, so
//! two ledger operations touching the same board queue up behind each
//! other while different users proceed in parallel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Object;
use kanban_core::{
    Board, BoardId, Column, ColumnId, Container, EntityIdType, EntityRef, Position, Shift, Task,
    TaskContent, TaskId, Timestamp, UserId,
};
use kanban_storage::{LedgerStore, LedgerTx, StorageError, StorageResult};
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::db::DbClient;

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn storage_error(err: tokio_postgres::Error) -> StorageError {
    let reason = err.to_string();
    match err.code() {
        Some(code)
            if *code == SqlState::UNIQUE_VIOLATION
                || *code == SqlState::FOREIGN_KEY_VIOLATION
                || *code == SqlState::CHECK_VIOLATION =>
        {
            StorageError::Constraint { reason }
        }
        _ if err.is_closed() => StorageError::Connection { reason },
        _ => StorageError::Query { reason },
    }
}

fn decode<T>(result: Result<T, tokio_postgres::Error>) -> StorageResult<T> {
    result.map_err(|e| StorageError::Query {
        reason: format!("row decode failed: {e}"),
    })
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn board_from_row(row: &Row) -> StorageResult<Board> {
    Ok(Board {
        id: BoardId::new(decode(row.try_get::<_, Uuid>("id"))?),
        user_id: UserId::new(decode(row.try_get::<_, Uuid>("user_id"))?),
        name: decode(row.try_get("name"))?,
        created_at: decode(row.try_get::<_, DateTime<Utc>>("created_at"))?,
        updated_at: decode(row.try_get::<_, DateTime<Utc>>("updated_at"))?,
    })
}

fn column_from_row(row: &Row) -> StorageResult<Column> {
    Ok(Column {
        id: ColumnId::new(decode(row.try_get::<_, Uuid>("id"))?),
        board_id: BoardId::new(decode(row.try_get::<_, Uuid>("board_id"))?),
        name: decode(row.try_get("name"))?,
        position: decode(row.try_get::<_, i32>("position"))?,
        created_at: decode(row.try_get::<_, DateTime<Utc>>("created_at"))?,
        updated_at: decode(row.try_get::<_, DateTime<Utc>>("updated_at"))?,
    })
}

fn task_from_row(row: &Row) -> StorageResult<Task> {
    Ok(Task {
        id: TaskId::new(decode(row.try_get::<_, Uuid>("id"))?),
        column_id: ColumnId::new(decode(row.try_get::<_, Uuid>("column_id"))?),
        name: decode(row.try_get("name"))?,
        description: decode(row.try_get("description"))?,
        position: decode(row.try_get::<_, i32>("position"))?,
        done: decode(row.try_get("done"))?,
        deadline: decode(row.try_get::<_, Option<DateTime<Utc>>>("deadline"))?,
        created_at: decode(row.try_get::<_, DateTime<Utc>>("created_at"))?,
        updated_at: decode(row.try_get::<_, DateTime<Utc>>("updated_at"))?,
    })
}

const BOARD_COLUMNS: &str = "id, user_id, name, created_at, updated_at";
const COLUMN_COLUMNS: &str = "id, board_id, name, position, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, column_id, name, description, position, done, deadline, created_at, updated_at";

// ============================================================================
// STORE
// ============================================================================

#[derive(Clone)]
pub struct PgStore {
    db: DbClient,
}

impl PgStore {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DbClient {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StorageResult<PgTx> {
        let conn = self
            .db
            .pool()
            .get()
            .await
            .map_err(|e| StorageError::Connection {
                reason: e.to_string(),
            })?;
        conn.batch_execute("BEGIN").await.map_err(storage_error)?;
        Ok(PgTx {
            conn: Some(conn),
            finished: false,
        })
    }

    async fn ping(&self) -> StorageResult<()> {
        let conn = self
            .db
            .pool()
            .get()
            .await
            .map_err(|e| StorageError::Connection {
                reason: e.to_string(),
            })?;
        conn.query_one("SELECT 1", &[]).await.map_err(storage_error)?;
        Ok(())
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// One open PostgreSQL transaction.
///
/// Dropped without `commit` or `rollback`, the connection is detached from
/// the pool and closed, and the server rolls the transaction back.
pub struct PgTx {
    conn: Option<Object>,
    finished: bool,
}

impl PgTx {
    fn conn(&self) -> StorageResult<&Object> {
        self.conn.as_ref().ok_or(StorageError::TransactionClosed)
    }

    async fn finish(mut self, statement: &str) -> StorageResult<()> {
        let result = self.conn()?.batch_execute(statement).await;
        match result {
            Ok(()) => {
                self.finished = true;
                Ok(())
            }
            // The connection is left to Drop, which discards it.
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn execute_one(
        &self,
        operation: &str,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> StorageResult<()> {
        let affected = self
            .conn()?
            .execute(sql, params)
            .await
            .map_err(storage_error)?;
        if affected != 1 {
            return Err(StorageError::Query {
                reason: format!("{operation} touched {affected} rows, expected 1"),
            });
        }
        Ok(())
    }
}

impl Drop for PgTx {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Transaction dropped while open, discarding its connection");
            drop(Object::take(conn));
        }
    }
}

#[async_trait]
impl LedgerTx for PgTx {
    async fn owner_of(&mut self, entity: EntityRef) -> StorageResult<Option<UserId>> {
        let sql = match entity {
            EntityRef::Board(_) => "SELECT user_id FROM board WHERE id = $1",
            EntityRef::Column(_) => {
                r#"SELECT b.user_id FROM "column" c
                   JOIN board b ON b.id = c.board_id
                   WHERE c.id = $1"#
            }
            EntityRef::Task(_) => {
                r#"SELECT b.user_id FROM task t
                   JOIN "column" c ON c.id = t.column_id
                   JOIN board b ON b.id = c.board_id
                   WHERE t.id = $1"#
            }
        };
        let id = entity.id();
        let row = self
            .conn()?
            .query_opt(sql, &[&id])
            .await
            .map_err(storage_error)?;
        row.map(|r| decode(r.try_get::<_, Uuid>(0)).map(UserId::new))
            .transpose()
    }

    async fn lock_owner(&mut self, owner: UserId) -> StorageResult<()> {
        let key = owner.to_string();
        self.conn()?
            .execute(
                "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
                &[&key],
            )
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn count(&mut self, container: Container) -> StorageResult<usize> {
        let (sql, id) = match container {
            Container::Board(id) => (
                r#"SELECT count(*) FROM "column" WHERE board_id = $1"#,
                id.as_uuid(),
            ),
            Container::Column(id) => ("SELECT count(*) FROM task WHERE column_id = $1", id.as_uuid()),
        };
        let row = self
            .conn()?
            .query_one(sql, &[&id])
            .await
            .map_err(storage_error)?;
        let count: i64 = decode(row.try_get(0))?;
        usize::try_from(count).map_err(|_| StorageError::Query {
            reason: format!("negative count {count}"),
        })
    }

    async fn next_position(&mut self, container: Container) -> StorageResult<Position> {
        let (sql, id) = match container {
            Container::Board(id) => (
                r#"SELECT COALESCE(MAX(position), 0) + 1 FROM "column" WHERE board_id = $1"#,
                id.as_uuid(),
            ),
            Container::Column(id) => (
                "SELECT COALESCE(MAX(position), 0) + 1 FROM task WHERE column_id = $1",
                id.as_uuid(),
            ),
        };
        let row = self
            .conn()?
            .query_one(sql, &[&id])
            .await
            .map_err(storage_error)?;
        decode(row.try_get::<_, i32>(0))
    }

    async fn shift(&mut self, container: Container, shift: Shift) -> StorageResult<u64> {
        let (sql, id) = match container {
            Container::Board(id) => (
                r#"UPDATE "column" SET position = position + $2
                   WHERE board_id = $1 AND position BETWEEN $3 AND $4"#,
                id.as_uuid(),
            ),
            Container::Column(id) => (
                "UPDATE task SET position = position + $2 \
                 WHERE column_id = $1 AND position BETWEEN $3 AND $4",
                id.as_uuid(),
            ),
        };
        self.conn()?
            .execute(
                sql,
                &[&id, &shift.delta, &shift.range.start, &shift.range.end],
            )
            .await
            .map_err(storage_error)
    }

    // ========================================================================
    // BOARDS
    // ========================================================================

    async fn insert_board(&mut self, board: &Board) -> StorageResult<()> {
        self.execute_one(
            "insert_board",
            "INSERT INTO board (id, user_id, name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &board.id.as_uuid(),
                &board.user_id.as_uuid(),
                &board.name,
                &board.created_at,
                &board.updated_at,
            ],
        )
        .await
    }

    async fn get_board(&mut self, id: BoardId) -> StorageResult<Option<Board>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM board WHERE id = $1");
        let row = self
            .conn()?
            .query_opt(&sql, &[&id.as_uuid()])
            .await
            .map_err(storage_error)?;
        row.as_ref().map(board_from_row).transpose()
    }

    async fn list_boards(&mut self, owner: UserId) -> StorageResult<Vec<Board>> {
        let sql =
            format!("SELECT {BOARD_COLUMNS} FROM board WHERE user_id = $1 ORDER BY created_at, id");
        let rows = self
            .conn()?
            .query(&sql, &[&owner.as_uuid()])
            .await
            .map_err(storage_error)?;
        rows.iter().map(board_from_row).collect()
    }

    async fn rename_board(&mut self, id: BoardId, name: &str, at: Timestamp) -> StorageResult<()> {
        self.execute_one(
            "rename_board",
            "UPDATE board SET name = $2, updated_at = $3 WHERE id = $1",
            &[&id.as_uuid(), &name, &at],
        )
        .await
    }

    async fn delete_board(&mut self, id: BoardId) -> StorageResult<()> {
        self.conn()?
            .execute("DELETE FROM board WHERE id = $1", &[&id.as_uuid()])
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    // ========================================================================
    // COLUMNS
    // ========================================================================

    async fn insert_column(&mut self, column: &Column) -> StorageResult<()> {
        self.execute_one(
            "insert_column",
            r#"INSERT INTO "column" (id, board_id, name, position, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
            &[
                &column.id.as_uuid(),
                &column.board_id.as_uuid(),
                &column.name,
                &column.position,
                &column.created_at,
                &column.updated_at,
            ],
        )
        .await
    }

    async fn get_column(&mut self, id: ColumnId) -> StorageResult<Option<Column>> {
        let sql = format!(r#"SELECT {COLUMN_COLUMNS} FROM "column" WHERE id = $1"#);
        let row = self
            .conn()?
            .query_opt(&sql, &[&id.as_uuid()])
            .await
            .map_err(storage_error)?;
        row.as_ref().map(column_from_row).transpose()
    }

    async fn list_columns(&mut self, board: BoardId) -> StorageResult<Vec<Column>> {
        let sql = format!(
            r#"SELECT {COLUMN_COLUMNS} FROM "column" WHERE board_id = $1 ORDER BY position"#
        );
        let rows = self
            .conn()?
            .query(&sql, &[&board.as_uuid()])
            .await
            .map_err(storage_error)?;
        rows.iter().map(column_from_row).collect()
    }

    async fn rename_column(&mut self, id: ColumnId, name: &str, at: Timestamp) -> StorageResult<()> {
        self.execute_one(
            "rename_column",
            r#"UPDATE "column" SET name = $2, updated_at = $3 WHERE id = $1"#,
            &[&id.as_uuid(), &name, &at],
        )
        .await
    }

    async fn set_column_position(
        &mut self,
        id: ColumnId,
        position: Position,
        at: Timestamp,
    ) -> StorageResult<()> {
        self.execute_one(
            "set_column_position",
            r#"UPDATE "column" SET position = $2, updated_at = $3 WHERE id = $1"#,
            &[&id.as_uuid(), &position, &at],
        )
        .await
    }

    async fn delete_column(&mut self, id: ColumnId) -> StorageResult<()> {
        self.conn()?
            .execute(r#"DELETE FROM "column" WHERE id = $1"#, &[&id.as_uuid()])
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    // ========================================================================
    // TASKS
    // ========================================================================

    async fn insert_task(&mut self, task: &Task) -> StorageResult<()> {
        self.execute_one(
            "insert_task",
            "INSERT INTO task \
             (id, column_id, name, description, position, done, deadline, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            &[
                &task.id.as_uuid(),
                &task.column_id.as_uuid(),
                &task.name,
                &task.description,
                &task.position,
                &task.done,
                &task.deadline,
                &task.created_at,
                &task.updated_at,
            ],
        )
        .await
    }

    async fn get_task(&mut self, id: TaskId) -> StorageResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM task WHERE id = $1");
        let row = self
            .conn()?
            .query_opt(&sql, &[&id.as_uuid()])
            .await
            .map_err(storage_error)?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_tasks(&mut self, column: ColumnId) -> StorageResult<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM task WHERE column_id = $1 ORDER BY position");
        let rows = self
            .conn()?
            .query(&sql, &[&column.as_uuid()])
            .await
            .map_err(storage_error)?;
        rows.iter().map(task_from_row).collect()
    }

    async fn update_task_content(
        &mut self,
        id: TaskId,
        content: &TaskContent,
        at: Timestamp,
    ) -> StorageResult<()> {
        // `deadline` is only written when present; Some(None) writes NULL.
        let set_deadline = content.deadline.is_some();
        let deadline = content.deadline.flatten();
        self.execute_one(
            "update_task_content",
            "UPDATE task SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                done = COALESCE($4, done), \
                deadline = CASE WHEN $5 THEN $6 ELSE deadline END, \
                updated_at = $7 \
             WHERE id = $1",
            &[
                &id.as_uuid(),
                &content.name,
                &content.description,
                &content.done,
                &set_deadline,
                &deadline,
                &at,
            ],
        )
        .await
    }

    async fn set_task_position(
        &mut self,
        id: TaskId,
        column: ColumnId,
        position: Position,
        at: Timestamp,
    ) -> StorageResult<()> {
        self.execute_one(
            "set_task_position",
            "UPDATE task SET column_id = $2, position = $3, updated_at = $4 WHERE id = $1",
            &[&id.as_uuid(), &column.as_uuid(), &position, &at],
        )
        .await
    }

    async fn delete_task(&mut self, id: TaskId) -> StorageResult<()> {
        self.conn()?
            .execute("DELETE FROM task WHERE id = $1", &[&id.as_uuid()])
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    // ========================================================================
    // COMPLETION
    // ========================================================================

    async fn commit(self) -> StorageResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self) -> StorageResult<()> {
        self.finish("ROLLBACK").await
    }
}
