use std::sync::Arc;

use kanban_api::db::{DbClient, DbConfig};
use kanban_api::PgStore;
use kanban_ledger::{KanbanService, Limits};

/// Service over the database named by the `KANBAN_DB_*` variables, with
/// the schema applied. Tests isolate themselves by using fresh user ids.
pub async fn test_pg_service(limits: Limits) -> (KanbanService<PgStore>, DbClient) {
    let config = DbConfig::from_env();
    let db = DbClient::from_config(&config).expect("Failed to create database client");
    db.run_migrations().await.expect("Failed to apply schema");
    let service = KanbanService::new(Arc::new(PgStore::new(db.clone())), limits);
    (service, db)
}
