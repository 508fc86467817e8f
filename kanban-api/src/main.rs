//! Kanban API Server Entry Point
//!
//! Builds every configuration value from the environment, waits for the
//! database, applies the schema and starts the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use kanban_api::telemetry::{init_tracer, TelemetryConfig};
use kanban_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AuthConfig, DbClient, DbConfig, PgStore,
};
use kanban_ledger::{KanbanService, Limits};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env();

    let db_config = DbConfig::from_env();
    let db = DbClient::connect_with_retry(&db_config).await?;
    db.run_migrations().await?;

    let limits = Limits::default();
    let store = PgStore::new(db);
    let service = KanbanService::new(Arc::new(store), limits);

    let app: Router = create_api_router(service, &api_config, auth_config)?;

    let addr = api_config.bind_addr()?;
    tracing::info!(
        %addr,
        environment = %api_config.environment,
        max_columns = limits.max_columns_per_board,
        max_tasks = limits.max_tasks_per_column,
        "Starting kanban API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
