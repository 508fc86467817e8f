//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling with deadpool-postgres, the bootstrap
//! retry loop and the idempotent schema migration.

use crate::error::{ApiError, ApiResult};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;

// ============================================================================
// SCHEMA
// ============================================================================

/// Tables for boards, columns and tasks.
///
/// Positions are unique per container but the check is deferred to commit,
/// so a shift may pass through transient duplicates.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS board (
    id          uuid PRIMARY KEY,
    user_id     uuid NOT NULL,
    name        text NOT NULL,
    created_at  timestamptz NOT NULL,
    updated_at  timestamptz NOT NULL
);

CREATE INDEX IF NOT EXISTS board_user_id_idx ON board (user_id);

CREATE TABLE IF NOT EXISTS "column" (
    id          uuid PRIMARY KEY,
    board_id    uuid NOT NULL REFERENCES board (id) ON DELETE CASCADE,
    name        text NOT NULL,
    position    integer NOT NULL CHECK (position >= 1),
    created_at  timestamptz NOT NULL,
    updated_at  timestamptz NOT NULL,
    CONSTRAINT column_board_position_key
        UNIQUE (board_id, position) DEFERRABLE INITIALLY DEFERRED
);

CREATE TABLE IF NOT EXISTS task (
    id          uuid PRIMARY KEY,
    column_id   uuid NOT NULL REFERENCES "column" (id) ON DELETE CASCADE,
    name        text NOT NULL,
    description text NOT NULL DEFAULT '',
    position    integer NOT NULL CHECK (position >= 1),
    done        boolean NOT NULL DEFAULT false,
    deadline    timestamptz,
    created_at  timestamptz NOT NULL,
    updated_at  timestamptz NOT NULL,
    CONSTRAINT task_column_position_key
        UNIQUE (column_id, position) DEFERRABLE INITIALLY DEFERRED
);
"#;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Time to wait for a pooled connection
    pub timeout: Duration,
    /// How many times bootstrap tries to reach the server
    pub connect_attempts: u32,
    /// Fixed delay between bootstrap attempts
    pub connect_delay: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "kanban".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
            connect_attempts: 10,
            connect_delay: Duration::from_millis(1000),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// Reads `KANBAN_DB_HOST`, `KANBAN_DB_PORT`, `KANBAN_DB_NAME`,
    /// `KANBAN_DB_USER`, `KANBAN_DB_PASSWORD`, `KANBAN_DB_POOL_SIZE`,
    /// `KANBAN_DB_TIMEOUT` (seconds), `KANBAN_DB_CONNECT_ATTEMPTS` and
    /// `KANBAN_DB_CONNECT_DELAY_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("KANBAN_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("KANBAN_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("KANBAN_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("KANBAN_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("KANBAN_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("KANBAN_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("KANBAN_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_attempts: std::env::var("KANBAN_DB_CONNECT_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.connect_attempts),
            connect_delay: std::env::var("KANBAN_DB_CONNECT_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_delay),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Owner of the connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build the pool. No connection is opened yet.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Build the pool and wait until the server answers, retrying with a
    /// fixed delay up to `connect_attempts` times.
    pub async fn connect_with_retry(config: &DbConfig) -> ApiResult<Self> {
        let client = Self::from_config(config)?;
        let attempts = config.connect_attempts.max(1);

        for attempt in 1..=attempts {
            match client.health_check().await {
                Ok(()) => {
                    tracing::info!(attempt, host = %config.host, "Connected to database");
                    return Ok(client);
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        error = %e,
                        "Database not reachable, retrying"
                    );
                    tokio::time::sleep(config.connect_delay).await;
                }
                Err(e) => {
                    tracing::error!(attempts, error = %e, "Giving up on database connection");
                    return Err(ApiError::service_unavailable(format!(
                        "Database unreachable after {} attempts",
                        attempts
                    )));
                }
            }
        }

        Err(ApiError::service_unavailable("Database unreachable"))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    pub async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Create the tables if they do not exist yet.
    pub async fn run_migrations(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await?;
        tracing::info!("Schema migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "kanban");
        assert_eq!(config.connect_attempts, 10);
        assert_eq!(config.connect_delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        let config = DbConfig {
            host: "db.invalid".to_string(),
            ..DbConfig::default()
        };
        let client = DbClient::from_config(&config).expect("pool builds without connecting");
        assert_eq!(client.pool_size(), 0);
    }

    #[test]
    fn test_schema_defers_position_uniqueness() {
        assert_eq!(SCHEMA.matches("DEFERRABLE INITIALLY DEFERRED").count(), 2);
        assert_eq!(SCHEMA.matches("ON DELETE CASCADE").count(), 2);
        assert_eq!(SCHEMA.matches("CHECK (position >= 1)").count(), 2);
    }
}
