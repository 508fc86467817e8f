//! Kanban API - HTTP Layer and PostgreSQL Store
//!
//! Exposes the position ledger over REST (Axum) with JWT bearer auth, and
//! provides the PostgreSQL implementation of the ledger's store seam.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod pg_store;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use auth::{
    authenticate, generate_jwt_token, validate_jwt_token, AuthConfig, AuthContext, Claims,
    JwtSecret,
};
pub use config::ApiConfig;
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use pg_store::{PgStore, PgTx};
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
