//! REST API Routes Module
//!
//! Route handlers organized by entity type, plus the secure router
//! builder that wires auth, tracing and CORS around them.
//!
//! Every route except `/health*` requires a bearer token.

pub mod board;
pub mod column;
pub mod health;
pub mod task;

use std::time::Duration;

use axum::{
    http::{header, request::Parts, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use kanban_ledger::KanbanService;
use kanban_storage::LedgerStore;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
use crate::state::AppState;
use crate::telemetry::observability_middleware;
use crate::types::MeResponse;

pub use board::create_router as board_router;
pub use column::create_router as column_router;
pub use health::create_router as health_router;
pub use task::create_router as task_router;

// ============================================================================
// IDENTITY
// ============================================================================

/// GET /me - The caller as seen by the server
pub async fn me(AuthExtractor(auth): AuthExtractor) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: auth.user_id,
    })
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builder for the API router with auth on every entity route.
///
/// Public routes (health) skip authentication but still get tracing and
/// CORS.
pub struct SecureRouterBuilder<S: LedgerStore> {
    state: AppState<S>,
    api_config: ApiConfig,
    auth_state: AuthMiddlewareState,
}

impl<S: LedgerStore> SecureRouterBuilder<S> {
    /// In production this refuses an insecure JWT secret or a missing CORS
    /// origin list.
    pub fn new(
        service: KanbanService<S>,
        api_config: ApiConfig,
        auth_config: AuthConfig,
    ) -> ApiResult<Self> {
        let is_production = api_config.is_production();
        auth_config.validate_for_production(is_production)?;
        api_config.validate_for_production()?;

        Ok(Self {
            state: AppState::new(service),
            api_config,
            auth_state: AuthMiddlewareState::new(auth_config),
        })
    }

    fn build_entity_routes(&self) -> Router {
        Router::new()
            .route("/me", get(me))
            .nest("/boards", board::create_router(self.state.clone()))
            .nest("/columns", column::create_router(self.state.clone()))
            .nest("/tasks", task::create_router(self.state.clone()))
    }

    /// # Middleware Order (outer to inner)
    /// 1. CORS - answers preflight requests
    /// 2. TraceLayer and observability - request span and outcome log
    /// 3. Auth (entity routes only)
    pub fn build(self) -> Router {
        let entity_routes = self
            .build_entity_routes()
            .layer(from_fn_with_state(self.auth_state.clone(), auth_middleware));

        let router = Router::new()
            .merge(entity_routes)
            .nest("/health", health::create_router(self.state.clone()));

        let cors = build_cors_layer(&self.api_config);

        router
            .layer(from_fn(observability_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// Otherwise only configured origins, `*.domain` patterns included.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        return cors.allow_origin(Any);
    }

    tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
    let allowed = config.clone();
    let cors = cors.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts: &Parts| {
            origin
                .to_str()
                .map(|o| allowed.is_origin_allowed(o))
                .unwrap_or(false)
        },
    ));

    if config.cors_allow_credentials {
        cors.allow_credentials(true)
    } else {
        cors
    }
}

/// Create the complete API router.
///
/// - `/boards`, `/columns`, `/tasks`, `/me` behind bearer auth
/// - `/health`, `/health/ready` public
pub fn create_api_router<S: LedgerStore>(
    service: KanbanService<S>,
    api_config: &ApiConfig,
    auth_config: AuthConfig,
) -> ApiResult<Router> {
    SecureRouterBuilder::new(service, api_config.clone(), auth_config).map(|b| b.build())
}
