//! Task REST API Routes
//!
//! `PATCH /tasks/:id` accepts three body shapes. The body is classified
//! into a `TaskUpdate` here, before any ledger code runs:
//!
//! - content fields only (`name`, `description`, `done`, `deadline`)
//! - `position` alone, a reorder inside the current column
//! - `column_id` with `position`, a move to another column
//!
//! Anything else is a 400.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use kanban_core::{ColumnId, TaskId};
use kanban_storage::LedgerStore;

use crate::{
    error::ApiResult,
    extractors::{JsonBody, PathId},
    middleware::AuthExtractor,
    state::AppState,
    types::{CreateTaskRequest, TaskPatch},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /columns/:id/tasks - Append a task at the end of the column
pub async fn create_task<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(column): PathId<ColumnId>,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let task = state
        .service
        .create_task(auth.user_id, column, &req.name, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /columns/:id/tasks - Tasks ordered by position
pub async fn list_tasks<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(column): PathId<ColumnId>,
) -> ApiResult<impl IntoResponse> {
    let tasks = state.service.list_tasks(auth.user_id, column).await?;
    Ok(Json(tasks))
}

/// GET /tasks/:id
pub async fn get_task<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<TaskId>,
) -> ApiResult<impl IntoResponse> {
    let task = state.service.get_task(auth.user_id, id).await?;
    Ok(Json(task))
}

/// PATCH /tasks/:id
pub async fn update_task<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<TaskId>,
    JsonBody(patch): JsonBody<TaskPatch>,
) -> ApiResult<impl IntoResponse> {
    let update = patch.into_update()?;
    let task = state.service.update_task(auth.user_id, id, update).await?;
    Ok(Json(task))
}

/// DELETE /tasks/:id - Closes the gap in the column
pub async fn delete_task<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<TaskId>,
) -> ApiResult<StatusCode> {
    state.service.delete_task(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            "/:id",
            get(get_task::<S>)
                .patch(update_task::<S>)
                .delete(delete_task::<S>),
        )
        .with_state(state)
}
