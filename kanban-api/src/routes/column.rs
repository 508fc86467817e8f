//! Column REST API Routes

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use kanban_core::{BoardId, ColumnId};
use kanban_storage::LedgerStore;

use crate::{
    error::ApiResult,
    extractors::{JsonBody, PathId},
    middleware::AuthExtractor,
    routes::task,
    state::AppState,
    types::{ColumnPatch, CreateColumnRequest},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /boards/:id/columns - Append a column at the end of the board
pub async fn create_column<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(board): PathId<BoardId>,
    JsonBody(req): JsonBody<CreateColumnRequest>,
) -> ApiResult<impl IntoResponse> {
    let column = state
        .service
        .create_column(auth.user_id, board, &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(column)))
}

/// GET /boards/:id/columns - Columns ordered by position
pub async fn list_columns<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(board): PathId<BoardId>,
) -> ApiResult<impl IntoResponse> {
    let columns = state.service.list_columns(auth.user_id, board).await?;
    Ok(Json(columns))
}

/// GET /columns/:id
pub async fn get_column<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<ColumnId>,
) -> ApiResult<impl IntoResponse> {
    let column = state.service.get_column(auth.user_id, id).await?;
    Ok(Json(column))
}

/// PATCH /columns/:id - Rename, reorder, or both in one transaction
pub async fn update_column<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<ColumnId>,
    JsonBody(patch): JsonBody<ColumnPatch>,
) -> ApiResult<impl IntoResponse> {
    let update = patch.into_update()?;
    let column = state.service.update_column(auth.user_id, id, update).await?;
    Ok(Json(column))
}

/// DELETE /columns/:id - Closes the gap and drops the column's tasks
pub async fn delete_column<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<ColumnId>,
) -> ApiResult<StatusCode> {
    state.service.delete_column(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

/// Column routes, including the column-scoped task collection.
pub fn create_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            "/:id",
            get(get_column::<S>)
                .patch(update_column::<S>)
                .delete(delete_column::<S>),
        )
        .route(
            "/:id/tasks",
            get(task::list_tasks::<S>).post(task::create_task::<S>),
        )
        .with_state(state)
}
