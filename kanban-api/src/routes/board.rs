//! Board REST API Routes
//!
//! Boards are the ownership roots. Every handler passes the caller from
//! the token to the service, which gates access by the board's user.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use kanban_core::BoardId;
use kanban_storage::LedgerStore;

use crate::{
    error::ApiResult,
    extractors::{JsonBody, PathId},
    middleware::AuthExtractor,
    routes::column,
    state::AppState,
    types::{CreateBoardRequest, RenameBoardRequest},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /boards - Create a board owned by the caller
pub async fn create_board<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    JsonBody(req): JsonBody<CreateBoardRequest>,
) -> ApiResult<impl IntoResponse> {
    let board = state.service.create_board(auth.user_id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// GET /boards - The caller's boards, oldest first
pub async fn list_boards<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let boards = state.service.list_boards(auth.user_id).await?;
    Ok(Json(boards))
}

/// GET /boards/:id
pub async fn get_board<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<BoardId>,
) -> ApiResult<impl IntoResponse> {
    let board = state.service.get_board(auth.user_id, id).await?;
    Ok(Json(board))
}

/// PATCH|PUT /boards/:id - Rename
pub async fn rename_board<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<BoardId>,
    JsonBody(req): JsonBody<RenameBoardRequest>,
) -> ApiResult<impl IntoResponse> {
    let board = state.service.rename_board(auth.user_id, id, &req.name).await?;
    Ok(Json(board))
}

/// DELETE /boards/:id - Cascades to columns and tasks
pub async fn delete_board<S: LedgerStore>(
    State(state): State<AppState<S>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<BoardId>,
) -> ApiResult<StatusCode> {
    state.service.delete_board(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

/// Board routes, including the board-scoped column collection.
pub fn create_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(list_boards::<S>).post(create_board::<S>))
        .route(
            "/:id",
            get(get_board::<S>)
                .patch(rename_board::<S>)
                .put(rename_board::<S>)
                .delete(delete_board::<S>),
        )
        .route(
            "/:id/columns",
            get(column::list_columns::<S>).post(column::create_column::<S>),
        )
        .with_state(state)
}
