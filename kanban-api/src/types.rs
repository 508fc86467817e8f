//! Request and Response Types
//!
//! JSON bodies accepted and returned by the routes. Entities themselves
//! (`Board`, `Column`, `Task`) serialize straight from kanban-core; update
//! bodies are the core `ColumnPatch`/`TaskPatch` types so classification
//! happens in one place.

use kanban_core::UserId;
use serde::{Deserialize, Serialize};

pub use kanban_core::{ColumnPatch, TaskPatch};

// ============================================================================
// BOARDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBoardRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameBoardRequest {
    pub name: String,
}

// ============================================================================
// COLUMNS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateColumnRequest {
    pub name: String,
}

// ============================================================================
// TASKS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// ============================================================================
// IDENTITY
// ============================================================================

/// Body of `GET /me`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: UserId,
}
