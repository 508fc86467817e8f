//! Error taxonomy shared by the ledger and everything above it

use crate::entities::{Container, EntityKind};
use crate::position::Position;
use thiserror::Error;
use uuid::Uuid;

/// Typed failures of a kanban operation.
///
/// `Internal` carries a detail string for logging only; the HTTP layer
/// never echoes it back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KanbanError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("access to {kind} {id} is forbidden")]
    Forbidden { kind: EntityKind, id: Uuid },

    #[error("{container} already holds the maximum of {max} items")]
    LimitReached { container: Container, max: usize },

    #[error("position {requested} is outside 1..={max}")]
    InvalidPosition { requested: Position, max: Position },

    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl KanbanError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        KanbanError::MalformedRequest {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        KanbanError::Internal {
            reason: reason.into(),
        }
    }
}

/// Result type for kanban operations.
pub type KanbanResult<T> = Result<T, KanbanError>;
