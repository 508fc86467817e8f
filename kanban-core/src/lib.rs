//! Kanban Core - Entity Types and Position Arithmetic
//!
//! Pure data structures and pure functions. All other crates depend on this.
//! Nothing in here touches I/O: the ledger arithmetic produces shift plans
//! that a store applies inside its own transaction.

pub mod entities;
pub mod error;
pub mod identity;
pub mod position;
pub mod update;

pub use entities::{Board, Column, Container, EntityKind, EntityRef, Task};
pub use error::{KanbanError, KanbanResult};
pub use identity::{new_entity_id, BoardId, ColumnId, EntityIdType, TaskId, Timestamp, UserId};
pub use position::{
    is_dense, plan_move, plan_removal, plan_reorder, validate_position, MovePlan, Position,
    PositionRange, Shift,
};
pub use update::{validate_name, ColumnPatch, ColumnUpdate, TaskContent, TaskPatch, TaskUpdate};
