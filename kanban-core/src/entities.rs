//! Core entity structures

use crate::identity::{BoardId, ColumnId, TaskId, Timestamp, UserId};
use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of entities that can be looked up and authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Board,
    Column,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Board => f.write_str("board"),
            EntityKind::Column => f.write_str("column"),
            EntityKind::Task => f.write_str("task"),
        }
    }
}

/// Reference to a single entity, dispatched by kind.
///
/// This is the only input the ownership resolver accepts, so every
/// entity-scoped operation goes through the same lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Board(BoardId),
    Column(ColumnId),
    Task(TaskId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Board(_) => EntityKind::Board,
            EntityRef::Column(_) => EntityKind::Column,
            EntityRef::Task(_) => EntityKind::Task,
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        match self {
            EntityRef::Board(id) => (*id).into(),
            EntityRef::Column(id) => (*id).into(),
            EntityRef::Task(id) => (*id).into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

impl From<BoardId> for EntityRef {
    fn from(id: BoardId) -> Self {
        EntityRef::Board(id)
    }
}

impl From<ColumnId> for EntityRef {
    fn from(id: ColumnId) -> Self {
        EntityRef::Column(id)
    }
}

impl From<TaskId> for EntityRef {
    fn from(id: TaskId) -> Self {
        EntityRef::Task(id)
    }
}

/// An ordered container: a board holds columns, a column holds tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Container {
    Board(BoardId),
    Column(ColumnId),
}

impl Container {
    /// The entity the container itself is.
    pub fn entity(&self) -> EntityRef {
        match self {
            Container::Board(id) => EntityRef::Board(*id),
            Container::Column(id) => EntityRef::Column(*id),
        }
    }

    /// Kind of the items the container orders.
    pub fn item_kind(&self) -> EntityKind {
        match self {
            Container::Board(_) => EntityKind::Column,
            Container::Column(_) => EntityKind::Task,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity().fmt(f)
    }
}

/// A board, the top-level container owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub user_id: UserId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A column, positioned within its board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub board_id: BoardId,
    pub name: String,
    pub position: Position,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A task, positioned within its column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub column_id: ColumnId,
    pub name: String,
    pub description: String,
    pub position: Position,
    pub done: bool,
    pub deadline: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityIdType;

    #[test]
    fn test_entity_ref_kind_and_id() {
        let id = TaskId::now_v7();
        let entity = EntityRef::from(id);
        assert_eq!(entity.kind(), EntityKind::Task);
        assert_eq!(entity.id(), id.as_uuid());
    }

    #[test]
    fn test_container_item_kinds() {
        assert_eq!(
            Container::Board(BoardId::now_v7()).item_kind(),
            EntityKind::Column
        );
        assert_eq!(
            Container::Column(ColumnId::now_v7()).item_kind(),
            EntityKind::Task
        );
    }

    #[test]
    fn test_entity_ref_serializes_tagged() {
        let id = ColumnId::now_v7();
        let json = serde_json::to_value(EntityRef::Column(id)).unwrap();
        assert_eq!(json["kind"], "column");
        assert_eq!(json["id"], id.to_string());
    }
}
