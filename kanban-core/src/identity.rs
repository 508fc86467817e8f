//! Identity types for kanban entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn new_entity_id() -> Uuid {
    Uuid::now_v7()
}

/// Common surface of the strongly-typed identifiers.
pub trait EntityIdType:
    Copy + Eq + Ord + std::hash::Hash + fmt::Display + fmt::Debug + Send + Sync + 'static
{
    /// Lowercase entity name used in error messages.
    const ENTITY_NAME: &'static str;

    /// Wrap a raw UUID.
    fn new(uuid: Uuid) -> Self;

    /// The underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Fresh timestamp-sortable identifier.
    fn now_v7() -> Self {
        Self::new(new_entity_id())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap a raw UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The nil identifier, never assigned to a stored row.
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }
        }

        impl EntityIdType for $name {
            const ENTITY_NAME: &'static str = $entity;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of the user at the root of every ownership chain.
    UserId,
    "user"
);
define_entity_id!(
    /// Identifier of a board.
    BoardId,
    "board"
);
define_entity_id!(
    /// Identifier of a column.
    ColumnId,
    "column"
);
define_entity_id!(
    /// Identifier of a task.
    TaskId,
    "task"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_roundtrip_through_strings() {
        let id = BoardId::now_v7();
        let parsed: BoardId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_invalid_id_string_is_rejected() {
        assert!("not-a-uuid".parse::<TaskId>().is_err());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let uuid = Uuid::now_v7();
        let json = serde_json::to_string(&ColumnId::new(uuid)).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }

    #[test]
    fn test_entity_names() {
        assert_eq!(BoardId::ENTITY_NAME, "board");
        assert_eq!(TaskId::ENTITY_NAME, "task");
    }

    #[test]
    fn test_v7_ids_sort_by_creation() {
        let first = UserId::now_v7();
        let second = UserId::now_v7();
        assert!(first <= second);
    }
}
