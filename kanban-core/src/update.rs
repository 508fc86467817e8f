//! Partial updates and their classification
//!
//! A PATCH body arrives as a loose [`TaskPatch`] or [`ColumnPatch`]. Before any
//! ledger code runs it is turned into exactly one unambiguous update shape, or
//! rejected as malformed.

use crate::entities::Task;
use crate::error::{KanbanError, KanbanResult};
use crate::identity::{ColumnId, Timestamp};
use crate::position::Position;
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Saturate a wire position into [`Position`].
///
/// Anything outside the `i32` range is still out of bounds for every
/// container, so the ledger's bound check reports it as `InvalidPosition`.
fn saturate_position(raw: i64) -> Position {
    Position::try_from(raw).unwrap_or(if raw < 0 { Position::MIN } else { Position::MAX })
}

/// Trim a display name and reject it if nothing is left.
pub fn validate_name(field: &str, value: &str) -> KanbanResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(KanbanError::malformed(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// TASKS
// ============================================================================

/// Raw task update body, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Option<Timestamp>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<ColumnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

/// Content fields of a task. `deadline: Some(None)` clears the deadline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContent {
    pub name: Option<String>,
    pub description: Option<String>,
    pub done: Option<bool>,
    pub deadline: Option<Option<Timestamp>>,
}

impl TaskContent {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.done.is_none()
            && self.deadline.is_none()
    }

    /// Overwrite the fields that are present.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(done) = self.done {
            task.done = done;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
    }
}

/// The three legal shapes of a task update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskUpdate {
    /// Content fields only.
    Content(TaskContent),
    /// Reorder inside the current column.
    Position { position: Position },
    /// Move to another column at the given position.
    ColumnMove {
        column_id: ColumnId,
        position: Position,
    },
}

impl TaskPatch {
    /// Classify the patch into exactly one [`TaskUpdate`].
    pub fn into_update(self) -> KanbanResult<TaskUpdate> {
        let content = TaskContent {
            name: self
                .name
                .as_deref()
                .map(|name| validate_name("name", name))
                .transpose()?,
            description: self.description,
            done: self.done,
            deadline: self.deadline,
        };

        let position = self.position.map(saturate_position);
        match (content.is_empty(), self.column_id, position) {
            (false, None, None) => Ok(TaskUpdate::Content(content)),
            (true, None, Some(position)) => Ok(TaskUpdate::Position { position }),
            (true, Some(column_id), Some(position)) => {
                Ok(TaskUpdate::ColumnMove { column_id, position })
            }
            (true, None, None) => Err(KanbanError::malformed("update has no fields")),
            (true, Some(_), None) => Err(KanbanError::malformed(
                "column_id requires a position",
            )),
            (false, _, _) => Err(KanbanError::malformed(
                "content fields cannot be combined with column_id or position",
            )),
        }
    }
}

// ============================================================================
// COLUMNS
// ============================================================================

/// Raw column update body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

/// A validated column update: a rename, a reorder, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnUpdate {
    pub name: Option<String>,
    pub position: Option<Position>,
}

impl ColumnPatch {
    pub fn into_update(self) -> KanbanResult<ColumnUpdate> {
        if self.name.is_none() && self.position.is_none() {
            return Err(KanbanError::malformed("update has no fields"));
        }
        Ok(ColumnUpdate {
            name: self
                .name
                .as_deref()
                .map(|name| validate_name("name", name))
                .transpose()?,
            position: self.position.map(saturate_position),
        })
    }
}
