//! Capacity guard

use kanban_core::{Container, KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};

/// Maximum number of items per container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_columns_per_board: usize,
    pub max_tasks_per_column: usize,
}

impl Limits {
    pub const DEFAULT_MAX_COLUMNS: usize = 42;
    pub const DEFAULT_MAX_TASKS: usize = 52;

    /// Limit that applies to `container`.
    pub fn max_for(&self, container: Container) -> usize {
        match container {
            Container::Board(_) => self.max_columns_per_board,
            Container::Column(_) => self.max_tasks_per_column,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_columns_per_board: Self::DEFAULT_MAX_COLUMNS,
            max_tasks_per_column: Self::DEFAULT_MAX_TASKS,
        }
    }
}

/// Reject an insert into a container that already holds `max` items.
pub fn check_capacity(container: Container, current_count: usize, max: usize) -> KanbanResult<()> {
    if current_count >= max {
        tracing::warn!(%container, current_count, max, "Container is full");
        return Err(KanbanError::LimitReached { container, max });
    }
    Ok(())
}
