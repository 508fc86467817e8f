//! Position arithmetic for dense 1..N ordering
//!
//! Every container keeps its items at positions `1..=count`. The functions
//! here validate a requested position and describe which neighbours must
//! shift to keep that range dense. They never touch storage: a store applies
//! the returned [`Shift`]s inside the same transaction as the move itself.

use crate::error::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};

/// 1-based position of an item inside its container.
pub type Position = i32;

// ============================================================================
// RANGES AND SHIFTS
// ============================================================================

/// Inclusive range of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRange {
    pub start: Position,
    pub end: Position,
}

impl PositionRange {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Every position at or after `start`.
    pub const fn from(start: Position) -> Self {
        Self {
            start,
            end: Position::MAX,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Add `delta` to every item whose position lies in `range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub range: PositionRange,
    pub delta: i32,
}

impl Shift {
    /// Make room: everything in `range` moves one slot later.
    pub const fn open(range: PositionRange) -> Self {
        Self { range, delta: 1 }
    }

    /// Close a gap: everything in `range` moves one slot earlier.
    pub const fn close(range: PositionRange) -> Self {
        Self { range, delta: -1 }
    }

    /// New position of an item currently at `position`.
    pub fn apply(&self, position: Position) -> Position {
        if self.range.contains(position) {
            position + self.delta
        } else {
            position
        }
    }
}

/// The two shifts of a cross-container move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePlan {
    /// Applied to the destination before the item arrives.
    pub open: Shift,
    /// Applied to the source after the item has left.
    pub close: Shift,
}

// ============================================================================
// PLANNING
// ============================================================================

/// Check `1 <= requested <= max`.
///
/// An empty container has `max == 0` for reorders, so every request fails.
pub fn validate_position(requested: Position, max: Position) -> KanbanResult<Position> {
    if requested < 1 || requested > max {
        return Err(KanbanError::InvalidPosition { requested, max });
    }
    Ok(requested)
}

/// Plan a reorder inside one container holding `count` items.
///
/// Returns `None` when the item already sits at `new`.
pub fn plan_reorder(old: Position, new: Position, count: usize) -> KanbanResult<Option<Shift>> {
    validate_position(new, clamp_count(count))?;
    let shift = match new.cmp(&old) {
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(Shift::close(PositionRange::new(old + 1, new))),
        std::cmp::Ordering::Less => Some(Shift::open(PositionRange::new(new, old - 1))),
    };
    Ok(shift)
}

/// Plan moving an item from position `old` of one container to `new` of
/// another that currently holds `dest_count` items.
pub fn plan_move(old: Position, new: Position, dest_count: usize) -> KanbanResult<MovePlan> {
    validate_position(new, clamp_count(dest_count).saturating_add(1))?;
    Ok(MovePlan {
        open: Shift::open(PositionRange::from(new)),
        close: plan_removal(old),
    })
}

/// Plan the compaction after removing the item at `old`.
pub fn plan_removal(old: Position) -> Shift {
    Shift::close(PositionRange::from(old + 1))
}

/// Whether `positions` are exactly `{1..=n}` for their length `n`.
pub fn is_dense<I>(positions: I) -> bool
where
    I: IntoIterator<Item = Position>,
{
    let mut sorted: Vec<Position> = positions.into_iter().collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .zip(1..)
        .all(|(position, expected)| *position == expected)
}

fn clamp_count(count: usize) -> Position {
    Position::try_from(count).unwrap_or(Position::MAX)
}
