//! Drag items, drop targets and pointer geometry

use crate::order::{compare_for_drop_position, DropSide};
use crate::types::{ColumnId, TaskId};
use serde::{Deserialize, Serialize};

/// The item picked up at drag start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DragItem {
    Task(TaskId),
    Column(ColumnId),
}

/// Pointer position and the hovered element's extent, projected onto the axis
/// the list is laid out along (vertical for tasks, horizontal for columns).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerHint {
    pub pointer: f64,
    pub start: f64,
    pub end: f64,
}

impl PointerHint {
    pub fn new(pointer: f64, start: f64, end: f64) -> Self {
        Self {
            pointer,
            start,
            end,
        }
    }

    /// Placement implied by the pointer, or `None` when the box is degenerate
    /// or the pointer sits exactly on its midline.
    pub fn placement(&self) -> Option<Placement> {
        if self.end <= self.start {
            return None;
        }
        let middle = (self.start + self.end) / 2.0;
        if self.pointer < middle {
            Some(Placement::BeforeTarget)
        } else if self.pointer > middle {
            Some(Placement::AfterTarget)
        } else {
            None
        }
    }
}

/// Where the dragged item lands relative to the hovered item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    BeforeTarget,
    AfterTarget,
}

impl From<DropSide> for Placement {
    /// An item coming from above lands below the target and vice versa
    fn from(side: DropSide) -> Self {
        match side {
            DropSide::Before => Self::AfterTarget,
            DropSide::After => Self::BeforeTarget,
        }
    }
}

/// A candidate drop target under the pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTarget {
    /// A specific task card
    Task {
        id: TaskId,
        #[serde(default)]
        hint: Option<PointerHint>,
    },
    /// A column's drop surface (or its header, when dragging columns)
    Column {
        id: ColumnId,
        #[serde(default)]
        hint: Option<PointerHint>,
    },
}

impl DropTarget {
    pub fn task(id: impl Into<TaskId>) -> Self {
        Self::Task {
            id: id.into(),
            hint: None,
        }
    }

    pub fn column(id: impl Into<ColumnId>) -> Self {
        Self::Column {
            id: id.into(),
            hint: None,
        }
    }

    /// Attach pointer geometry
    pub fn with_hint(self, hint: PointerHint) -> Self {
        match self {
            Self::Task { id, .. } => Self::Task {
                id,
                hint: Some(hint),
            },
            Self::Column { id, .. } => Self::Column {
                id,
                hint: Some(hint),
            },
        }
    }

    pub fn hint(&self) -> Option<PointerHint> {
        match self {
            Self::Task { hint, .. } | Self::Column { hint, .. } => *hint,
        }
    }

    /// Identity of the target for the "already applied" guard.
    ///
    /// Two events hovering the same element in the same half are the same
    /// conceptual move.
    pub(crate) fn key(&self) -> TargetKey {
        let placement = self.hint().and_then(|h| h.placement());
        match self {
            Self::Task { id, .. } => TargetKey::Task(id.clone(), placement),
            Self::Column { id, .. } => TargetKey::Column(id.clone(), placement),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TargetKey {
    Task(TaskId, Option<Placement>),
    Column(ColumnId, Option<Placement>),
}

/// Decide which side of the hovered item the dragged item lands on.
///
/// Geometry wins when it is unambiguous. Otherwise, inside one container the
/// current orders tell which direction the item travels; across containers
/// there is no comparable order and the item goes before the target.
pub fn resolve_placement(
    hint: Option<PointerHint>,
    same_container: bool,
    dragged_order: f64,
    over_order: f64,
) -> Placement {
    if let Some(placement) = hint.and_then(|h| h.placement()) {
        return placement;
    }
    if same_container {
        compare_for_drop_position(dragged_order, over_order).into()
    } else {
        Placement::BeforeTarget
    }
}
