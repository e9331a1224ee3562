//! Drag-and-drop session handling

mod state;
mod target;

pub use state::{
    BoardState, ColumnSnapshot, DragEvent, DragState, PendingMove, TaskSnapshot, Transition,
};
pub use target::{resolve_placement, DragItem, DropTarget, Placement, PointerHint};
