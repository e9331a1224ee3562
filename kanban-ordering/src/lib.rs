//! Drag-and-drop ordering engine for kanban boards
//!
//! Columns on a board and tasks inside a column are positioned by a
//! floating-point `order`. Moving an item assigns it a value between its new
//! neighbors, so exactly one record is written per completed drag.
//!
//! ## Overview
//!
//! - **Order arithmetic** - [`order`] computes midpoints and sorts siblings
//! - **Drag reducer** - [`drag::BoardState`] applies start/over/end events to
//!   the in-memory tree and yields the move to persist, without any I/O
//! - **Reconciliation** - [`BoardSession`] persists the move, records
//!   activity, and reloads from storage when a write fails
//! - **Storage** - [`BoardStore`] and [`ActivityLog`] are the collaborators;
//!   [`MemoryBoardStore`] and [`FileBoardStore`] implement both
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use kanban_ordering::{BoardSession, DragItem, DropOutcome, DropTarget};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = BoardSession::open("/path/to/repo").await?;
//!
//! session.drag_start(DragItem::Task("01J0...".into()));
//! session.drag_over(1, DropTarget::column("done"));
//!
//! match session.drag_end(true).await {
//!     DropOutcome::Persisted(mv) => println!("moved {} to {}", mv.item_id(), mv.order()),
//!     DropOutcome::RolledBack { reason } => eprintln!("reverted: {reason}"),
//!     DropOutcome::Unchanged => {}
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Structure
//!
//! ```text
//! repo/
//! └── .kanban/
//!     ├── board.yaml           # Board metadata and tags
//!     ├── ordering.toml        # Optional engine configuration
//!     ├── columns/{id}.yaml    # Column state
//!     ├── tasks/{id}.yaml      # Task state
//!     └── activity/
//!         └── current.jsonl    # Activity log
//! ```

pub mod config;
pub mod drag;
mod error;
pub mod order;
mod session;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use drag::{BoardState, DragEvent, DragItem, DropTarget, PendingMove, Placement, PointerHint};
pub use error::{OrderingError, Result};
pub use session::{BoardSession, DropOutcome, Notification, NotificationLevel};
pub use store::{
    ActivityLog, BoardStore, CompletionChange, FileBoardStore, ItemRef, MemoryBoardStore,
    PositionUpdate,
};
pub use types::{
    ActivityAction, ActivityEntry, Board, BoardId, Column, ColumnId, EntityType, Tag, TagColor,
    TagId, Task, TaskId, TaskStatus,
};
