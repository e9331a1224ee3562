//! Core types for the ordering engine

mod activity;
mod board;
mod ids;
mod task;

// Re-export all types
pub use activity::{ActivityAction, ActivityEntry, EntityType};
pub use board::{Board, BoardView, Column, Tag, TagColor, TaskStatus};
pub use ids::{ActivityId, BoardId, ColumnId, TagId, TaskId};
pub use task::Task;
