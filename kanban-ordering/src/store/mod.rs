//! Persistence collaborators.
//!
//! The engine never touches durable state directly. It reads the board through
//! [`BoardStore::fetch_board`], writes one [`PositionUpdate`] per completed
//! drag, and reports changes to an [`ActivityLog`].

mod file;
mod memory;

pub use file::{FileBoardStore, StoreLock};
pub use memory::MemoryBoardStore;

use crate::error::Result;
use crate::types::{ActivityEntry, Board, BoardId, Column, ColumnId, Task, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The task or column whose position changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Task(TaskId),
    Column(ColumnId),
}

/// Completion-date side effect carried with a task move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", content = "at", rename_all = "snake_case")]
pub enum CompletionChange {
    #[default]
    Unchanged,
    Set(DateTime<Utc>),
    Cleared,
}

impl CompletionChange {
    /// Apply to a task's completed date
    pub fn apply(self, completed_date: &mut Option<DateTime<Utc>>) {
        match self {
            Self::Unchanged => {}
            Self::Set(at) => *completed_date = Some(at),
            Self::Cleared => *completed_date = None,
        }
    }
}

/// A single position write, issued once per completed drag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub item: ItemRef,
    pub order: f64,
    /// New owning column; `None` for a same-column reorder or a column move
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<ColumnId>,
    #[serde(default)]
    pub completion: CompletionChange,
}

impl PositionUpdate {
    pub fn task(id: TaskId, order: f64) -> Self {
        Self {
            item: ItemRef::Task(id),
            order,
            column_id: None,
            completion: CompletionChange::Unchanged,
        }
    }

    pub fn column(id: ColumnId, order: f64) -> Self {
        Self {
            item: ItemRef::Column(id),
            order,
            column_id: None,
            completion: CompletionChange::Unchanged,
        }
    }

    pub fn in_column(mut self, column_id: ColumnId) -> Self {
        self.column_id = Some(column_id);
        self
    }

    pub fn with_completion(mut self, completion: CompletionChange) -> Self {
        self.completion = completion;
        self
    }
}

/// Durable owner of boards
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Load the full tree: columns with tasks, sorted by order
    async fn fetch_board(&self, board_id: &BoardId) -> Result<Board>;

    /// Record a new position. Either the write lands completely or an error
    /// is returned.
    async fn update_item_position(&self, update: &PositionUpdate) -> Result<()>;

    async fn create_task(&self, task: &Task) -> Result<()>;

    async fn create_column(&self, column: &Column) -> Result<()>;

    /// Write name, description, dates and tags of an existing task
    async fn update_task_fields(&self, task: &Task) -> Result<()>;

    async fn delete_task(&self, id: &TaskId) -> Result<()>;

    async fn delete_column(&self, id: &ColumnId) -> Result<()>;
}

/// Sink for activity entries. Callers treat failures as non-fatal.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record_activity(&self, entry: &ActivityEntry) -> Result<()>;
}
