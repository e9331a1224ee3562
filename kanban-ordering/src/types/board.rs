//! Board-level types: Board, Column, Tag

use super::ids::{BoardId, ColumnId, TagId, TaskId};
use super::task::Task;
use serde::{Deserialize, Serialize};

/// How a board is presented when it is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardView {
    #[default]
    Kanban,
    Calendar,
    List,
}

/// Workflow classification of a column.
///
/// `Done` is significant: tasks entering a done column get a completed date,
/// tasks leaving one lose it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    None,
    New,
    Progress,
    Done,
}

impl TaskStatus {
    pub fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// The fixed tag palette
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagColor {
    Red,
    Orange,
    Yellow,
    Green,
    #[default]
    Blue,
    Purple,
    Pink,
    Gray,
}

/// A tag categorizes tasks. Tags belong to a board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub color: TagColor,
}

impl Tag {
    /// Create a new tag with a fresh id
    pub fn new(name: impl Into<String>, color: TagColor) -> Self {
        Self {
            id: TagId::new(),
            name: name.into(),
            color,
        }
    }

    pub fn with_id(mut self, id: impl Into<TagId>) -> Self {
        self.id = id.into();
        self
    }
}

/// A column is an ordered bucket of tasks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub task_status: TaskStatus,
    pub order: f64,
    /// Tasks sorted by order; see [`crate::order::sort_by_order`]
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Column {
    /// Create an empty column at the given order
    pub fn new(name: impl Into<String>, order: f64) -> Self {
        Self {
            id: ColumnId::new(),
            name: name.into(),
            description: None,
            task_status: TaskStatus::None,
            order,
            tasks: Vec::new(),
        }
    }

    /// Set the id (used for stable ids in fixtures and imports)
    pub fn with_id(mut self, id: impl Into<ColumnId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task_status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a task, claiming ownership of it
    pub fn with_task(mut self, mut task: Task) -> Self {
        task.column_id = self.id.clone();
        self.tasks.push(task);
        crate::order::sort_by_order(&mut self.tasks);
        self
    }

    pub fn find_task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn position_of(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }
}

/// The kanban board: metadata plus the ordered column tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub default_view: BoardView,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Board {
    /// Create a new board with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BoardId::new(),
            name: name.into(),
            default_view: BoardView::default(),
            tags: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<BoardId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        crate::order::sort_by_order(&mut self.columns);
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Default columns for a freshly created board
    pub fn default_columns() -> Vec<Column> {
        vec![
            Column::new("To Do", 1.0)
                .with_id("todo")
                .with_status(TaskStatus::New),
            Column::new("Doing", 2.0)
                .with_id("doing")
                .with_status(TaskStatus::Progress),
            Column::new("Done", 3.0)
                .with_id("done")
                .with_status(TaskStatus::Done),
        ]
    }

    pub fn find_column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    pub fn find_column_mut(&mut self, id: &ColumnId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| &c.id == id)
    }

    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    /// Index of the column owning the task
    pub fn column_index_of_task(&self, id: &TaskId) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.tasks.iter().any(|t| &t.id == id))
    }

    pub fn find_task(&self, id: &TaskId) -> Option<&Task> {
        self.columns.iter().find_map(|c| c.find_task(id))
    }

    pub fn find_task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.columns
            .iter_mut()
            .flat_map(|c| c.tasks.iter_mut())
            .find(|t| &t.id == id)
    }

    pub fn find_tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| &t.id == id)
    }

    /// Total number of tasks across columns
    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    /// Sort columns and every column's tasks for rendering
    pub fn normalize(&mut self) {
        crate::order::sort_by_order(&mut self.columns);
        for column in &mut self.columns {
            crate::order::sort_by_order(&mut column.tasks);
        }
    }
}
