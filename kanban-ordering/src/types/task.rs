//! Task type

use super::ids::{ColumnId, TagId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task/card on the kanban board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    /// Position among the sibling tasks of the owning column
    pub order: f64,
    /// Owning column
    pub column_id: ColumnId,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

impl Task {
    /// Create a task with the given name and order.
    ///
    /// The owning column is set when the task is placed into one.
    pub fn new(name: impl Into<String>, order: f64) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            description: String::new(),
            due_date: None,
            completed_date: None,
            order,
            column_id: ColumnId::from_string(""),
            tags: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_completed_date(mut self, completed: DateTime<Utc>) -> Self {
        self.completed_date = Some(completed);
        self
    }

    pub fn with_tags(mut self, tags: Vec<TagId>) -> Self {
        self.tags = tags;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed_date.is_some()
    }
}
