//! In-memory board store

use super::{ActivityLog, BoardStore, ItemRef, PositionUpdate};
use crate::error::{OrderingError, Result};
use crate::order;
use crate::types::{ActivityEntry, Board, BoardId, Column, ColumnId, Task, TaskId};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

/// Holds one board and its activity in memory
#[derive(Debug)]
pub struct MemoryBoardStore {
    board: RwLock<Board>,
    activity: RwLock<Vec<ActivityEntry>>,
}

impl MemoryBoardStore {
    pub fn new(mut board: Board) -> Self {
        board.normalize();
        Self {
            board: RwLock::new(board),
            activity: RwLock::new(Vec::new()),
        }
    }

    /// Copy of the stored board
    pub async fn board(&self) -> Board {
        self.board.read().await.clone()
    }

    /// Recorded activity, oldest first
    pub async fn activity(&self) -> Vec<ActivityEntry> {
        self.activity.read().await.clone()
    }
}

#[async_trait]
impl BoardStore for MemoryBoardStore {
    async fn fetch_board(&self, board_id: &BoardId) -> Result<Board> {
        let board = self.board.read().await;
        if &board.id != board_id {
            return Err(OrderingError::BoardNotFound {
                id: board_id.to_string(),
            });
        }
        Ok(board.clone())
    }

    async fn update_item_position(&self, update: &PositionUpdate) -> Result<()> {
        trace!(?update, "memory store position update");
        let mut board = self.board.write().await;

        match &update.item {
            ItemRef::Column(id) => {
                let column = board
                    .find_column_mut(id)
                    .ok_or_else(|| OrderingError::ColumnNotFound { id: id.to_string() })?;
                column.order = update.order;
                order::sort_by_order(&mut board.columns);
            }
            ItemRef::Task(id) => {
                let source = board
                    .column_index_of_task(id)
                    .ok_or_else(|| OrderingError::TaskNotFound { id: id.to_string() })?;
                let dest = match &update.column_id {
                    Some(column_id) => board.column_index(column_id).ok_or_else(|| {
                        OrderingError::ColumnNotFound {
                            id: column_id.to_string(),
                        }
                    })?,
                    None => source,
                };

                let position = board.columns[source]
                    .position_of(id)
                    .ok_or_else(|| OrderingError::TaskNotFound { id: id.to_string() })?;
                let mut task = board.columns[source].tasks.remove(position);
                task.order = update.order;
                task.column_id = board.columns[dest].id.clone();
                update.completion.apply(&mut task.completed_date);

                let column = &mut board.columns[dest];
                column.tasks.push(task);
                order::sort_by_order(&mut column.tasks);
            }
        }
        Ok(())
    }

    async fn create_task(&self, task: &Task) -> Result<()> {
        let mut board = self.board.write().await;
        if board.find_task(&task.id).is_some() {
            return Err(OrderingError::persistence(format!(
                "task {} already exists",
                task.id
            )));
        }
        let column = board
            .find_column_mut(&task.column_id)
            .ok_or_else(|| OrderingError::ColumnNotFound {
                id: task.column_id.to_string(),
            })?;
        column.tasks.push(task.clone());
        order::sort_by_order(&mut column.tasks);
        Ok(())
    }

    async fn create_column(&self, column: &Column) -> Result<()> {
        let mut board = self.board.write().await;
        if board.find_column(&column.id).is_some() {
            return Err(OrderingError::persistence(format!(
                "column {} already exists",
                column.id
            )));
        }
        board.columns.push(column.clone());
        order::sort_by_order(&mut board.columns);
        Ok(())
    }

    async fn update_task_fields(&self, task: &Task) -> Result<()> {
        let mut board = self.board.write().await;
        let stored = board
            .find_task_mut(&task.id)
            .ok_or_else(|| OrderingError::TaskNotFound {
                id: task.id.to_string(),
            })?;
        stored.name = task.name.clone();
        stored.description = task.description.clone();
        stored.due_date = task.due_date;
        stored.completed_date = task.completed_date;
        stored.tags = task.tags.clone();
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        let mut board = self.board.write().await;
        let index = board
            .column_index_of_task(id)
            .ok_or_else(|| OrderingError::TaskNotFound { id: id.to_string() })?;
        board.columns[index].tasks.retain(|t| &t.id != id);
        Ok(())
    }

    async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        let mut board = self.board.write().await;
        let column = board
            .find_column(id)
            .ok_or_else(|| OrderingError::ColumnNotFound { id: id.to_string() })?;
        if !column.tasks.is_empty() {
            return Err(OrderingError::ColumnNotEmpty {
                id: id.to_string(),
                count: column.tasks.len(),
            });
        }
        board.columns.retain(|c| &c.id != id);
        Ok(())
    }
}

#[async_trait]
impl ActivityLog for MemoryBoardStore {
    async fn record_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.activity.write().await.push(entry.clone());
        Ok(())
    }
}
