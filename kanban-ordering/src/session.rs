//! Board session: drives the drag reducer and reconciles with storage.
//!
//! A [`BoardSession`] owns the in-memory board tree for one board. Drag
//! events are applied synchronously; when a drag ends with a changed position
//! the session issues exactly one [`BoardStore::update_item_position`] call.
//! A failed write is never retried: the board is reloaded from the store and a
//! [`Notification`] is queued for the host to display.

use crate::config::EngineConfig;
use crate::drag::{BoardState, DragEvent, DragItem, DropTarget, PendingMove};
use crate::error::{OrderingError, Result};
use crate::order::{self, Ordered};
use crate::store::{ActivityLog, BoardStore, CompletionChange, FileBoardStore, PositionUpdate};
use crate::types::{
    ActivityAction, ActivityEntry, Board, BoardId, Column, ColumnId, EntityType, Task, TaskId,
    TaskStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Toast-style message for the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// What happened when a drag was released
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// No position changed; nothing was written
    Unchanged,
    /// The move was written to the store
    Persisted(PendingMove),
    /// The write failed and the board was reloaded from the store
    RolledBack { reason: String },
}

/// One board, its drag session and its storage collaborators
pub struct BoardSession {
    store: Arc<dyn BoardStore>,
    activity: Arc<dyn ActivityLog>,
    config: EngineConfig,
    board_id: BoardId,
    state: BoardState,
    unsaved: Arc<watch::Sender<bool>>,
    /// Set when a position write was abandoned before it completed
    interrupted: Arc<AtomicBool>,
    notifications: Vec<Notification>,
}

/// Holds the unsaved-changes flag up for the duration of one position write.
///
/// Dropping it without [`finish`](Self::finish), which happens when the
/// `drag_end` future is cancelled mid-write, still lowers the flag and marks
/// the session for a reload.
struct PendingWrite {
    unsaved: Arc<watch::Sender<bool>>,
    interrupted: Arc<AtomicBool>,
    finished: bool,
}

impl PendingWrite {
    fn begin(unsaved: &Arc<watch::Sender<bool>>, interrupted: &Arc<AtomicBool>) -> Self {
        unsaved.send_replace(true);
        Self {
            unsaved: Arc::clone(unsaved),
            interrupted: Arc::clone(interrupted),
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        if !self.finished {
            warn!("position write abandoned before completion");
            self.interrupted.store(true, Ordering::SeqCst);
        }
        self.unsaved.send_replace(false);
    }
}

impl std::fmt::Debug for BoardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("board_id", &self.board_id)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("unsaved_changes", &*self.unsaved.borrow())
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}

impl BoardSession {
    /// Fetch the board and start an idle session
    pub async fn load(
        store: Arc<dyn BoardStore>,
        activity: Arc<dyn ActivityLog>,
        board_id: BoardId,
        config: EngineConfig,
    ) -> Result<Self> {
        let board = store.fetch_board(&board_id).await?;
        info!(board = %board_id, tasks = board.task_count(), "board session loaded");

        let state = BoardState::new(board).with_revert_on_cancel(config.revert_on_cancel);
        Ok(Self {
            store,
            activity,
            config,
            board_id,
            state,
            unsaved: Arc::new(watch::channel(false).0),
            interrupted: Arc::new(AtomicBool::new(false)),
            notifications: Vec::new(),
        })
    }

    /// Open the file-backed board found at or above `start`, reading
    /// configuration from the store directory
    pub async fn open(start: impl AsRef<Path>) -> Result<Self> {
        let store = Arc::new(FileBoardStore::find(start)?);
        let config = EngineConfig::load(store.root())?;
        let board_id = store.board_id().await?;
        Self::load(store.clone(), store, board_id, config).await
    }

    pub fn board(&self) -> &Board {
        self.state.board()
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging()
    }

    /// True while a position write is outstanding
    pub fn has_unsaved_changes(&self) -> bool {
        *self.unsaved.borrow()
    }

    /// Follow the unsaved-changes flag while `drag_end` is awaiting the store
    pub fn watch_unsaved_changes(&self) -> watch::Receiver<bool> {
        self.unsaved.subscribe()
    }

    /// Drain queued notifications
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // =========================================================================
    // Drag lifecycle
    // =========================================================================

    pub fn drag_start(&mut self, item: DragItem) {
        self.state.step(DragEvent::Start(item));
    }

    pub fn drag_over(&mut self, seq: u64, target: DropTarget) {
        self.state.step(DragEvent::Over { seq, target });
    }

    /// Release the dragged item and persist the final position if it changed
    pub async fn drag_end(&mut self, on_target: bool) -> DropOutcome {
        let outcome = match self.state.step(DragEvent::End { on_target }) {
            Some(pending) => self.persist(pending).await,
            None => DropOutcome::Unchanged,
        };
        self.reconcile_interrupted().await;
        outcome
    }

    async fn persist(&mut self, pending: PendingMove) -> DropOutcome {
        let write = PendingWrite::begin(&self.unsaved, &self.interrupted);
        self.warn_if_gap_collapsed(&pending);

        let (update, entity_type) = match &pending {
            PendingMove::Task {
                task_id,
                order,
                from_column,
                to_column,
                from_status,
                to_status,
            } => {
                let completion = match self.state.board_mut().find_task_mut(task_id) {
                    Some(task) => {
                        let change = completion_change(
                            *from_status,
                            *to_status,
                            task.is_completed(),
                            Utc::now(),
                        );
                        change.apply(&mut task.completed_date);
                        change
                    }
                    None => CompletionChange::Unchanged,
                };

                let mut update =
                    PositionUpdate::task(task_id.clone(), *order).with_completion(completion);
                if from_column != to_column {
                    update = update.in_column(to_column.clone());
                }
                (update, EntityType::Task)
            }
            PendingMove::Column { column_id, order } => (
                PositionUpdate::column(column_id.clone(), *order),
                EntityType::Column,
            ),
        };

        debug!(?update, "persisting position");
        match self.store.update_item_position(&update).await {
            Ok(()) => {
                write.finish();
                info!(item = pending.item_id(), order = pending.order(), "position persisted");
                self.record(pending.item_id(), entity_type, ActivityAction::Updated)
                    .await;
                DropOutcome::Persisted(pending)
            }
            Err(err) => {
                error!(
                    %err,
                    item = pending.item_id(),
                    retryable = err.is_retryable(),
                    "position update failed, reloading board"
                );
                self.rollback().await;
                write.finish();
                self.notifications
                    .push(Notification::error(self.config.failure_message.clone()));
                DropOutcome::RolledBack {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Replace the tree with the store's copy. Failure keeps the current tree.
    async fn rollback(&mut self) {
        match self.store.fetch_board(&self.board_id).await {
            Ok(board) => self.state.reset(board),
            Err(err) => error!(%err, board = %self.board_id, "reload failed, keeping local board"),
        }
    }

    /// Reload once if an earlier write was cancelled; its outcome is unknown
    async fn reconcile_interrupted(&mut self) {
        if self.state.is_dragging() || !self.interrupted.swap(false, Ordering::SeqCst) {
            return;
        }
        warn!(board = %self.board_id, "reloading board after an interrupted write");
        self.rollback().await;
    }

    /// Reload the board from the store
    pub async fn reload(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.interrupted.store(false, Ordering::SeqCst);
        let board = self.store.fetch_board(&self.board_id).await?;
        self.state.reset(board);
        Ok(())
    }

    fn warn_if_gap_collapsed(&self, pending: &PendingMove) {
        let board = self.state.board();
        let (lower, upper) = match pending {
            PendingMove::Task {
                task_id, to_column, ..
            } => {
                let Some(column) = board.find_column(to_column) else {
                    return;
                };
                let Some(index) = column.position_of(task_id) else {
                    return;
                };
                neighbors(&column.tasks, index)
            }
            PendingMove::Column { column_id, .. } => {
                let Some(index) = board.column_index(column_id) else {
                    return;
                };
                neighbors(&board.columns, index)
            }
        };

        if order::gap_collapsed(lower, pending.order(), upper, self.config.min_order_gap) {
            warn!(
                item = pending.item_id(),
                order = pending.order(),
                "order gap collapsed, neighbors are no longer distinguishable"
            );
        }
    }

    /// Best-effort activity entry
    async fn record(&self, entity_id: &str, entity_type: EntityType, action: ActivityAction) {
        if !self.config.record_activity {
            return;
        }
        let entry = ActivityEntry::new(entity_id, entity_type, action, &self.config.actor_id);
        if let Err(err) = self.activity.record_activity(&entry).await {
            warn!(%err, entity = entity_id, "failed to record activity");
        }
    }

    // =========================================================================
    // Create / update / delete
    // =========================================================================

    fn ensure_idle(&self) -> Result<()> {
        if self.state.is_dragging() {
            return Err(OrderingError::DragInProgress);
        }
        Ok(())
    }

    async fn prepare_edit(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.reconcile_interrupted().await;
        Ok(())
    }

    /// Append a new task at the tail of a column
    pub async fn add_task(&mut self, column_id: &ColumnId, name: impl Into<String>) -> Result<Task> {
        self.prepare_edit().await?;
        let column = self
            .state
            .board()
            .find_column(column_id)
            .ok_or_else(|| OrderingError::ColumnNotFound {
                id: column_id.to_string(),
            })?;

        let mut task = Task::new(name, order::tail_order(&column.tasks));
        task.column_id = column.id.clone();
        if column.task_status.is_done() {
            task.completed_date = Some(Utc::now());
        }

        self.store.create_task(&task).await?;
        if let Some(column) = self.state.board_mut().find_column_mut(column_id) {
            column.tasks.push(task.clone());
            order::sort_by_order(&mut column.tasks);
        }

        debug!(task = %task.id, column = %column_id, order = task.order, "task added");
        self.record(task.id.as_str(), EntityType::Task, ActivityAction::Created)
            .await;
        Ok(task)
    }

    /// Append a new column after the last one
    pub async fn add_column(
        &mut self,
        name: impl Into<String>,
        task_status: TaskStatus,
    ) -> Result<Column> {
        self.prepare_edit().await?;
        let column = Column::new(name, order::tail_order(&self.state.board().columns))
            .with_status(task_status);

        self.store.create_column(&column).await?;
        let board = self.state.board_mut();
        board.columns.push(column.clone());
        order::sort_by_order(&mut board.columns);

        debug!(column = %column.id, order = column.order, "column added");
        self.record(column.id.as_str(), EntityType::Column, ActivityAction::Created)
            .await;
        Ok(column)
    }

    /// Write name, description, dates and tags of an existing task.
    ///
    /// Order and column are left alone; those only change through a drag.
    pub async fn update_task(&mut self, task: &Task) -> Result<()> {
        self.prepare_edit().await?;
        let board = self.state.board();
        if board.find_task(&task.id).is_none() {
            return Err(OrderingError::TaskNotFound {
                id: task.id.to_string(),
            });
        }
        if let Some(tag) = task.tags.iter().find(|t| board.find_tag(t).is_none()) {
            return Err(OrderingError::TagNotFound { id: tag.to_string() });
        }

        self.store.update_task_fields(task).await?;
        if let Some(stored) = self.state.board_mut().find_task_mut(&task.id) {
            stored.name = task.name.clone();
            stored.description = task.description.clone();
            stored.due_date = task.due_date;
            stored.completed_date = task.completed_date;
            stored.tags = task.tags.clone();
        }

        self.record(task.id.as_str(), EntityType::Task, ActivityAction::Updated)
            .await;
        Ok(())
    }

    pub async fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        self.prepare_edit().await?;
        let index = self
            .state
            .board()
            .column_index_of_task(id)
            .ok_or_else(|| OrderingError::TaskNotFound { id: id.to_string() })?;

        self.store.delete_task(id).await?;
        self.state.board_mut().columns[index]
            .tasks
            .retain(|t| &t.id != id);

        self.record(id.as_str(), EntityType::Task, ActivityAction::Deleted)
            .await;
        Ok(())
    }

    /// Delete an empty column
    pub async fn delete_column(&mut self, id: &ColumnId) -> Result<()> {
        self.prepare_edit().await?;
        let column = self
            .state
            .board()
            .find_column(id)
            .ok_or_else(|| OrderingError::ColumnNotFound { id: id.to_string() })?;
        if !column.tasks.is_empty() {
            return Err(OrderingError::ColumnNotEmpty {
                id: id.to_string(),
                count: column.tasks.len(),
            });
        }

        self.store.delete_column(id).await?;
        self.state.board_mut().columns.retain(|c| &c.id != id);

        self.record(id.as_str(), EntityType::Column, ActivityAction::Deleted)
            .await;
        Ok(())
    }
}

/// Completed-date effect of dropping a task into a column.
///
/// Any drop into a Done column stamps a task that has no completed date, even
/// a reorder within that column; leaving a Done column clears the date.
fn completion_change(
    from: TaskStatus,
    to: TaskStatus,
    completed: bool,
    now: DateTime<Utc>,
) -> CompletionChange {
    if to.is_done() {
        if completed {
            CompletionChange::Unchanged
        } else {
            CompletionChange::Set(now)
        }
    } else if from.is_done() {
        CompletionChange::Cleared
    } else {
        CompletionChange::Unchanged
    }
}

fn neighbors<T: Ordered>(items: &[T], index: usize) -> (Option<f64>, Option<f64>) {
    let lower = index
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .map(Ordered::order);
    let upper = items.get(index + 1).map(Ordered::order);
    (lower, upper)
}
