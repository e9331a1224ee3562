//! End-to-end drag scenarios against the in-memory store

use async_trait::async_trait;
use kanban_ordering::{
    ActivityAction, Board, BoardId, BoardSession, BoardStore, Column, ColumnId,
    CompletionChange, DragItem, DropOutcome, DropTarget, EngineConfig, MemoryBoardStore,
    Notification, OrderingError, PointerHint, PositionUpdate, Result, Task, TaskId, TaskStatus,
};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Wraps a memory store, remembering every position write
struct RecordingStore {
    inner: MemoryBoardStore,
    updates: Mutex<Vec<PositionUpdate>>,
    reject: bool,
    /// When set, each position write waits for a permit
    gate: Option<Notify>,
}

impl RecordingStore {
    fn new(board: Board) -> Self {
        Self {
            inner: MemoryBoardStore::new(board),
            updates: Mutex::new(Vec::new()),
            reject: false,
            gate: None,
        }
    }

    fn gated(board: Board) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new(board)
        }
    }

    fn rejecting(board: Board) -> Self {
        Self {
            reject: true,
            ..Self::new(board)
        }
    }

    fn updates(&self) -> Vec<PositionUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl BoardStore for RecordingStore {
    async fn fetch_board(&self, board_id: &BoardId) -> Result<Board> {
        self.inner.fetch_board(board_id).await
    }

    async fn update_item_position(&self, update: &PositionUpdate) -> Result<()> {
        self.updates.lock().unwrap().push(update.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.reject {
            return Err(OrderingError::persistence("connection reset"));
        }
        self.inner.update_item_position(update).await
    }

    async fn create_task(&self, task: &Task) -> Result<()> {
        self.inner.create_task(task).await
    }

    async fn create_column(&self, column: &Column) -> Result<()> {
        self.inner.create_column(column).await
    }

    async fn update_task_fields(&self, task: &Task) -> Result<()> {
        self.inner.update_task_fields(task).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        self.inner.delete_task(id).await
    }

    async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        self.inner.delete_column(id).await
    }
}

/// A: T1(1) T2(2) T3(5) | B: empty | C (done): T8(1)
fn board() -> Board {
    Board::new("Scenarios")
        .with_id("board")
        .with_column(
            Column::new("A", 1.0)
                .with_id("a")
                .with_status(TaskStatus::Progress)
                .with_task(Task::new("T1", 1.0).with_id("t1"))
                .with_task(Task::new("T2", 2.0).with_id("t2"))
                .with_task(Task::new("T3", 5.0).with_id("t3")),
        )
        .with_column(Column::new("B", 2.0).with_id("b"))
        .with_column(
            Column::new("C", 3.0)
                .with_id("c")
                .with_status(TaskStatus::Done)
                .with_task(Task::new("T8", 1.0).with_id("t8")),
        )
}

async fn open(store: Arc<RecordingStore>) -> (BoardSession, Arc<MemoryBoardStore>) {
    let log = Arc::new(MemoryBoardStore::new(Board::new("activity")));
    let session = BoardSession::load(
        store,
        log.clone(),
        BoardId::from_string("board"),
        EngineConfig::default().with_actor("tester"),
    )
    .await
    .unwrap();
    (session, log)
}

fn column_orders(session: &BoardSession, column: &str) -> Vec<(String, f64)> {
    session
        .board()
        .find_column(&column.into())
        .unwrap()
        .tasks
        .iter()
        .map(|t| (t.id.to_string(), t.order))
        .collect()
}

#[tokio::test]
async fn test_drag_after_last_sibling() {
    let store = Arc::new(RecordingStore::new(board()));
    let (mut session, _log) = open(store.clone()).await;

    session.drag_start(DragItem::Task("t1".into()));
    session.drag_over(
        1,
        DropTarget::task("t3").with_hint(PointerHint::new(9.0, 0.0, 10.0)),
    );
    session.drag_end(true).await;

    assert_eq!(
        column_orders(&session, "a"),
        vec![
            ("t2".to_string(), 2.0),
            ("t3".to_string(), 5.0),
            ("t1".to_string(), 6.0)
        ]
    );
    assert_eq!(store.updates(), vec![PositionUpdate::task("t1".into(), 6.0)]);
}

#[tokio::test]
async fn test_drag_into_empty_column() {
    let store = Arc::new(RecordingStore::new(board()));
    let (mut session, log) = open(store.clone()).await;

    session.drag_start(DragItem::Task("t3".into()));
    session.drag_over(1, DropTarget::column("b"));
    let outcome = session.drag_end(true).await;

    assert!(matches!(outcome, DropOutcome::Persisted(_)));
    assert_eq!(column_orders(&session, "b"), vec![("t3".to_string(), 1.0)]);
    assert_eq!(
        store.updates(),
        vec![PositionUpdate::task("t3".into(), 1.0).in_column("b".into())]
    );

    let activity = log.activity().await;
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].actor_id, "tester");
    assert_eq!(activity[0].action, ActivityAction::Updated);
}

#[tokio::test]
async fn test_drag_between_two_siblings() {
    let store = Arc::new(RecordingStore::new(board()));
    let (mut session, _log) = open(store.clone()).await;

    session.drag_start(DragItem::Task("t3".into()));
    session.drag_over(1, DropTarget::task("t2"));
    session.drag_end(true).await;

    assert_eq!(
        column_orders(&session, "a"),
        vec![
            ("t1".to_string(), 1.0),
            ("t3".to_string(), 1.5),
            ("t2".to_string(), 2.0)
        ]
    );
}

#[tokio::test]
async fn test_drag_into_done_column_sends_completed_date() {
    let store = Arc::new(RecordingStore::new(board()));
    let (mut session, _log) = open(store.clone()).await;

    session.drag_start(DragItem::Task("t2".into()));
    session.drag_over(1, DropTarget::column("c"));
    session.drag_end(true).await;

    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].column_id, Some(ColumnId::from_string("c")));
    let CompletionChange::Set(at) = updates[0].completion else {
        panic!("expected a completed date, got {:?}", updates[0].completion);
    };
    assert_eq!(
        session.board().find_task(&"t2".into()).unwrap().completed_date,
        Some(at)
    );

    // And back out again
    session.drag_start(DragItem::Task("t2".into()));
    session.drag_over(2, DropTarget::column("b"));
    session.drag_end(true).await;

    assert_eq!(store.updates()[1].completion, CompletionChange::Cleared);
    let stored = store.inner.board().await;
    assert!(stored.find_task(&"t2".into()).unwrap().completed_date.is_none());
}

#[tokio::test]
async fn test_drop_on_own_slot_makes_no_call() {
    let store = Arc::new(RecordingStore::new(board()));
    let (mut session, log) = open(store.clone()).await;
    let before = session.board().clone();

    session.drag_start(DragItem::Task("t2".into()));
    session.drag_over(1, DropTarget::column("b"));
    session.drag_over(
        2,
        DropTarget::task("t3").with_hint(PointerHint::new(1.0, 0.0, 10.0)),
    );
    assert!(!session.has_unsaved_changes());
    let outcome = session.drag_end(true).await;

    assert_eq!(outcome, DropOutcome::Unchanged);
    assert!(store.updates().is_empty());
    assert!(log.activity().await.is_empty());
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.board(), &before);
}

#[tokio::test]
async fn test_rejected_write_restores_fetched_board() {
    let store = Arc::new(RecordingStore::rejecting(board()));
    let (mut session, log) = open(store.clone()).await;

    session.drag_start(DragItem::Task("t1".into()));
    session.drag_over(1, DropTarget::column("c"));
    let outcome = session.drag_end(true).await;

    match outcome {
        DropOutcome::RolledBack { reason } => assert!(reason.contains("connection reset")),
        other => panic!("expected rollback, got {other:?}"),
    }
    assert_eq!(store.updates().len(), 1);
    assert_eq!(
        session.board(),
        &store.fetch_board(&"board".into()).await.unwrap()
    );
    assert_eq!(
        session.take_notifications(),
        vec![Notification::error("position update failed")]
    );
    assert!(log.activity().await.is_empty());
}

#[tokio::test]
async fn test_released_outside_with_revert_configured() {
    let store = Arc::new(RecordingStore::new(board()));
    let log = Arc::new(MemoryBoardStore::new(Board::new("activity")));
    let mut session = BoardSession::load(
        store.clone(),
        log,
        "board".into(),
        EngineConfig::default().with_revert_on_cancel(true),
    )
    .await
    .unwrap();
    let before = session.board().clone();

    session.drag_start(DragItem::Task("t1".into()));
    session.drag_over(1, DropTarget::column("b"));
    let outcome = session.drag_end(false).await;

    assert_eq!(outcome, DropOutcome::Unchanged);
    assert_eq!(session.board(), &before);
    assert!(store.updates().is_empty());
}

#[tokio::test]
async fn test_column_reorder_then_add_task() {
    let store = Arc::new(RecordingStore::new(board()));
    let (mut session, log) = open(store.clone()).await;

    session.drag_start(DragItem::Column("c".into()));
    session.drag_over(1, DropTarget::column("a"));
    session.drag_end(true).await;

    let ids: Vec<_> = session
        .board()
        .columns
        .iter()
        .map(|c| c.id.to_string())
        .collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
    assert_eq!(
        store.updates(),
        vec![PositionUpdate::column("c".into(), 0.5)]
    );

    let task = session.add_task(&"b".into(), "fresh").await.unwrap();
    assert_eq!(task.order, 1.0);

    let actions: Vec<_> = log.activity().await.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![ActivityAction::Updated, ActivityAction::Created]);
}

#[tokio::test]
async fn test_unsaved_flag_raised_while_write_is_pending() {
    let store = Arc::new(RecordingStore::gated(board()));
    let (mut session, _log) = open(store.clone()).await;
    let mut unsaved = session.watch_unsaved_changes();
    assert!(!*unsaved.borrow());

    session.drag_start(DragItem::Task("t1".into()));
    session.drag_over(1, DropTarget::column("b"));

    let observer = async {
        unsaved.wait_for(|flag| *flag).await.unwrap();
        assert_eq!(store.updates().len(), 1);
        store.gate.as_ref().unwrap().notify_one();
    };
    let (outcome, ()) = tokio::join!(session.drag_end(true), observer);

    assert!(matches!(outcome, DropOutcome::Persisted(_)));
    assert!(!*unsaved.borrow());
    assert!(!session.has_unsaved_changes());
}

/// C (done): T8(1) T9(2) without dates | E (done): empty
fn undated_done_board() -> Board {
    Board::new("Done")
        .with_id("board")
        .with_column(
            Column::new("C", 1.0)
                .with_id("c")
                .with_status(TaskStatus::Done)
                .with_task(Task::new("T8", 1.0).with_id("t8"))
                .with_task(Task::new("T9", 2.0).with_id("t9")),
        )
        .with_column(
            Column::new("E", 2.0)
                .with_id("e")
                .with_status(TaskStatus::Done),
        )
}

#[tokio::test]
async fn test_reorder_inside_done_column_sets_completed_date() {
    let store = Arc::new(RecordingStore::new(undated_done_board()));
    let (mut session, _log) = open(store.clone()).await;

    session.drag_start(DragItem::Task("t8".into()));
    session.drag_over(1, DropTarget::task("t9"));
    session.drag_end(true).await;

    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].column_id, None);
    assert!(matches!(updates[0].completion, CompletionChange::Set(_)));

    let stored = store.inner.board().await;
    assert!(stored.find_task(&"t8".into()).unwrap().completed_date.is_some());
}

#[tokio::test]
async fn test_move_between_done_columns_sets_completed_date() {
    let store = Arc::new(RecordingStore::new(undated_done_board()));
    let (mut session, _log) = open(store.clone()).await;

    session.drag_start(DragItem::Task("t9".into()));
    session.drag_over(1, DropTarget::column("e"));
    session.drag_end(true).await;

    let stored = store.inner.board().await;
    let task = stored.find_task(&"t9".into()).unwrap();
    assert_eq!(task.column_id.as_str(), "e");
    assert!(task.completed_date.is_some());

    // A dated task keeps its date on the next done-to-done move
    let stamped = task.completed_date;
    session.drag_start(DragItem::Task("t9".into()));
    session.drag_over(2, DropTarget::column("c"));
    session.drag_end(true).await;

    assert_eq!(store.updates()[1].completion, CompletionChange::Unchanged);
    let stored = store.inner.board().await;
    assert_eq!(stored.find_task(&"t9".into()).unwrap().completed_date, stamped);
}
