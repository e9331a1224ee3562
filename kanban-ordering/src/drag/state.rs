//! Drag session state machine.
//!
//! `BoardState` owns the in-memory board and the active drag session. Every
//! transition goes through [`BoardState::apply`], which consumes the state and
//! returns the next one together with the move to persist, if any. Nothing
//! here performs I/O.

use super::target::{resolve_placement, DragItem, DropTarget, Placement, TargetKey};
use crate::error::{OrderingError, Result};
use crate::order::{self, FIRST_ORDER};
use crate::types::{Board, Column, ColumnId, Task, TaskId, TaskStatus};
use tracing::{debug, trace};

/// Task position captured at drag start
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub order: f64,
    pub column_id: ColumnId,
    pub column_status: TaskStatus,
    /// Index within the owning column
    pub index: usize,
}

/// Column position captured at drag start
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSnapshot {
    pub column_id: ColumnId,
    pub order: f64,
    pub index: usize,
}

/// The active drag session, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(TaskSnapshot),
    DraggingColumn(ColumnSnapshot),
}

impl DragState {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    /// Pointer picked up an item
    Start(DragItem),
    /// Pointer crossed a candidate target. `seq` increases with every
    /// distinct pointer event; replays of an already applied `seq` are
    /// ignored.
    Over { seq: u64, target: DropTarget },
    /// Pointer released; `on_target` is false when released outside any
    /// droppable area
    End { on_target: bool },
}

/// A completed gesture whose final position differs from the snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum PendingMove {
    Task {
        task_id: TaskId,
        order: f64,
        from_column: ColumnId,
        to_column: ColumnId,
        from_status: TaskStatus,
        to_status: TaskStatus,
    },
    Column {
        column_id: ColumnId,
        order: f64,
    },
}

impl PendingMove {
    /// Id of the moved task or column
    pub fn item_id(&self) -> &str {
        match self {
            Self::Task { task_id, .. } => task_id.as_str(),
            Self::Column { column_id, .. } => column_id.as_str(),
        }
    }

    pub fn order(&self) -> f64 {
        match self {
            Self::Task { order, .. } | Self::Column { order, .. } => *order,
        }
    }

    /// True for a task that changed columns
    pub fn crossed_columns(&self) -> bool {
        match self {
            Self::Task {
                from_column,
                to_column,
                ..
            } => from_column != to_column,
            Self::Column { .. } => false,
        }
    }
}

/// Result of applying one event
#[derive(Debug)]
pub struct Transition {
    pub state: BoardState,
    pub pending: Option<PendingMove>,
}

/// The board tree plus the drag session mutating it
#[derive(Debug, Clone)]
pub struct BoardState {
    board: Board,
    drag: DragState,
    last_seq: Option<u64>,
    last_target: Option<TargetKey>,
    revert_on_cancel: bool,
}

impl BoardState {
    /// Wrap a freshly loaded board
    pub fn new(mut board: Board) -> Self {
        board.normalize();
        Self {
            board,
            drag: DragState::Idle,
            last_seq: None,
            last_target: None,
            revert_on_cancel: false,
        }
    }

    /// Restore the drag-start position when a drag is released outside any
    /// target, instead of keeping the last speculative position
    pub fn with_revert_on_cancel(mut self, revert: bool) -> Self {
        self.revert_on_cancel = revert;
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_active()
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    /// Replace the tree with a fresh copy from storage and drop any session
    pub fn reset(&mut self, mut board: Board) {
        board.normalize();
        self.board = board;
        self.drag = DragState::Idle;
        self.last_seq = None;
        self.last_target = None;
    }

    /// Apply one event
    pub fn apply(mut self, event: DragEvent) -> Transition {
        let pending = self.step(event);
        Transition {
            state: self,
            pending,
        }
    }

    /// In-place form of [`apply`](Self::apply)
    pub(crate) fn step(&mut self, event: DragEvent) -> Option<PendingMove> {
        match event {
            DragEvent::Start(item) => {
                self.start(item);
                None
            }
            DragEvent::Over { seq, target } => {
                self.over(seq, target);
                None
            }
            DragEvent::End { on_target } => self.end(on_target),
        }
    }

    fn start(&mut self, item: DragItem) {
        if self.drag.is_active() {
            debug!(?item, "drag already in progress, ignoring start");
            return;
        }

        let session = match &item {
            DragItem::Task(id) => self.snapshot_task(id).map(DragState::Dragging),
            DragItem::Column(id) => self.snapshot_column(id).map(DragState::DraggingColumn),
        };

        match session {
            Some(session) => {
                debug!(?item, "drag started");
                self.drag = session;
                self.last_seq = None;
                self.last_target = None;
            }
            None => debug!(?item, "drag start on unknown item ignored"),
        }
    }

    fn snapshot_task(&self, id: &TaskId) -> Option<TaskSnapshot> {
        let column = &self.board.columns[self.board.column_index_of_task(id)?];
        let index = column.position_of(id)?;
        Some(TaskSnapshot {
            task_id: id.clone(),
            order: column.tasks[index].order,
            column_id: column.id.clone(),
            column_status: column.task_status,
            index,
        })
    }

    fn snapshot_column(&self, id: &ColumnId) -> Option<ColumnSnapshot> {
        let index = self.board.column_index(id)?;
        Some(ColumnSnapshot {
            column_id: id.clone(),
            order: self.board.columns[index].order,
            index,
        })
    }

    fn over(&mut self, seq: u64, target: DropTarget) {
        if self.last_seq.is_some_and(|last| seq <= last) {
            trace!(seq, "drag-over already applied");
            return;
        }

        let key = target.key();
        if self.last_target.as_ref() == Some(&key) {
            trace!(seq, "drag-over on unchanged target");
            self.last_seq = Some(seq);
            return;
        }

        let result = match &self.drag {
            DragState::Idle => {
                trace!(seq, "drag-over without an active drag");
                return;
            }
            DragState::Dragging(snapshot) => {
                let id = snapshot.task_id.clone();
                move_task(&mut self.board, &id, &target)
            }
            DragState::DraggingColumn(snapshot) => {
                let id = snapshot.column_id.clone();
                move_column(&mut self.board, &id, &target)
            }
        };

        self.last_seq = Some(seq);
        match result {
            Ok(()) => self.last_target = Some(key),
            Err(err) => debug!(%err, "drag-over ignored"),
        }
    }

    fn end(&mut self, on_target: bool) -> Option<PendingMove> {
        let session = std::mem::take(&mut self.drag);
        self.last_seq = None;
        self.last_target = None;

        match session {
            DragState::Idle => None,
            DragState::Dragging(snapshot) => self.finish_task(snapshot, on_target),
            DragState::DraggingColumn(snapshot) => self.finish_column(snapshot, on_target),
        }
    }

    fn finish_task(&mut self, snapshot: TaskSnapshot, on_target: bool) -> Option<PendingMove> {
        if !on_target && self.revert_on_cancel {
            debug!(task = %snapshot.task_id, "drag cancelled, restoring start position");
            restore_task(&mut self.board, &snapshot);
            return None;
        }

        let column_index = self.board.column_index_of_task(&snapshot.task_id)?;
        let column = &mut self.board.columns[column_index];
        let index = column.position_of(&snapshot.task_id)?;

        if column.id == snapshot.column_id && index == snapshot.index {
            // Same neighbors as before the drag: keep the stored order
            column.tasks[index].order = snapshot.order;
            order::sort_by_order(&mut column.tasks);
            debug!(task = %snapshot.task_id, "task dropped on its original slot");
            return None;
        }

        Some(PendingMove::Task {
            order: column.tasks[index].order,
            task_id: snapshot.task_id,
            from_column: snapshot.column_id,
            to_column: column.id.clone(),
            from_status: snapshot.column_status,
            to_status: column.task_status,
        })
    }

    fn finish_column(&mut self, snapshot: ColumnSnapshot, on_target: bool) -> Option<PendingMove> {
        let index = self.board.column_index(&snapshot.column_id)?;

        let unmoved = index == snapshot.index;
        if unmoved || (!on_target && self.revert_on_cancel) {
            if let Some(column) = self.board.find_column_mut(&snapshot.column_id) {
                column.order = snapshot.order;
            }
            order::sort_by_order(&mut self.board.columns);
            debug!(column = %snapshot.column_id, "column kept its original slot");
            return None;
        }

        Some(PendingMove::Column {
            order: self.board.columns[index].order,
            column_id: snapshot.column_id,
        })
    }
}

/// Speculatively move a task onto `target`
fn move_task(board: &mut Board, task_id: &TaskId, target: &DropTarget) -> Result<()> {
    let source = board
        .column_index_of_task(task_id)
        .ok_or_else(|| OrderingError::invalid_move(format!("task {task_id} is not on the board")))?;

    let (dest, over) = match target {
        DropTarget::Column { id, .. } => {
            let dest = board
                .column_index(id)
                .ok_or_else(|| OrderingError::invalid_move(format!("unknown column {id}")))?;
            (dest, None)
        }
        DropTarget::Task { id, hint } => {
            if id == task_id {
                return Ok(());
            }
            let dest = board
                .column_index_of_task(id)
                .ok_or_else(|| OrderingError::invalid_move(format!("unknown task {id}")))?;
            (dest, Some((id, *hint)))
        }
    };

    let dragged_order = board.columns[source]
        .find_task(task_id)
        .map(|t| t.order)
        .ok_or_else(|| OrderingError::invalid_move(format!("task {task_id} is not on the board")))?;

    let siblings: Vec<&Task> = board.columns[dest]
        .tasks
        .iter()
        .filter(|t| &t.id != task_id)
        .collect();

    let new_order = match over {
        _ if siblings.is_empty() => FIRST_ORDER,
        None => order::tail_order(&siblings),
        Some((over_id, hint)) => {
            let over_index = siblings
                .iter()
                .position(|t| &t.id == over_id)
                .ok_or_else(|| OrderingError::invalid_move(format!("unknown task {over_id}")))?;
            let placement = resolve_placement(
                hint,
                source == dest,
                dragged_order,
                siblings[over_index].order,
            );
            let index = match placement {
                Placement::BeforeTarget => over_index,
                Placement::AfterTarget => over_index + 1,
            };
            order::order_at(&siblings, index)
        }
    };

    let position = board.columns[source]
        .position_of(task_id)
        .ok_or_else(|| OrderingError::invalid_move(format!("task {task_id} is not on the board")))?;
    let mut task = board.columns[source].tasks.remove(position);

    let dest_column = &mut board.columns[dest];
    trace!(task = %task_id, column = %dest_column.id, order = new_order, "task moved");
    task.order = new_order;
    task.column_id = dest_column.id.clone();
    dest_column.tasks.push(task);
    order::sort_by_order(&mut dest_column.tasks);
    Ok(())
}

/// Speculatively move a column onto `target`. Hovering a task counts as
/// hovering the task's column.
fn move_column(board: &mut Board, column_id: &ColumnId, target: &DropTarget) -> Result<()> {
    let dragged_order = board
        .find_column(column_id)
        .map(|c| c.order)
        .ok_or_else(|| OrderingError::invalid_move(format!("column {column_id} is not on the board")))?;

    let (over_id, hint) = match target {
        DropTarget::Column { id, hint } => (id.clone(), *hint),
        DropTarget::Task { id, .. } => {
            let index = board
                .column_index_of_task(id)
                .ok_or_else(|| OrderingError::invalid_move(format!("unknown task {id}")))?;
            (board.columns[index].id.clone(), None)
        }
    };

    if &over_id == column_id {
        return Ok(());
    }

    let siblings: Vec<&Column> = board
        .columns
        .iter()
        .filter(|c| &c.id != column_id)
        .collect();
    let over_index = siblings
        .iter()
        .position(|c| c.id == over_id)
        .ok_or_else(|| OrderingError::invalid_move(format!("unknown column {over_id}")))?;
    let placement = resolve_placement(hint, true, dragged_order, siblings[over_index].order);
    let index = match placement {
        Placement::BeforeTarget => over_index,
        Placement::AfterTarget => over_index + 1,
    };
    let new_order = order::order_at(&siblings, index);

    if let Some(column) = board.find_column_mut(column_id) {
        trace!(column = %column_id, order = new_order, "column moved");
        column.order = new_order;
    }
    order::sort_by_order(&mut board.columns);
    Ok(())
}

/// Put a task back where its snapshot says it was
fn restore_task(board: &mut Board, snapshot: &TaskSnapshot) {
    let Some(source) = board.column_index_of_task(&snapshot.task_id) else {
        return;
    };
    let Some(dest) = board.column_index(&snapshot.column_id) else {
        return;
    };
    let Some(position) = board.columns[source].position_of(&snapshot.task_id) else {
        return;
    };

    let mut task = board.columns[source].tasks.remove(position);
    task.order = snapshot.order;
    task.column_id = snapshot.column_id.clone();
    board.columns[dest].tasks.push(task);
    order::sort_by_order(&mut board.columns[dest].tasks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::PointerHint;

    /// Column A: T1(1), T2(2); column B empty; column C done with T9(1)
    fn board() -> Board {
        Board::new("Test")
            .with_id("board")
            .with_column(
                Column::new("A", 1.0)
                    .with_id("a")
                    .with_task(Task::new("T1", 1.0).with_id("t1"))
                    .with_task(Task::new("T2", 2.0).with_id("t2")),
            )
            .with_column(Column::new("B", 2.0).with_id("b"))
            .with_column(
                Column::new("C", 3.0)
                    .with_id("c")
                    .with_status(TaskStatus::Done)
                    .with_task(Task::new("T9", 1.0).with_id("t9")),
            )
    }

    fn run(state: BoardState, events: Vec<DragEvent>) -> (BoardState, Option<PendingMove>) {
        let mut state = state;
        let mut pending = None;
        for event in events {
            let transition = state.apply(event);
            state = transition.state;
            pending = transition.pending;
        }
        (state, pending)
    }

    fn start_task(id: &str) -> DragEvent {
        DragEvent::Start(DragItem::Task(TaskId::from_string(id)))
    }

    fn over(seq: u64, target: DropTarget) -> DragEvent {
        DragEvent::Over { seq, target }
    }

    fn end() -> DragEvent {
        DragEvent::End { on_target: true }
    }

    fn task_ids(state: &BoardState, column: &str) -> Vec<String> {
        state
            .board()
            .find_column(&ColumnId::from_string(column))
            .unwrap()
            .tasks
            .iter()
            .map(|t| t.id.to_string())
            .collect()
    }

    fn order_of(state: &BoardState, task: &str) -> f64 {
        state
            .board()
            .find_task(&TaskId::from_string(task))
            .unwrap()
            .order
    }

    #[test]
    fn test_start_captures_snapshot_without_mutation() {
        let initial = board();
        let (state, pending) = run(BoardState::new(initial.clone()), vec![start_task("t1")]);
        assert!(pending.is_none());
        assert_eq!(state.board(), &initial);
        match state.drag() {
            DragState::Dragging(snapshot) => {
                assert_eq!(snapshot.order, 1.0);
                assert_eq!(snapshot.column_id.as_str(), "a");
                assert_eq!(snapshot.index, 0);
            }
            other => panic!("expected task drag, got {other:?}"),
        }
    }

    #[test]
    fn test_start_on_unknown_item_stays_idle() {
        let (state, _) = run(BoardState::new(board()), vec![start_task("ghost")]);
        assert!(!state.is_dragging());
    }

    #[test]
    fn test_second_start_is_ignored() {
        let (state, _) = run(
            BoardState::new(board()),
            vec![
                start_task("t1"),
                DragEvent::Start(DragItem::Column(ColumnId::from_string("b"))),
            ],
        );
        assert!(matches!(state.drag(), DragState::Dragging(_)));
    }

    #[test]
    fn test_drag_after_sibling_in_same_column() {
        let (state, pending) = run(
            BoardState::new(board()),
            vec![start_task("t1"), over(1, DropTarget::task("t2")), end()],
        );
        assert_eq!(order_of(&state, "t1"), 3.0);
        assert_eq!(task_ids(&state, "a"), vec!["t2", "t1"]);
        assert_eq!(
            pending,
            Some(PendingMove::Task {
                task_id: "t1".into(),
                order: 3.0,
                from_column: "a".into(),
                to_column: "a".into(),
                from_status: TaskStatus::None,
                to_status: TaskStatus::None,
            })
        );
    }

    #[test]
    fn test_drag_into_empty_column_gets_first_order() {
        let (state, pending) = run(
            BoardState::new(board()),
            vec![start_task("t2"), over(1, DropTarget::column("b")), end()],
        );
        let task = state.board().find_task(&"t2".into()).unwrap();
        assert_eq!(task.order, 1.0);
        assert_eq!(task.column_id.as_str(), "b");
        assert!(pending.unwrap().crossed_columns());
    }

    #[test]
    fn test_drag_between_siblings_uses_midpoint() {
        let initial = board();
        let a = initial.columns[0]
            .clone()
            .with_task(Task::new("T4", 3.0).with_id("t4"));
        let initial = Board {
            columns: vec![a, initial.columns[1].clone()],
            ..initial
        };

        let (state, _) = run(
            BoardState::new(initial),
            vec![start_task("t4"), over(1, DropTarget::task("t2")), end()],
        );
        assert_eq!(order_of(&state, "t4"), 1.5);
        assert_eq!(task_ids(&state, "a"), vec!["t1", "t4", "t2"]);
    }

    #[test]
    fn test_pointer_geometry_overrides_order_fallback() {
        let target = DropTarget::task("t2").with_hint(PointerHint::new(1.0, 0.0, 10.0));
        let (state, pending) = run(
            BoardState::new(board()),
            vec![start_task("t1"), over(1, target), end()],
        );
        // Upper half of T2 is T1's own slot
        assert_eq!(task_ids(&state, "a"), vec!["t1", "t2"]);
        assert!(pending.is_none());
    }

    #[test]
    fn test_cross_column_onto_task_without_geometry_goes_before() {
        let (state, _) = run(
            BoardState::new(board()),
            vec![start_task("t1"), over(1, DropTarget::task("t9")), end()],
        );
        assert_eq!(task_ids(&state, "c"), vec!["t1", "t9"]);
        assert_eq!(order_of(&state, "t1"), 0.5);
    }

    #[test]
    fn test_column_surface_appends_at_tail() {
        let (state, _) = run(
            BoardState::new(board()),
            vec![start_task("t1"), over(1, DropTarget::column("c")), end()],
        );
        assert_eq!(task_ids(&state, "c"), vec!["t9", "t1"]);
        assert_eq!(order_of(&state, "t1"), 2.0);
    }

    #[test]
    fn test_hovering_self_is_noop() {
        let (state, pending) = run(
            BoardState::new(board()),
            vec![start_task("t1"), over(1, DropTarget::task("t1")), end()],
        );
        assert_eq!(order_of(&state, "t1"), 1.0);
        assert!(pending.is_none());
    }

    #[test]
    fn test_replayed_sequence_is_ignored() {
        let (state, _) = run(
            BoardState::new(board()),
            vec![
                start_task("t1"),
                over(2, DropTarget::column("b")),
                over(2, DropTarget::column("c")),
                over(1, DropTarget::column("c")),
            ],
        );
        assert_eq!(
            state.board().find_task(&"t1".into()).unwrap().column_id.as_str(),
            "b"
        );
    }

    #[test]
    fn test_same_target_applies_once() {
        let (state, _) = run(
            BoardState::new(board()),
            vec![
                start_task("t1"),
                over(1, DropTarget::task("t2")),
                over(2, DropTarget::task("t2")),
                over(3, DropTarget::task("t2")),
            ],
        );
        assert_eq!(order_of(&state, "t1"), 3.0);
    }

    #[test]
    fn test_stale_target_leaves_tree_unchanged() {
        let initial = board();
        let (state, _) = run(
            BoardState::new(initial.clone()),
            vec![start_task("t1"), over(1, DropTarget::task("gone"))],
        );
        assert_eq!(state.board(), &initial);
        assert!(state.is_dragging());
    }

    #[test]
    fn test_return_to_original_slot_produces_no_move() {
        let (state, pending) = run(
            BoardState::new(board()),
            vec![
                start_task("t1"),
                over(1, DropTarget::column("b")),
                over(2, DropTarget::task("t2").with_hint(PointerHint::new(0.0, 0.0, 10.0))),
                end(),
            ],
        );
        assert!(pending.is_none());
        assert_eq!(order_of(&state, "t1"), 1.0);
        assert_eq!(task_ids(&state, "a"), vec!["t1", "t2"]);
        assert!(!state.is_dragging());
    }

    #[test]
    fn test_release_outside_keeps_speculative_position() {
        let (state, pending) = run(
            BoardState::new(board()),
            vec![
                start_task("t1"),
                over(1, DropTarget::column("b")),
                DragEvent::End { on_target: false },
            ],
        );
        assert_eq!(task_ids(&state, "b"), vec!["t1"]);
        assert!(pending.is_some());
    }

    #[test]
    fn test_release_outside_with_revert_restores_snapshot() {
        let (state, pending) = run(
            BoardState::new(board()).with_revert_on_cancel(true),
            vec![
                start_task("t1"),
                over(1, DropTarget::column("b")),
                DragEvent::End { on_target: false },
            ],
        );
        assert!(pending.is_none());
        assert_eq!(task_ids(&state, "a"), vec!["t1", "t2"]);
        assert_eq!(order_of(&state, "t1"), 1.0);
    }

    #[test]
    fn test_column_drag_reorders_columns() {
        let (state, pending) = run(
            BoardState::new(board()),
            vec![
                DragEvent::Start(DragItem::Column("a".into())),
                over(1, DropTarget::column("c")),
                end(),
            ],
        );
        let ids: Vec<_> = state.board().columns.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(
            pending,
            Some(PendingMove::Column {
                column_id: "a".into(),
                order: 4.0
            })
        );
    }

    #[test]
    fn test_column_drag_over_task_resolves_to_its_column() {
        let (state, _) = run(
            BoardState::new(board()),
            vec![
                DragEvent::Start(DragItem::Column("c".into())),
                over(1, DropTarget::task("t1")),
                end(),
            ],
        );
        let ids: Vec<_> = state.board().columns.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(state.board().columns[0].order, 0.5);
    }

    #[test]
    fn test_column_drag_never_moves_tasks() {
        let (state, _) = run(
            BoardState::new(board()),
            vec![
                DragEvent::Start(DragItem::Column("a".into())),
                over(1, DropTarget::column("b")),
                end(),
            ],
        );
        assert_eq!(task_ids(&state, "a"), vec!["t1", "t2"]);
    }

    #[test]
    fn test_column_dropped_back_keeps_order() {
        let (state, pending) = run(
            BoardState::new(board()),
            vec![
                DragEvent::Start(DragItem::Column("a".into())),
                over(1, DropTarget::column("a")),
                end(),
            ],
        );
        assert!(pending.is_none());
        assert_eq!(state.board().columns[0].order, 1.0);
    }

    #[test]
    fn test_reset_clears_session() {
        let (mut state, _) = run(BoardState::new(board()), vec![start_task("t1")]);
        state.reset(board());
        assert!(!state.is_dragging());
    }
}
