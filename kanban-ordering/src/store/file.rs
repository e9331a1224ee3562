//! File-backed board store
//!
//! One directory holds one board. Every column and task is its own YAML file
//! so concurrent edits to different items never touch the same file; activity
//! is appended to a JSONL log.
//!
//! ```text
//! .kanban/
//! ├── board.yaml              # Board metadata and tag palette
//! ├── columns/{id}.yaml       # Column record
//! ├── tasks/{id}.yaml         # Task record, including its column id
//! ├── activity/current.jsonl  # Activity entries, oldest first
//! └── .lock                   # Writer lock
//! ```

use super::{ActivityLog, BoardStore, ItemRef, PositionUpdate};
use crate::error::{OrderingError, Result};
use crate::types::{
    ActivityEntry, Board, BoardId, BoardView, Column, ColumnId, Tag, Task, TaskId, TaskStatus,
};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const STORE_DIR: &str = ".kanban";

/// Board metadata as stored in `board.yaml`
#[derive(Debug, Serialize, Deserialize)]
struct BoardRecord {
    id: BoardId,
    name: String,
    #[serde(default)]
    default_view: BoardView,
    #[serde(default)]
    tags: Vec<Tag>,
}

/// A column without its tasks
#[derive(Debug, Serialize, Deserialize)]
struct ColumnRecord {
    id: ColumnId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    task_status: TaskStatus,
    order: f64,
}

impl From<&Column> for ColumnRecord {
    fn from(column: &Column) -> Self {
        Self {
            id: column.id.clone(),
            name: column.name.clone(),
            description: column.description.clone(),
            task_status: column.task_status,
            order: column.order,
        }
    }
}

impl From<ColumnRecord> for Column {
    fn from(record: ColumnRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            task_status: record.task_status,
            order: record.order,
            tasks: Vec::new(),
        }
    }
}

/// Store rooted at a `.kanban` directory
#[derive(Debug, Clone)]
pub struct FileBoardStore {
    root: PathBuf,
}

impl FileBoardStore {
    /// Create a store for the given `.kanban` directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the `.kanban` directory by walking up from a starting path
    pub fn find(start: impl AsRef<Path>) -> Result<Self> {
        let mut current = start.as_ref().to_path_buf();

        loop {
            let candidate = current.join(STORE_DIR);
            if candidate.is_dir() {
                return Ok(Self::new(candidate));
            }

            if !current.pop() {
                return Err(OrderingError::NotInitialized {
                    path: start.as_ref().to_path_buf(),
                });
            }
        }
    }

    // =========================================================================
    // Path helpers
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn board_path(&self) -> PathBuf {
        self.root.join("board.yaml")
    }

    pub fn columns_dir(&self) -> PathBuf {
        self.root.join("columns")
    }

    pub fn column_path(&self, id: &ColumnId) -> Result<PathBuf> {
        entity_file(self.columns_dir(), id.as_str())
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    pub fn task_path(&self, id: &TaskId) -> Result<PathBuf> {
        entity_file(self.tasks_dir(), id.as_str())
    }

    pub fn activity_dir(&self) -> PathBuf {
        self.root.join("activity")
    }

    pub fn activity_path(&self) -> PathBuf {
        self.activity_dir().join("current.jsonl")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    pub fn is_initialized(&self) -> bool {
        self.board_path().exists()
    }

    /// Create the directory structure. Idempotent.
    pub async fn create_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(self.columns_dir()).await?;
        fs::create_dir_all(self.tasks_dir()).await?;
        fs::create_dir_all(self.activity_dir()).await?;
        Ok(())
    }

    /// Write a complete board tree into an empty store.
    ///
    /// A board without columns is seeded with [`Board::default_columns`].
    pub async fn init(&self, board: &Board) -> Result<()> {
        if self.is_initialized() {
            return Err(OrderingError::AlreadyExists {
                path: self.root.clone(),
            });
        }

        let defaults;
        let columns = if board.columns.is_empty() {
            defaults = Board::default_columns();
            &defaults
        } else {
            &board.columns
        };

        self.create_directories().await?;
        for column in columns {
            self.write_column(&ColumnRecord::from(column)).await?;
            for task in &column.tasks {
                let mut task = task.clone();
                task.column_id = column.id.clone();
                self.write_task(&task).await?;
            }
        }
        self.write_board(&BoardRecord {
            id: board.id.clone(),
            name: board.name.clone(),
            default_view: board.default_view,
            tags: board.tags.clone(),
        })
        .await?;

        debug!(root = %self.root.display(), board = %board.id, "initialized board store");
        Ok(())
    }

    // =========================================================================
    // Record I/O
    // =========================================================================

    async fn read_board_record(&self) -> Result<BoardRecord> {
        let path = self.board_path();
        if !path.exists() {
            return Err(OrderingError::NotInitialized {
                path: self.root.clone(),
            });
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_yaml_ng::from_str(&content)?)
    }

    /// Id of the board held by this store
    pub async fn board_id(&self) -> Result<BoardId> {
        Ok(self.read_board_record().await?.id)
    }

    async fn write_board(&self, record: &BoardRecord) -> Result<()> {
        let content = serde_yaml_ng::to_string(record)?;
        atomic_write(&self.board_path(), content.as_bytes()).await
    }

    async fn read_column(&self, id: &ColumnId) -> Result<ColumnRecord> {
        let path = self.column_path(id)?;
        if !path.exists() {
            return Err(OrderingError::ColumnNotFound { id: id.to_string() });
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_yaml_ng::from_str(&content)?)
    }

    async fn write_column(&self, record: &ColumnRecord) -> Result<()> {
        let content = serde_yaml_ng::to_string(record)?;
        atomic_write(&self.column_path(&record.id)?, content.as_bytes()).await
    }

    /// Read a task file
    pub async fn read_task(&self, id: &TaskId) -> Result<Task> {
        let path = self.task_path(id)?;
        if !path.exists() {
            return Err(OrderingError::TaskNotFound { id: id.to_string() });
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_yaml_ng::from_str(&content)?)
    }

    async fn write_task(&self, task: &Task) -> Result<()> {
        let content = serde_yaml_ng::to_string(task)?;
        atomic_write(&self.task_path(&task.id)?, content.as_bytes()).await
    }

    /// File stems of all `.yaml` files in a directory
    async fn list_ids(dir: &Path) -> Result<Vec<String>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("yaml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        Ok(ids)
    }

    async fn read_all_columns(&self) -> Result<Vec<ColumnRecord>> {
        let mut columns = Vec::new();
        for id in Self::list_ids(&self.columns_dir()).await? {
            columns.push(self.read_column(&ColumnId::from_string(id)).await?);
        }
        Ok(columns)
    }

    /// Read all tasks
    pub async fn read_all_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for id in Self::list_ids(&self.tasks_dir()).await? {
            tasks.push(self.read_task(&TaskId::from_string(id)).await?);
        }
        Ok(tasks)
    }

    // =========================================================================
    // Activity
    // =========================================================================

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        fs::create_dir_all(self.activity_dir()).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.activity_path())
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read activity entries, newest first
    pub async fn read_activity(&self, limit: Option<usize>) -> Result<Vec<ActivityEntry>> {
        let path = self.activity_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut entries: Vec<ActivityEntry> = content
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        entries.reverse();

        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Try to acquire the exclusive writer lock (non-blocking)
    pub async fn lock(&self) -> Result<StoreLock> {
        fs::create_dir_all(&self.root).await?;

        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.lock_path())?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(StoreLock { file }),
            Err(_) => Err(OrderingError::LockBusy),
        }
    }
}

#[async_trait]
impl BoardStore for FileBoardStore {
    async fn fetch_board(&self, board_id: &BoardId) -> Result<Board> {
        let record = self.read_board_record().await?;
        if &record.id != board_id {
            return Err(OrderingError::BoardNotFound {
                id: board_id.to_string(),
            });
        }

        let mut columns: Vec<Column> = self
            .read_all_columns()
            .await?
            .into_iter()
            .map(Column::from)
            .collect();

        for task in self.read_all_tasks().await? {
            match columns.iter_mut().find(|c| c.id == task.column_id) {
                Some(column) => column.tasks.push(task),
                None => warn!(task = %task.id, column = %task.column_id, "task references a missing column"),
            }
        }

        let mut board = Board {
            id: record.id,
            name: record.name,
            default_view: record.default_view,
            tags: record.tags,
            columns,
        };
        board.normalize();
        Ok(board)
    }

    async fn update_item_position(&self, update: &PositionUpdate) -> Result<()> {
        let _lock = self.lock().await?;

        match &update.item {
            ItemRef::Column(id) => {
                let mut record = self.read_column(id).await?;
                record.order = update.order;
                self.write_column(&record).await?;
            }
            ItemRef::Task(id) => {
                let mut task = self.read_task(id).await?;
                if let Some(column_id) = &update.column_id {
                    if !self.column_path(column_id)?.exists() {
                        return Err(OrderingError::ColumnNotFound {
                            id: column_id.to_string(),
                        });
                    }
                    task.column_id = column_id.clone();
                }
                task.order = update.order;
                update.completion.apply(&mut task.completed_date);
                self.write_task(&task).await?;
            }
        }

        debug!(item = ?update.item, order = update.order, "position stored");
        Ok(())
    }

    async fn create_task(&self, task: &Task) -> Result<()> {
        let _lock = self.lock().await?;
        if !self.column_path(&task.column_id)?.exists() {
            return Err(OrderingError::ColumnNotFound {
                id: task.column_id.to_string(),
            });
        }
        if self.task_path(&task.id)?.exists() {
            return Err(OrderingError::persistence(format!(
                "task {} already exists",
                task.id
            )));
        }
        self.write_task(task).await
    }

    async fn create_column(&self, column: &Column) -> Result<()> {
        let _lock = self.lock().await?;
        if self.column_path(&column.id)?.exists() {
            return Err(OrderingError::persistence(format!(
                "column {} already exists",
                column.id
            )));
        }
        self.write_column(&ColumnRecord::from(column)).await
    }

    async fn update_task_fields(&self, task: &Task) -> Result<()> {
        let _lock = self.lock().await?;
        let mut stored = self.read_task(&task.id).await?;
        stored.name = task.name.clone();
        stored.description = task.description.clone();
        stored.due_date = task.due_date;
        stored.completed_date = task.completed_date;
        stored.tags = task.tags.clone();
        self.write_task(&stored).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        let _lock = self.lock().await?;
        let path = self.task_path(id)?;
        if !path.exists() {
            return Err(OrderingError::TaskNotFound { id: id.to_string() });
        }
        fs::remove_file(&path).await?;
        Ok(())
    }

    async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        let _lock = self.lock().await?;
        let path = self.column_path(id)?;
        if !path.exists() {
            return Err(OrderingError::ColumnNotFound { id: id.to_string() });
        }

        let count = self
            .read_all_tasks()
            .await?
            .iter()
            .filter(|t| &t.column_id == id)
            .count();
        if count > 0 {
            return Err(OrderingError::ColumnNotEmpty {
                id: id.to_string(),
                count,
            });
        }

        fs::remove_file(&path).await?;
        Ok(())
    }
}

#[async_trait]
impl ActivityLog for FileBoardStore {
    async fn record_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.append_activity(entry).await
    }
}

/// RAII lock guard - releases on drop
pub struct StoreLock {
    file: std::fs::File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// `{dir}/{id}.yaml`, refusing ids that would resolve outside `dir`
fn entity_file(dir: PathBuf, id: &str) -> Result<PathBuf> {
    let escapes =
        id.is_empty() || id == "." || id == ".." || id.contains(|c: char| c == '/' || c == '\\');
    if escapes {
        return Err(OrderingError::InvalidId { id: id.to_string() });
    }
    Ok(dir.join(format!("{id}.yaml")))
}

/// Atomic write via temp file and rename
async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}
