//! Error types for the ordering engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ordering operations
pub type Result<T> = std::result::Result<T, OrderingError>;

/// Errors that can occur in the ordering engine and its stores
#[derive(Debug, Error)]
pub enum OrderingError {
    /// Board not initialized at the given path
    #[error("board not initialized at {path}")]
    NotInitialized { path: PathBuf },

    /// Board already exists
    #[error("board already exists at {path}")]
    AlreadyExists { path: PathBuf },

    /// Board not found
    #[error("board not found: {id}")]
    BoardNotFound { id: String },

    /// Task not found
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// Column not found
    #[error("column not found: {id}")]
    ColumnNotFound { id: String },

    /// Tag not found
    #[error("tag not found: {id}")]
    TagNotFound { id: String },

    /// Id that cannot be used as a file name
    #[error("invalid id: {id:?}")]
    InvalidId { id: String },

    /// Source or destination of a move could not be resolved
    #[error("invalid move: {reason}")]
    InvalidMove { reason: String },

    /// A drag session is active and owns the board tree
    #[error("a drag session is in progress")]
    DragInProgress,

    /// Column has tasks and cannot be deleted
    #[error("column '{id}' has {count} tasks and cannot be deleted")]
    ColumnNotEmpty { id: String, count: usize },

    /// The persistence collaborator rejected a write
    #[error("persistence failed: {message}")]
    Persistence { message: String },

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Lock is held by another process
    #[error("lock busy - another operation in progress")]
    LockBusy,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl OrderingError {
    /// Create an invalid move error
    pub fn invalid_move(reason: impl Into<String>) -> Self {
        Self::InvalidMove {
            reason: reason.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Check if this is a retryable error
    ///
    /// Persistence failures are never retried; the session reloads instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockBusy)
    }
}

impl From<figment::Error> for OrderingError {
    fn from(err: figment::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrderingError::TaskNotFound {
            id: "abc123".into(),
        };
        assert_eq!(err.to_string(), "task not found: abc123");
    }

    #[test]
    fn test_invalid_move() {
        let err = OrderingError::invalid_move("stale column");
        assert!(err.to_string().contains("stale column"));
    }

    #[test]
    fn test_retryable() {
        assert!(OrderingError::LockBusy.is_retryable());
        assert!(!OrderingError::persistence("db down").is_retryable());
    }
}
