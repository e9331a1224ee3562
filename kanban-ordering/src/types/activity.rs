//! Activity entries recorded after successful board changes

use super::ids::ActivityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of entity an activity entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Task,
    Column,
}

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
}

/// A log entry recording a change to a task or column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Unique ID for this entry
    pub id: ActivityId,

    /// When the change was made
    pub timestamp: DateTime<Utc>,

    /// The changed task or column
    pub entity_id: String,

    pub entity_type: EntityType,

    pub action: ActivityAction,

    /// Who made the change
    pub actor_id: String,
}

impl ActivityEntry {
    /// Create a new activity entry stamped with the current time
    pub fn new(
        entity_id: impl Into<String>,
        entity_type: EntityType,
        action: ActivityAction,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            timestamp: Utc::now(),
            entity_id: entity_id.into(),
            entity_type,
            action,
            actor_id: actor_id.into(),
        }
    }
}
