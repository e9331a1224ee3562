//! Engine configuration loaded with figment.
//!
//! Precedence, lowest first: built-in defaults, `ordering.toml` and
//! `ordering.yaml` in the board directory, then `KANBAN_ORDERING_*`
//! environment variables.

use crate::error::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Prefix for environment overrides, e.g. `KANBAN_ORDERING_ACTOR_ID`
pub const ENV_PREFIX: &str = "KANBAN_ORDERING_";

const TOML_FILE: &str = "ordering.toml";
const YAML_FILE: &str = "ordering.yaml";

/// Settings for a board session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Actor recorded in activity entries
    pub actor_id: String,
    /// Notification text shown when a move could not be saved
    pub failure_message: String,
    /// Restore the drag-start position when released outside any target
    pub revert_on_cancel: bool,
    /// Record activity entries after successful changes
    pub record_activity: bool,
    /// Neighbor gap below which a precision warning is logged
    pub min_order_gap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actor_id: "local".to_string(),
            failure_message: "position update failed".to_string(),
            revert_on_cancel: false,
            record_activity: true,
            min_order_gap: 1e-9,
        }
    }
}

impl EngineConfig {
    /// Load configuration for the board stored in `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        debug!(dir = %dir.display(), "loading ordering configuration");

        let config = Self::figment(dir).extract()?;
        Ok(config)
    }

    fn figment(dir: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join(TOML_FILE)))
            .merge(Yaml::file(dir.join(YAML_FILE)))
            .merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    pub fn with_revert_on_cancel(mut self, revert: bool) -> Self {
        self.revert_on_cancel = revert;
        self
    }
}
