mod error;
mod json;
mod key;
mod memory;
mod sqlite;


pub use error::StoreError;
pub use json::JsonDirStore;
pub use key::SessionKey;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clusterer::ClusterAssignment;
use crate::reconciler::ManualOverrides;
use crate::session::RunNumber;

/// Snapshot persisted per session so labels and overrides survive re-clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedClusterState {
    pub clusters: ClusterAssignment,
    #[serde(default)]
    pub manual_overrides: ManualOverrides,
    pub updated_at: DateTime<Utc>,
    /// Runs left out of every cluster by the last computation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphaned_runs: Vec<RunNumber>,
}

impl SavedClusterState {
    /// Stamp a snapshot with the current time.
    pub fn now(clusters: ClusterAssignment, manual_overrides: ManualOverrides) -> Self {
        Self {
            clusters,
            manual_overrides,
            updated_at: Utc::now(),
            orphaned_runs: Vec::new(),
        }
    }

    pub fn with_orphaned_runs(mut self, orphaned_runs: Vec<RunNumber>) -> Self {
        self.orphaned_runs = orphaned_runs;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Load/save boundary for clustering state, keyed by session id.
///
/// Implementations report failures; callers at the engine boundary decide to
/// absorb them.
pub trait ClusterStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved for the session yet.
    fn load(&self, session_id: &str) -> Result<Option<SavedClusterState>, StoreError>;

    fn save(&self, session_id: &str, state: &SavedClusterState) -> Result<(), StoreError>;
}
