use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clusterer::{ClusterAssignment, ClusterConfig, ConfigError};
use crate::reconciler::{cluster_with_saved, ManualOverrides, ReconcileReport};
use crate::session::{RunNumber, RunRecord};
use crate::store::{ClusterStore, SavedClusterState};

#[derive(Error, Debug, PartialEq)]
pub enum EditError {
    #[error("Run {0} is not part of this session's clusters")]
    UnknownRun(RunNumber),

    #[error("No cluster with id {0}")]
    UnknownCluster(String),

    #[error("Cluster label must not be empty")]
    EmptyLabel,
}

/// The clusters a session currently shows, plus the edits behind them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionClusters {
    pub session_id: String,
    pub clusters: ClusterAssignment,
    pub manual_overrides: ManualOverrides,
    pub report: ReconcileReport,
}

impl SessionClusters {
    /// Rebuild a session view straight from a saved snapshot.
    ///
    /// Runs the snapshot recorded as orphaned stay reassignable.
    pub fn from_saved(session_id: impl Into<String>, state: SavedClusterState) -> Self {
        Self {
            session_id: session_id.into(),
            clusters: state.clusters,
            manual_overrides: state.manual_overrides,
            report: ReconcileReport {
                orphaned_runs: state.orphaned_runs,
                ..ReconcileReport::default()
            },
        }
    }

    pub fn to_saved_state(&self) -> SavedClusterState {
        SavedClusterState::now(self.clusters.clone(), self.manual_overrides.clone())
            .with_orphaned_runs(self.report.orphaned_runs.clone())
    }

    /// Move `run` into `target` and remember the move as a manual override.
    ///
    /// Runs left unplaced by an earlier orphaned override can be reassigned
    /// too. A cluster emptied by the move is removed.
    pub fn reassign_run(&mut self, run: RunNumber, target: &str) -> Result<(), EditError> {
        if !self.clusters.contains_id(target) {
            return Err(EditError::UnknownCluster(target.to_string()));
        }

        match self.clusters.cluster_of(run).map(str::to_owned) {
            Some(source) => {
                if let Some(current) = self.clusters.get_mut(&source) {
                    current.remove_run(run);
                }
            }
            None => {
                let pos = self
                    .report
                    .orphaned_runs
                    .iter()
                    .position(|&r| r == run)
                    .ok_or(EditError::UnknownRun(run))?;
                self.report.orphaned_runs.remove(pos);
            }
        }

        if let Some(dest) = self.clusters.get_mut(target) {
            dest.insert_run(run);
        }
        let removed = self.clusters.remove_empty();
        self.manual_overrides.insert(run, target.to_string());

        debug!(session = %self.session_id, run, to = target, ?removed, "reassigned run");
        Ok(())
    }

    /// Give a cluster a custom label that survives re-clustering.
    pub fn rename_cluster(&mut self, cluster_id: &str, label: &str) -> Result<(), EditError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(EditError::EmptyLabel);
        }

        let cluster = self
            .clusters
            .get_mut(cluster_id)
            .ok_or_else(|| EditError::UnknownCluster(cluster_id.to_string()))?;
        cluster.label = label.to_string();

        debug!(session = %self.session_id, cluster = cluster_id, label, "renamed cluster");
        Ok(())
    }

    /// Forget a manual override. Takes effect on the next computation.
    pub fn clear_override(&mut self, run: RunNumber) -> bool {
        self.manual_overrides.remove(&run).is_some()
    }
}

/// Clustering entry point for a UI layer.
///
/// Owns the injected configuration and store. The clustering itself never
/// touches the store; saved state is read before and written after.
pub struct ReidEngine {
    config: ClusterConfig,
    store: Arc<dyn ClusterStore>,
}

impl ReidEngine {
    pub fn new(config: ClusterConfig, store: Arc<dyn ClusterStore>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Change the sensitivity used by later computations.
    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        let config = ClusterConfig {
            threshold,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Saved state for a session, or `None` if there is none or it could not
    /// be read.
    pub fn load_saved(&self, session_id: &str) -> Option<SavedClusterState> {
        match self.store.load(session_id) {
            Ok(state) => state,
            Err(e) => {
                warn!(session = session_id, error = %e, "ignoring unreadable saved cluster state");
                None
            }
        }
    }

    /// Recompute a session's clusters from scratch and fold in saved edits.
    pub fn compute(&self, session_id: &str, runs: &[RunRecord]) -> SessionClusters {
        let saved = self.load_saved(session_id);
        let reconciled = cluster_with_saved(runs, &self.config, saved.as_ref());

        info!(
            session = session_id,
            runs = runs.len(),
            clusters = reconciled.clusters.len(),
            threshold = self.config.threshold,
            "computed session clusters"
        );

        SessionClusters {
            session_id: session_id.to_string(),
            clusters: reconciled.clusters,
            manual_overrides: reconciled.manual_overrides,
            report: reconciled.report,
        }
    }

    /// Write the session's current clusters in the background.
    ///
    /// Failures are logged and otherwise dropped. The handle is only useful to
    /// callers that want to wait for the write.
    pub fn persist(&self, session: &SessionClusters) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let session_id = session.session_id.clone();
        let state = session.to_saved_state();

        thread::spawn(move || match store.save(&session_id, &state) {
            Ok(()) => debug!(session = %session_id, "persisted cluster state"),
            Err(e) => warn!(session = %session_id, error = %e, "failed to persist cluster state"),
        })
    }
}
