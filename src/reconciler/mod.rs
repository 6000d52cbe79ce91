mod labels;
mod overrides;

#[cfg(test)]
mod tests;

pub use labels::{is_default_label, preserve_labels};
pub use overrides::{apply_overrides, remap_override_targets, unplace_runs, ManualOverrides};

use serde::Serialize;
use tracing::info;

use crate::clusterer::{cluster, ClusterAssignment, ClusterConfig};
use crate::session::{RunNumber, RunRecord};
use crate::store::SavedClusterState;

/// What reconciliation changed on top of the algorithmic partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Runs whose override target no longer exists; shown in no cluster.
    /// Their overrides are dropped.
    pub orphaned_runs: Vec<RunNumber>,
    /// Fresh cluster ids that inherited a custom label.
    pub relabelled: Vec<String>,
}

/// A fresh partition with saved edits folded back in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reconciled {
    pub clusters: ClusterAssignment,
    /// Overrides re-keyed to this partition's cluster ids.
    pub manual_overrides: ManualOverrides,
    pub report: ReconcileReport,
}

/// Fold a saved state into a freshly computed partition.
///
/// Override targets are remapped onto the new ids, overrides are applied,
/// then custom labels are carried forward. An override whose target has
/// disappeared leaves its run unplaced for this computation and is dropped.
pub fn reconcile(mut fresh: ClusterAssignment, saved: Option<&SavedClusterState>) -> Reconciled {
    let Some(saved) = saved else {
        return Reconciled {
            clusters: fresh,
            ..Reconciled::default()
        };
    };

    let mut overrides = remap_override_targets(&saved.manual_overrides, &saved.clusters, &fresh);
    let unmatched: Vec<RunNumber> = saved
        .manual_overrides
        .keys()
        .copied()
        .filter(|run| !overrides.contains_key(run))
        .collect();

    let mut orphaned_runs = unplace_runs(&mut fresh, &unmatched);
    orphaned_runs.extend(apply_overrides(&mut fresh, &overrides));
    orphaned_runs.sort_unstable();
    overrides.retain(|run, _| orphaned_runs.binary_search(run).is_err());

    let relabelled = preserve_labels(&mut fresh, &saved.clusters);

    Reconciled {
        clusters: fresh,
        manual_overrides: overrides,
        report: ReconcileReport {
            orphaned_runs,
            relabelled,
        },
    }
}

/// Cluster `runs` and reconcile the result against `saved`.
pub fn cluster_with_saved(
    runs: &[RunRecord],
    config: &ClusterConfig,
    saved: Option<&SavedClusterState>,
) -> Reconciled {
    let result = reconcile(cluster(runs, config), saved);
    info!(
        clusters = result.clusters.len(),
        overrides = result.manual_overrides.len(),
        orphaned = result.report.orphaned_runs.len(),
        relabelled = result.report.relabelled.len(),
        "reconciled clustering"
    );
    result
}
