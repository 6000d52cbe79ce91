use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::clusterer::ClusterAssignment;
use crate::session::RunNumber;

/// Run number -> cluster id the user dragged it into.
pub type ManualOverrides = BTreeMap<RunNumber, String>;

/// Move every overridden run into its target cluster.
///
/// Overrides for runs absent from `clusters` are skipped rather than appended
/// to the target, so only runs with an embedding ever appear in a cluster. A
/// run whose target id no longer exists is removed from its current cluster
/// and left unplaced; those runs are returned. Clusters emptied along the way
/// are deleted.
pub fn apply_overrides(clusters: &mut ClusterAssignment, overrides: &ManualOverrides) -> Vec<RunNumber> {
    let mut orphaned = Vec::new();

    for (&run, target) in overrides {
        let Some(source) = clusters.cluster_of(run).map(str::to_owned) else {
            continue;
        };
        if source == *target {
            continue;
        }

        if let Some(current) = clusters.get_mut(&source) {
            current.remove_run(run);
        }

        match clusters.get_mut(target) {
            Some(dest) => {
                dest.insert_run(run);
                debug!(run, from = %source, to = %target, "applied override");
            }
            None => {
                warn!(run, cluster = %target, "override target no longer exists, run left unplaced");
                orphaned.push(run);
            }
        }
    }

    let removed = clusters.remove_empty();
    if !removed.is_empty() {
        debug!(?removed, "removed clusters emptied by overrides");
    }
    orphaned
}

/// Translate override targets from saved cluster ids to fresh ones.
///
/// Ids are regenerated on every computation, so a saved target is matched to
/// the fresh cluster sharing the most of its runs (ignoring runs that are
/// themselves overridden). Ties go to the first fresh cluster. Targets unknown
/// to `saved` keep their literal id.
///
/// A saved target that matches no fresh cluster has disappeared; its entries
/// are left out of the result so the old id can never land on an unrelated
/// athlete.
pub fn remap_override_targets(
    overrides: &ManualOverrides,
    saved: &ClusterAssignment,
    fresh: &ClusterAssignment,
) -> ManualOverrides {
    let mut resolved: BTreeMap<&str, Option<String>> = BTreeMap::new();

    overrides
        .iter()
        .filter_map(|(&run, target)| {
            let mapped = resolved
                .entry(target.as_str())
                .or_insert_with(|| match_saved_cluster(target, overrides, saved, fresh))
                .clone();
            match mapped {
                Some(mapped) => {
                    if mapped != *target {
                        debug!(run, saved = %target, fresh = %mapped, "remapped override target");
                    }
                    Some((run, mapped))
                }
                None => {
                    warn!(run, saved = %target, "override target matches no fresh cluster");
                    None
                }
            }
        })
        .collect()
}

/// Take `runs` out of whatever cluster holds them.
///
/// Returns the runs that were actually placed. Clusters emptied along the way
/// are deleted.
pub fn unplace_runs(clusters: &mut ClusterAssignment, runs: &[RunNumber]) -> Vec<RunNumber> {
    let mut unplaced = Vec::new();

    for &run in runs {
        let Some(source) = clusters.cluster_of(run).map(str::to_owned) else {
            continue;
        };
        if let Some(current) = clusters.get_mut(&source) {
            current.remove_run(run);
            unplaced.push(run);
        }
    }

    clusters.remove_empty();
    unplaced
}

fn match_saved_cluster(
    target: &str,
    overrides: &ManualOverrides,
    saved: &ClusterAssignment,
    fresh: &ClusterAssignment,
) -> Option<String> {
    let Some(saved_cluster) = saved.get(target) else {
        return Some(target.to_string());
    };

    let anchors: Vec<RunNumber> = saved_cluster
        .run_numbers
        .iter()
        .copied()
        .filter(|run| !overrides.contains_key(run))
        .collect();

    let mut best: Option<(&str, usize)> = None;
    for candidate in fresh.iter() {
        let overlap = anchors.iter().filter(|&&r| candidate.contains(r)).count();
        if overlap > 0 && best.map_or(true, |(_, b)| overlap > b) {
            best = Some((candidate.id.as_str(), overlap));
        }
    }

    best.map(|(id, _)| id.to_string())
}
