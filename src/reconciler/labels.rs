use tracing::debug;

use crate::clusterer::ClusterAssignment;

/// Whether `label` is a generated `"Athlete <number>"` label.
pub fn is_default_label(label: &str) -> bool {
    label
        .strip_prefix("Athlete ")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Carry user-chosen labels from a saved assignment onto a fresh one.
///
/// Each fresh cluster takes the label of the saved cluster it overlaps most
/// (first found on ties), provided that label was customised. Returns the ids
/// that were relabelled.
pub fn preserve_labels(fresh: &mut ClusterAssignment, saved: &ClusterAssignment) -> Vec<String> {
    let mut relabelled = Vec::new();

    for cluster in fresh.iter_mut() {
        let mut best: Option<(&str, usize)> = None;
        for old in saved.iter() {
            let overlap = old
                .run_numbers
                .iter()
                .filter(|&&r| cluster.contains(r))
                .count();
            if best.map_or(true, |(_, b)| overlap > b) {
                best = Some((old.label.as_str(), overlap));
            }
        }

        if let Some((label, overlap)) = best {
            if overlap > 0 && !is_default_label(label) {
                debug!(cluster = %cluster.id, label, overlap, "kept custom label");
                cluster.label = label.to_string();
                relabelled.push(cluster.id.clone());
            }
        }
    }

    relabelled
}
