use super::*;
use crate::clusterer::{cluster, Cluster, ClusterAssignment, ClusterConfig};
use crate::session::{RunNumber, RunRecord};
use crate::store::SavedClusterState;

fn c(id: &str, label: &str, runs: &[RunNumber]) -> Cluster {
    Cluster {
        id: id.to_string(),
        label: label.to_string(),
        color: "#000000".to_string(),
        representative_run: runs[0],
        run_numbers: runs.to_vec(),
    }
}

fn assignment(clusters: Vec<Cluster>) -> ClusterAssignment {
    clusters.into_iter().collect()
}

fn overrides(pairs: &[(RunNumber, &str)]) -> ManualOverrides {
    pairs.iter().map(|&(r, id)| (r, id.to_string())).collect()
}

fn run(n: RunNumber, v: &[f32]) -> RunRecord {
    RunRecord::new(n, Some(v.to_vec()))
}

/// Three athletes along the x, y and z axes.
fn session() -> Vec<RunRecord> {
    vec![
        run(1, &[1.0, 0.0, 0.0]),
        run(2, &[0.98, 0.15, 0.0]),
        run(3, &[0.97, 0.0, 0.2]),
        run(4, &[0.0, 1.0, 0.0]),
        run(5, &[0.0, 0.97, 0.25]),
        run(6, &[0.0, 0.0, 1.0]),
        run(7, &[0.1, 0.0, 0.99]),
    ]
}

#[test]
fn test_default_label_pattern() {
    assert!(is_default_label("Athlete 1"));
    assert!(is_default_label("Athlete 42"));
    assert!(!is_default_label("Athlete"));
    assert!(!is_default_label("Athlete "));
    assert!(!is_default_label("Athlete 4b"));
    assert!(!is_default_label("athlete 4"));
    assert!(!is_default_label("Jordan"));
}

#[test]
fn test_apply_override_moves_run() {
    let mut clusters = assignment(vec![
        c("athlete_1", "Athlete 1", &[1, 2, 5]),
        c("athlete_2", "Athlete 2", &[3, 4]),
    ]);

    let orphaned = apply_overrides(&mut clusters, &overrides(&[(5, "athlete_2")]));

    assert!(orphaned.is_empty());
    assert_eq!(clusters.get("athlete_1").unwrap().run_numbers, vec![1, 2]);
    assert_eq!(clusters.get("athlete_2").unwrap().run_numbers, vec![3, 4, 5]);
}

#[test]
fn test_apply_override_removes_emptied_cluster() {
    let mut clusters = assignment(vec![
        c("athlete_1", "Athlete 1", &[1, 2]),
        c("athlete_2", "Athlete 2", &[7]),
    ]);

    apply_overrides(&mut clusters, &overrides(&[(7, "athlete_1")]));

    assert!(!clusters.contains_id("athlete_2"));
    assert_eq!(clusters.len(), 1);
    let first = clusters.get("athlete_1").unwrap();
    assert_eq!(first.run_numbers, vec![1, 2, 7]);
}

#[test]
fn test_apply_override_missing_target_drops_run() {
    let mut clusters = assignment(vec![
        c("athlete_1", "Athlete 1", &[1, 2]),
        c("athlete_2", "Athlete 2", &[3]),
    ]);

    let orphaned = apply_overrides(&mut clusters, &overrides(&[(2, "athlete_9"), (3, "athlete_9")]));

    assert_eq!(orphaned, vec![2, 3]);
    assert_eq!(clusters.get("athlete_1").unwrap().run_numbers, vec![1]);
    assert!(!clusters.contains_id("athlete_2"));
    assert_eq!(clusters.cluster_of(2), None);
}

#[test]
fn test_apply_override_ignores_unknown_run() {
    let mut clusters = assignment(vec![c("athlete_1", "Athlete 1", &[1])]);
    let before = clusters.clone();

    let orphaned = apply_overrides(&mut clusters, &overrides(&[(99, "athlete_1")]));

    assert!(orphaned.is_empty());
    assert_eq!(clusters, before);
}

#[test]
fn test_preserve_custom_label_by_overlap() {
    let saved = assignment(vec![
        c("athlete_1", "Jordan", &[3, 7, 9]),
        c("athlete_2", "Athlete 2", &[1, 2]),
    ]);
    let mut fresh = assignment(vec![
        c("athlete_1", "Athlete 1", &[1, 2]),
        c("athlete_2", "Athlete 2", &[3, 7, 9, 11]),
    ]);

    let relabelled = preserve_labels(&mut fresh, &saved);

    assert_eq!(relabelled, vec!["athlete_2".to_string()]);
    assert_eq!(fresh.get("athlete_2").unwrap().label, "Jordan");
    assert_eq!(fresh.get("athlete_1").unwrap().label, "Athlete 1");
}

#[test]
fn test_preserve_labels_picks_largest_overlap() {
    let saved = assignment(vec![
        c("a", "Casey", &[1]),
        c("b", "Jordan", &[2, 3]),
    ]);
    let mut fresh = assignment(vec![c("athlete_1", "Athlete 1", &[1, 2, 3])]);

    preserve_labels(&mut fresh, &saved);
    assert_eq!(fresh.get("athlete_1").unwrap().label, "Jordan");
}

#[test]
fn test_preserve_labels_tie_goes_to_first_saved() {
    let saved = assignment(vec![c("a", "Casey", &[1]), c("b", "Jordan", &[2])]);
    let mut fresh = assignment(vec![c("athlete_1", "Athlete 1", &[1, 2])]);

    preserve_labels(&mut fresh, &saved);
    assert_eq!(fresh.get("athlete_1").unwrap().label, "Casey");
}

#[test]
fn test_preserve_labels_default_label_wins_overlap() {
    // A larger default-labelled match blocks a smaller custom one.
    let saved = assignment(vec![c("a", "Athlete 3", &[1, 2]), c("b", "Jordan", &[3])]);
    let mut fresh = assignment(vec![c("athlete_1", "Athlete 1", &[1, 2, 3])]);

    assert!(preserve_labels(&mut fresh, &saved).is_empty());
    assert_eq!(fresh.get("athlete_1").unwrap().label, "Athlete 1");
}

#[test]
fn test_preserve_labels_no_overlap() {
    let saved = assignment(vec![c("a", "Jordan", &[10, 11])]);
    let mut fresh = assignment(vec![c("athlete_1", "Athlete 1", &[1, 2])]);

    assert!(preserve_labels(&mut fresh, &saved).is_empty());
}

#[test]
fn test_remap_targets_follow_saved_membership() {
    // Saved athlete_2 = {4, 5, 6} where 6 was dragged in; fresh ids shifted.
    let saved = assignment(vec![
        c("athlete_1", "Athlete 1", &[1, 2, 3]),
        c("athlete_2", "Athlete 2", &[4, 5, 6]),
    ]);
    let fresh = assignment(vec![
        c("athlete_1", "Athlete 1", &[0]),
        c("athlete_2", "Athlete 2", &[1, 2, 3, 6]),
        c("athlete_3", "Athlete 3", &[4, 5]),
    ]);

    let remapped = remap_override_targets(&overrides(&[(6, "athlete_2")]), &saved, &fresh);
    assert_eq!(remapped, overrides(&[(6, "athlete_3")]));
}

#[test]
fn test_remap_drops_saved_target_without_match() {
    // athlete_4 only ever held overridden runs, so nothing anchors it.
    let saved = assignment(vec![c("athlete_4", "Athlete 4", &[8])]);
    let fresh = assignment(vec![
        c("athlete_1", "Athlete 1", &[1]),
        c("athlete_4", "Athlete 4", &[8]),
    ]);
    let ov = overrides(&[(8, "athlete_4"), (1, "athlete_7")]);

    let remapped = remap_override_targets(&ov, &saved, &fresh);
    assert_eq!(remapped, overrides(&[(1, "athlete_7")]));
}

#[test]
fn test_unplace_runs() {
    let mut clusters = assignment(vec![
        c("athlete_1", "Athlete 1", &[1, 2]),
        c("athlete_2", "Athlete 2", &[3]),
    ]);

    let unplaced = unplace_runs(&mut clusters, &[3, 2, 99]);

    assert_eq!(unplaced, vec![3, 2]);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters.get("athlete_1").unwrap().run_numbers, vec![1]);
}

#[test]
fn test_reconcile_without_saved_state() {
    let fresh = cluster(&session(), &ClusterConfig::default());
    let result = reconcile(fresh.clone(), None);

    assert_eq!(result.clusters, fresh);
    assert!(result.manual_overrides.is_empty());
    assert_eq!(result.report, ReconcileReport::default());
}

#[test]
fn test_label_survives_reclustering() {
    let config = ClusterConfig::default();
    let mut first = cluster(&session(), &config);
    let id = first.cluster_of(4).unwrap().to_string();
    first.get_mut(&id).unwrap().label = "Jordan".to_string();
    let saved = SavedClusterState::now(first, ManualOverrides::new());

    // A new run for the x athlete arrives before run 1, shifting encounter order.
    let mut runs = vec![run(8, &[0.0, 0.99, 0.1])];
    runs.extend(session());
    let result = cluster_with_saved(&runs, &config, Some(&saved));

    let jordan = result.clusters.get(result.clusters.cluster_of(4).unwrap()).unwrap();
    assert_eq!(jordan.label, "Jordan");
    assert_eq!(jordan.run_numbers, vec![4, 5, 8]);
    assert_eq!(
        result.clusters.iter().filter(|c| c.label == "Jordan").count(),
        1
    );
}

#[test]
fn test_override_survives_reclustering_with_new_data() {
    let config = ClusterConfig::default();
    let first = cluster(&session(), &config);
    let a = first.cluster_of(5).unwrap().to_string();
    let b = first.cluster_of(6).unwrap().to_string();
    assert_ne!(a, b);

    // User drags run 5 into the z athlete's cluster.
    let mut edited = first.clone();
    let ov = overrides(&[(5, b.as_str())]);
    apply_overrides(&mut edited, &ov);
    let saved = SavedClusterState::now(edited, ov);

    // Unrelated runs arrive first, so every fresh id shifts.
    let mut runs = vec![
        run(20, &[-1.0, 0.0, 0.0]),
        run(21, &[-0.98, 0.1, 0.0]),
    ];
    runs.extend(session());
    let result = cluster_with_saved(&runs, &config, Some(&saved));

    let home = result.clusters.cluster_of(5).unwrap();
    let home = result.clusters.get(home).unwrap();
    assert_eq!(home.run_numbers, vec![5, 6, 7]);
    assert_eq!(result.manual_overrides.get(&5).map(String::as_str), Some(home.id.as_str()));
    assert!(result.report.orphaned_runs.is_empty());
}

#[test]
fn test_reconcile_reports_orphaned_override() {
    let config = ClusterConfig::default();
    let saved = SavedClusterState::now(ClusterAssignment::new(), overrides(&[(6, "athlete_9")]));

    let result = cluster_with_saved(&session(), &config, Some(&saved));

    assert_eq!(result.report.orphaned_runs, vec![6]);
    assert_eq!(result.clusters.cluster_of(6), None);
    assert_eq!(result.clusters.get(result.clusters.cluster_of(7).unwrap()).unwrap().run_numbers, vec![7]);
    assert!(result.manual_overrides.is_empty());
}

#[test]
fn test_override_into_vanished_cluster_never_lands_on_regenerated_id() {
    let config = ClusterConfig::default();
    // athlete_2 = {5} exists only because of the override on run 5.
    let saved = SavedClusterState::now(
        assignment(vec![
            c("athlete_1", "Athlete 1", &[1, 2, 3, 4]),
            c("athlete_2", "Athlete 2", &[5]),
            c("athlete_3", "Athlete 3", &[6, 7]),
        ]),
        overrides(&[(4, "athlete_1"), (5, "athlete_2")]),
    );

    // New runs arrive first, so fresh athlete_2 is now the x athlete.
    let mut runs = vec![
        run(20, &[-1.0, 0.0, 0.0]),
        run(21, &[-0.98, 0.1, 0.0]),
    ];
    runs.extend(session());
    let result = cluster_with_saved(&runs, &config, Some(&saved));

    let x = result.clusters.cluster_of(1).unwrap();
    assert_eq!(result.clusters.get(x).unwrap().run_numbers, vec![1, 2, 3, 4]);
    assert_eq!(result.clusters.cluster_of(5), None);
    assert_eq!(result.report.orphaned_runs, vec![5]);
    assert_eq!(result.manual_overrides, overrides(&[(4, x)]));
}
