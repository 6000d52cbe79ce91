use tracing::debug;

use crate::clusterer::{
    centroid::compute_centroid,
    similarity::cosine_similarity,
    types::{Cluster, ClusterAssignment, ClusterConfig},
};
use crate::session::{dedup_embedded_runs, RunNumber, RunRecord};

/// Diagonal and retired entries of the similarity matrix.
const EXCLUDED: f32 = f32::NEG_INFINITY;

/// Lifecycle of one arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Active,
    /// Absorbed into the slot at this index.
    Merged { into: usize },
}

#[derive(Debug, Clone)]
struct Slot {
    state: SlotState,
    /// Indices into the member table, in merge order.
    members: Vec<usize>,
    centroid: Vec<f32>,
}

/// Arena-backed bottom-up clustering over a single session's runs.
///
/// Slot indices stay stable for the whole merge loop; absorbed slots are
/// tagged rather than removed.
pub struct Agglomerative<'a> {
    runs: Vec<(RunNumber, &'a [f32])>,
    slots: Vec<Slot>,
    sim: Vec<Vec<f32>>,
    merges: usize,
}

impl<'a> Agglomerative<'a> {
    /// Deduplicate the records and seed one slot per embedded run.
    pub fn new(records: &'a [RunRecord]) -> Self {
        let runs = dedup_embedded_runs(records);
        let n = runs.len();

        let slots: Vec<Slot> = runs
            .iter()
            .enumerate()
            .map(|(i, &(_, embedding))| Slot {
                state: SlotState::Active,
                members: vec![i],
                centroid: embedding.to_vec(),
            })
            .collect();

        let mut sim = vec![vec![EXCLUDED; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let s = cosine_similarity(runs[i].1, runs[j].1);
                sim[i][j] = s;
                sim[j][i] = s;
            }
        }

        Self {
            runs,
            slots,
            sim,
            merges: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self, slot: usize) -> SlotState {
        self.slots[slot].state
    }

    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Most similar pair of active slots.
    ///
    /// Scans `i < j` in index order and keeps the first strict maximum, so
    /// ties go to the lowest indices.
    pub fn best_pair(&self) -> Option<(usize, usize, f32)> {
        let mut best: Option<(usize, usize, f32)> = None;
        let n = self.slots.len();

        for i in 0..n {
            if self.slots[i].state != SlotState::Active {
                continue;
            }
            for j in (i + 1)..n {
                if self.slots[j].state != SlotState::Active {
                    continue;
                }
                let s = self.sim[i][j];
                if best.map_or(s > EXCLUDED, |(_, _, b)| s > b) {
                    best = Some((i, j, s));
                }
            }
        }

        best
    }

    /// Perform one merge if the best pair clears `threshold`.
    ///
    /// Returns the merged pair, or `None` once the fixed point is reached.
    pub fn step(&mut self, threshold: f32) -> Option<(usize, usize)> {
        let (keep, absorb, s) = self.best_pair()?;
        // NaN thresholds never merge.
        if !(s >= threshold) {
            return None;
        }

        let absorbed = std::mem::take(&mut self.slots[absorb].members);
        self.slots[absorb].state = SlotState::Merged { into: keep };
        self.slots[absorb].centroid.clear();
        self.slots[keep].members.extend(absorbed);

        let member_vectors: Vec<&[f32]> = self.slots[keep]
            .members
            .iter()
            .map(|&m| self.runs[m].1)
            .collect();
        self.slots[keep].centroid = compute_centroid(&member_vectors);

        for other in 0..self.slots.len() {
            if other == keep {
                continue;
            }
            let s = if self.slots[other].state == SlotState::Active {
                cosine_similarity(&self.slots[keep].centroid, &self.slots[other].centroid)
            } else {
                EXCLUDED
            };
            self.sim[keep][other] = s;
            self.sim[other][keep] = s;
        }

        self.merges += 1;
        debug!(
            keep = self.runs[keep].0,
            absorb = self.runs[absorb].0,
            similarity = s,
            "merged clusters"
        );
        Some((keep, absorb))
    }

    /// Run the merge loop to its fixed point.
    pub fn run(&mut self, threshold: f32) {
        while self.step(threshold).is_some() {}
    }

    /// Final slot an original slot ended up in, following the merge chain.
    pub fn root_of(&self, mut slot: usize) -> usize {
        while let SlotState::Merged { into } = self.slots[slot].state {
            slot = into;
        }
        slot
    }

    /// Surviving slots as numbered clusters, in slot order.
    pub fn finalize(&self, config: &ClusterConfig) -> ClusterAssignment {
        self.slots
            .iter()
            .filter(|slot| slot.state == SlotState::Active)
            .enumerate()
            .map(|(idx, slot)| {
                let seq = idx + 1;
                let mut run_numbers: Vec<RunNumber> =
                    slot.members.iter().map(|&m| self.runs[m].0).collect();
                run_numbers.sort_unstable();

                Cluster {
                    id: format!("athlete_{}", seq),
                    label: format!("Athlete {}", seq),
                    color: config.color_for(seq),
                    representative_run: run_numbers[0],
                    run_numbers,
                }
            })
            .collect()
    }
}

/// Group a session's runs by athlete.
///
/// Every embedded run lands in exactly one cluster. The result is a pure
/// function of the records and `config`; saved state is reconciled in by the
/// caller afterwards.
pub fn cluster(runs: &[RunRecord], config: &ClusterConfig) -> ClusterAssignment {
    let mut arena = Agglomerative::new(runs);
    if arena.is_empty() {
        return ClusterAssignment::new();
    }

    arena.run(config.threshold);
    let result = arena.finalize(config);

    debug!(
        runs = arena.len(),
        merges = arena.merges(),
        clusters = result.len(),
        threshold = config.threshold,
        "clustering finished"
    );
    result
}
