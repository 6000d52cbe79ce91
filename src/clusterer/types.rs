use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::session::RunNumber;

/// Default minimum cosine similarity for two clusters to merge.
pub const DEFAULT_THRESHOLD: f32 = 0.88;

/// Cyclic palette handed out to clusters in sequence order.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// One group of runs believed to belong to the same athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Stored as the map key in the persisted document.
    #[serde(skip)]
    pub id: String,
    pub label: String,
    pub color: String,
    pub representative_run: RunNumber,
    /// Ascending, unique.
    pub run_numbers: Vec<RunNumber>,
}

impl Cluster {
    pub fn contains(&self, run: RunNumber) -> bool {
        self.run_numbers.binary_search(&run).is_ok()
    }

    /// Insert a run keeping `run_numbers` sorted and unique.
    pub fn insert_run(&mut self, run: RunNumber) {
        if let Err(pos) = self.run_numbers.binary_search(&run) {
            self.run_numbers.insert(pos, run);
        }
        self.refresh_representative();
    }

    /// Remove a run, returning whether it was present.
    pub fn remove_run(&mut self, run: RunNumber) -> bool {
        match self.run_numbers.binary_search(&run) {
            Ok(pos) => {
                self.run_numbers.remove(pos);
                self.refresh_representative();
                true
            }
            Err(_) => false,
        }
    }

    fn refresh_representative(&mut self) {
        if let Some(&first) = self.run_numbers.first() {
            self.representative_run = first;
        }
    }
}

/// Cluster id -> cluster, kept in encounter order.
///
/// Serialises as a JSON object keyed by cluster id. The run-number sets of
/// all clusters are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterAssignment {
    clusters: Vec<Cluster>,
}

impl ClusterAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cluster> {
        self.clusters.iter_mut()
    }

    pub fn get(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Cluster> {
        self.clusters.iter_mut().find(|c| c.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Id of the cluster currently holding `run`, if any.
    pub fn cluster_of(&self, run: RunNumber) -> Option<&str> {
        self.clusters
            .iter()
            .find(|c| c.contains(run))
            .map(|c| c.id.as_str())
    }

    /// Add a cluster, replacing any existing cluster with the same id.
    pub fn insert(&mut self, cluster: Cluster) {
        match self.clusters.iter_mut().find(|c| c.id == cluster.id) {
            Some(slot) => *slot = cluster,
            None => self.clusters.push(cluster),
        }
    }

    /// Drop every cluster whose run list is empty.
    pub fn remove_empty(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        self.clusters.retain(|c| {
            if c.run_numbers.is_empty() {
                removed.push(c.id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Every clustered run, in cluster order.
    pub fn run_numbers(&self) -> impl Iterator<Item = RunNumber> + '_ {
        self.clusters
            .iter()
            .flat_map(|c| c.run_numbers.iter().copied())
    }
}

impl FromIterator<Cluster> for ClusterAssignment {
    fn from_iter<I: IntoIterator<Item = Cluster>>(iter: I) -> Self {
        let mut out = Self::new();
        for cluster in iter {
            out.insert(cluster);
        }
        out
    }
}

impl Serialize for ClusterAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.clusters.len()))?;
        for cluster in &self.clusters {
            map.serialize_entry(&cluster.id, cluster)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ClusterAssignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AssignmentVisitor;

        impl<'de> Visitor<'de> for AssignmentVisitor {
            type Value = ClusterAssignment;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of cluster id to cluster")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = ClusterAssignment::new();
                while let Some((id, mut cluster)) = access.next_entry::<String, Cluster>()? {
                    cluster.id = id;
                    cluster.run_numbers.sort_unstable();
                    cluster.run_numbers.dedup();
                    out.insert(cluster);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(AssignmentVisitor)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Threshold must be a finite number in [-1, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("Color palette must contain at least one color")]
    EmptyPalette,
}

/// Caller-supplied knobs for one clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Closer to 1.0 gives more, smaller clusters.
    pub threshold: f32,
    pub palette: Vec<String>,
}

impl ClusterConfig {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn with_palette<I, S>(mut self, palette: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.palette = palette.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || !(-1.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(())
    }

    /// Color for the cluster with 1-based sequence number `seq`.
    pub fn color_for(&self, seq: usize) -> String {
        if self.palette.is_empty() {
            return String::new();
        }
        self.palette[seq.saturating_sub(1) % self.palette.len()].clone()
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}
