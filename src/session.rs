// Session manifest records as consumed from the gallery's per-session JSON.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stable identifier for one ski run.
pub type RunNumber = u32;

/// One montage output for a run. Variants of the same run share an embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_number: RunNumber,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl RunRecord {
    pub fn new(run_number: RunNumber, embedding: Option<Vec<f32>>) -> Self {
        Self {
            run_number,
            embedding,
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub session_id: String,
    #[serde(default)]
    pub runs: Vec<RunRecord>,
}

impl SessionManifest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Reduce records to one embedding per run number, in first-seen order.
///
/// The first record carrying an embedding wins; runs that never carry one are
/// dropped.
pub fn dedup_embedded_runs(runs: &[RunRecord]) -> Vec<(RunNumber, &[f32])> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for record in runs {
        let Some(embedding) = record.embedding.as_deref() else {
            continue;
        };
        if seen.insert(record.run_number) {
            out.push((record.run_number, embedding));
        }
    }

    out
}
