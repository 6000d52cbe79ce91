// Public API exports
pub mod clusterer;
pub mod engine;
pub mod reconciler;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use session::{dedup_embedded_runs, RunNumber, RunRecord, SessionManifest};

pub use clusterer::{
    cluster, cosine_similarity, Cluster, ClusterAssignment, ClusterConfig, ConfigError,
    DEFAULT_PALETTE, DEFAULT_THRESHOLD,
};

pub use reconciler::{
    apply_overrides, cluster_with_saved, preserve_labels, reconcile, ManualOverrides,
    ReconcileReport, Reconciled,
};

pub use store::{
    ClusterStore, JsonDirStore, MemoryStore, SavedClusterState, SessionKey, SqliteStore,
    StoreError,
};

pub use engine::{EditError, ReidEngine, SessionClusters};
