mod agglomerative;
mod centroid;
mod similarity;
mod types;


pub use agglomerative::{cluster, Agglomerative, SlotState};
pub use centroid::compute_centroid;
pub use similarity::{cosine_similarity, cosine_similarity_opt};
pub use types::{
    Cluster, ClusterAssignment, ClusterConfig, ConfigError, DEFAULT_PALETTE, DEFAULT_THRESHOLD,
};
