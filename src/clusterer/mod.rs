mod distance;
mod embedding;
mod error;
mod registry;
mod types;


pub use distance::{l2_distance, l2_norm};
pub use embedding::Embedding;
pub use error::ClusterError;
pub use registry::{
    ClusterHandle, ClusterRegistry, RegistryConfig, DEFAULT_EMBEDDING_DIM,
    DEFAULT_NORM_TOLERANCE, DEFAULT_THRESHOLD,
};
pub use types::{cluster_label, Cluster, ClusterId, DEFAULT_LABEL_PREFIX};
