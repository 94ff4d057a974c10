// Public API exports
pub mod clusterer;
pub mod config;
pub mod embedder;
pub mod input;
pub mod organizer;
pub mod pipeline;
pub mod report;
pub mod security;

// Re-export main types for convenience
pub use clusterer::{
    l2_distance, Cluster, ClusterError, ClusterHandle, ClusterId, ClusterRegistry, Embedding,
    RegistryConfig,
};

pub use config::Config;

pub use embedder::{
    Batcher, BoundingBox, DetectedFace, FaceAnalyzer, FaceModelInfo, ImageFaces,
    PythonFaceAnalyzer,
};

pub use input::{ImageEntry, InputError, InputScanner, ScanResult};

pub use organizer::{clamp_to_image, ClusterOrganizer, CropRect};

pub use pipeline::{Pipeline, RunOutcome};

pub use report::{RunReport, RunStats};

pub use security::PathSanitizer;
