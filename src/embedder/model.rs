// model.rs - metadata about the face analysis model pack
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceModelInfo {
    /// InsightFace model pack name
    pub name: String,
    /// Embedding length produced by the recognition model
    pub dim: usize,
    /// Square input size for the detector
    pub det_size: u32,
    /// Images per analyzer invocation
    pub max_batch: usize,
}

impl FaceModelInfo {
    pub fn new(name: impl Into<String>, dim: usize, det_size: u32, max_batch: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            det_size,
            max_batch,
        }
    }

    /// ArcFace R100 recognition with the SCRFD-10G detector
    pub fn buffalo_l() -> Self {
        Self::new("buffalo_l", 512, 640, 16)
    }
}

impl Default for FaceModelInfo {
    fn default() -> Self {
        Self::buffalo_l()
    }
}
