pub mod batcher;
pub mod bridge;
pub mod model;
pub mod types;


pub use batcher::Batcher;
pub use bridge::{FaceAnalyzer, PythonFaceAnalyzer};
pub use model::FaceModelInfo;
pub use types::{AnalyzeRequest, BoundingBox, DetectedFace, ImageFaces, ImageOutput};
