// the python contract
use serde::{Deserialize, Serialize};

/// Face box in source-image pixel coordinates, as reported by the detector.
///
/// Not clamped: detectors happily return boxes that hang off the edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One detected face: where it is and its raw (unnormalized) embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub det_score: Option<f32>,
}

/// Faces found in a single image, or the reason it could not be read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageFaces {
    pub faces: Vec<DetectedFace>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyzeRequest {
    pub images: Vec<String>,
}

#[derive(Deserialize)]
pub struct ImageOutput {
    pub image: String,
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
    #[serde(default)]
    pub error: Option<String>,
}
