use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Embedding is not unit-norm: norm {norm} (tolerance {tolerance})")]
    NotNormalized { norm: f32, tolerance: f32 },

    #[error("Cannot normalize a zero or non-finite vector")]
    ZeroNorm,

    #[error("Invalid threshold: {0} (must be positive and finite)")]
    InvalidThreshold(f32),

    #[error("Invalid embedding dimension: must be greater than zero")]
    InvalidDimension,
}
