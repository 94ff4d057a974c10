use super::distance::l2_norm;
use super::error::ClusterError;

/// An immutable face embedding with unit L2 norm.
///
/// The only ways to build one are [`Embedding::normalize`], which scales a raw
/// vector coming out of the face model, and [`Embedding::from_unit`], which
/// trusts the caller. The registry never rescales what it stores.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Scale `raw` to unit length.
    pub fn normalize(raw: Vec<f32>) -> Result<Self, ClusterError> {
        let norm = l2_norm(&raw);
        if norm == 0.0 || !norm.is_finite() {
            return Err(ClusterError::ZeroNorm);
        }

        Ok(Self(raw.into_iter().map(|x| x / norm).collect()))
    }

    /// Wrap a vector the caller already normalized.
    pub fn from_unit(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn norm(&self) -> f32 {
        l2_norm(&self.0)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
