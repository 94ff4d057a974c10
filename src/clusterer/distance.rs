/// Euclidean (L2) distance between two vectors of equal length.
///
/// Both inputs are expected to be unit-norm embeddings, which bounds the
/// result to `[0.0, 2.0]`. Mismatched lengths are a caller bug; the registry
/// checks dimensions before it ever gets here.
#[inline]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// L2 norm of a single vector.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
