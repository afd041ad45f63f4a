//! Normalization and similarity kernels.
//!
//! Rows and queries are normalized with `v / (‖v‖₂ + NORM_EPSILON)`. For a
//! genuine unit vector the epsilon changes each component by about one part
//! in 1e10, far below f32 resolution, so unit inputs come back unchanged. A
//! zero vector stays zero instead of dividing by zero, and therefore scores
//! 0.0 against everything.
//!
//! Norms are accumulated in f32. Components beyond roughly 1.8e19 overflow
//! the norm to infinity; such a vector normalizes to zero and counts as
//! degenerate, the same as a zero vector.

/// Floor added to every L2 norm before dividing.
pub const NORM_EPSILON: f32 = 1e-10;

/// Euclidean norm of a vector.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalizes a vector to unit length in place.
///
/// Returns the norm the vector had before normalization so callers can
/// report degenerate (zero-norm) rows.
pub fn l2_normalize_in_place(v: &mut [f32]) -> f32 {
    let norm = l2_norm(v);
    let denom = norm + NORM_EPSILON;
    for x in v.iter_mut() {
        *x /= denom;
    }
    norm
}

/// Returns a normalized copy of `v`.
#[must_use]
pub fn l2_normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    l2_normalize_in_place(&mut out);
    out
}

/// Inner product of two equal-length vectors.
///
/// For unit vectors this is their cosine similarity, in [-1, 1].
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// True when a norm cannot carry direction: numerically zero or overflowed.
#[inline]
pub fn is_degenerate_norm(norm: f32) -> bool {
    !norm.is_finite() || norm <= NORM_EPSILON
}
