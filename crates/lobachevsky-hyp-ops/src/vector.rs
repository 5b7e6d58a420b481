//! Plain real-vector algebra.
//!
//! Everything here is Euclidean and stateless. Functions that combine two
//! vectors check that their lengths agree and fail with
//! [`HypError::DimensionMismatch`] otherwise; nothing is padded or truncated.

use crate::error::{HypError, Result};

/// Fail unless `a` and `b` have the same length.
#[inline]
pub fn check_dims(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(HypError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(())
}

/// ⟨a, b⟩ without a length check. Callers validate dimensions first.
#[inline]
pub(crate) fn dot_unchecked(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Inner product ⟨a, b⟩.
pub fn dot(a: &[f64], b: &[f64]) -> Result<f64> {
    check_dims(a, b)?;
    Ok(dot_unchecked(a, b))
}

/// Squared Euclidean norm ‖v‖².
#[inline]
pub fn norm_sq(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Euclidean norm ‖v‖.
///
/// Falls back to a max-abs prescaled sum when `‖v‖²` overflows or underflows,
/// so any finite vector gets a finite, nonzero norm.
#[inline]
pub fn norm(v: &[f64]) -> f64 {
    let sq = norm_sq(v);
    if sq.is_finite() && sq >= f64::MIN_POSITIVE {
        return sq.sqrt();
    }
    let m = v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if m == 0.0 || !m.is_finite() {
        return sq.sqrt();
    }
    m * v.iter().map(|x| (x / m) * (x / m)).sum::<f64>().sqrt()
}

/// `s · v`.
pub fn scale(v: &[f64], s: f64) -> Vec<f64> {
    v.iter().map(|&x| x * s).collect()
}

/// `a + b`.
pub fn add(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    check_dims(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x + y).collect())
}

/// `a − b`.
pub fn sub(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    check_dims(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x - y).collect())
}

/// `−v`.
pub fn neg(v: &[f64]) -> Vec<f64> {
    v.iter().map(|x| -x).collect()
}

/// Elementwise product `a ⊙ b`.
pub fn hadamard(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    check_dims(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).collect())
}

/// Euclidean distance ‖a − b‖.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    check_dims(a, b)?;
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt())
}

/// The zero vector of length `dim`.
#[inline]
pub fn zeros(dim: usize) -> Vec<f64> {
    vec![0.0; dim]
}

/// True iff every coordinate is finite.
#[inline]
pub fn is_finite(v: &[f64]) -> bool {
    v.iter().all(|x| x.is_finite())
}
