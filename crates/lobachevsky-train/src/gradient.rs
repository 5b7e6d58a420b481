//! Finite-difference gradients and the Riemannian SGD step.
//!
//! Layer parameters live in the tangent space at the origin, so the step is
//! plain gradient descent on a Euclidean vector. The only hyperbolic touch is
//! the conformal rescale, evaluated at the layer's mean output norm:
//!
//! ```text
//! g_R = g_E / λ(x̄)²  =  ((1 − c‖x̄‖²) / 2)² · g_E
//! ```

use lobachevsky_hyp_ops::Manifold;

use crate::error::Result;

// ─────────────────────────────────────────────
// Gradient estimation
// ─────────────────────────────────────────────

/// Central differences of `loss` around `params`.
///
/// `loss` is called `2 · params.len()` times; it must be deterministic for a
/// given input (same dropout step, same targets).
pub fn central_difference<F>(params: &[f64], eps: f64, mut loss: F) -> Result<Vec<f64>>
where
    F: FnMut(&[f64]) -> Result<f64>,
{
    let mut probe = params.to_vec();
    let mut grad = Vec::with_capacity(params.len());
    for i in 0..params.len() {
        let orig = probe[i];
        probe[i] = orig + eps;
        let up = loss(&probe)?;
        probe[i] = orig - eps;
        let down = loss(&probe)?;
        probe[i] = orig;
        grad.push((up - down) / (2.0 * eps));
    }
    Ok(grad)
}

// ─────────────────────────────────────────────
// Riemannian rescale and update
// ─────────────────────────────────────────────

/// `1 / λ(x̄)²` for a point at Euclidean radius `mean_norm`.
///
/// Euclidean mode has λ = 2 everywhere, so the scale is a constant ¼.
pub fn riemannian_scale(manifold: &Manifold, mean_norm: f64) -> f64 {
    let lambda = manifold.conformal_factor(&[mean_norm]);
    1.0 / (lambda * lambda)
}

/// Rescale every gradient so their joint L2 norm is at most `max_norm`.
/// Returns the norm before clipping.
pub fn clip_global_norm(grads: &mut [Vec<f64>], max_norm: f64) -> f64 {
    let total = grads
        .iter()
        .flat_map(|g| g.iter())
        .map(|g| g * g)
        .sum::<f64>()
        .sqrt();
    if total > max_norm && total > 0.0 {
        let s = max_norm / total;
        for g in grads.iter_mut() {
            g.iter_mut().for_each(|x| *x *= s);
        }
    }
    total
}

/// `params − lr · scale · grad`.
pub fn sgd_step(params: &[f64], grad: &[f64], lr: f64, scale: f64) -> Vec<f64> {
    params
        .iter()
        .zip(grad)
        .map(|(p, g)| p - lr * scale * g)
        .collect()
}
