//! # Poincaré ball with curvature κ < 0
//!
//! All formulas use the curvature magnitude `c = |κ|`. The ball has radius
//! `1/√c`; points handed out by this module are additionally clamped below
//! `min(1, 1/√c) · (1 − ε)` so the crate-wide `‖x‖ < 1` invariant holds for
//! any curvature.
//!
//! | Method | Formula |
//! |---|---|
//! | [`mobius_add`](PoincareBall::mobius_add) | `((1+2c⟨u,v⟩+c‖v‖²)u + (1−c‖u‖²)v) / (1+2c⟨u,v⟩+c²‖u‖²‖v‖²)` |
//! | [`mobius_scalar_mult`](PoincareBall::mobius_scalar_mult) | `tanh(t·atanh(√c‖v‖)) / √c · v/‖v‖` |
//! | [`distance`](PoincareBall::distance) | `(2/√c) · atanh(√c‖(−u) ⊕ v‖)` |
//! | [`exp_map`](PoincareBall::exp_map) | `x ⊕ tanh(√c·λₓ‖v‖/2) · v/(√c‖v‖)` |
//! | [`log_map`](PoincareBall::log_map) | `2/(√c·λₓ) · atanh(√c‖w‖) · w/‖w‖`, `w = (−x) ⊕ y` |
//! | [`parallel_transport`](PoincareBall::parallel_transport) | `λₓ/λᵧ · gyr[y, −x] v` |
//!
//! where `λₓ = 2 / (1 − c‖x‖²)` is the conformal factor.

use serde::{Deserialize, Serialize};

use crate::error::{HypError, Result};
use crate::vector::{check_dims, dot_unchecked, is_finite, neg, norm, norm_sq, scale, zeros};
use crate::{ATANH_ROUNDING_CAP, BALL_EPS, MIN_DENOM, MIN_NORM, PROJECTION_MARGIN};

/// Result of an iterative Karcher (Fréchet) mean.
///
/// This is an approximation: the loop stops after `max_iter` refinements even
/// when the tangent residual is still above the tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct FrechetMean {
    pub point: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// The Poincaré ball model for a fixed negative curvature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PoincareBall {
    curvature: f64,
    c: f64,
    sqrt_c: f64,
}

impl TryFrom<f64> for PoincareBall {
    type Error = HypError;

    fn try_from(curvature: f64) -> Result<Self> {
        Self::new(curvature)
    }
}

impl From<PoincareBall> for f64 {
    fn from(ball: PoincareBall) -> f64 {
        ball.curvature
    }
}

impl Default for PoincareBall {
    fn default() -> Self {
        Self::UNIT
    }
}

impl PoincareBall {
    /// The standard ball, κ = −1.
    pub const UNIT: PoincareBall = PoincareBall { curvature: -1.0, c: 1.0, sqrt_c: 1.0 };

    /// Build a ball for curvature `κ`.
    ///
    /// # Errors
    ///
    /// [`HypError::InvalidCurvature`] if `κ ≥ 0` or not finite.
    pub fn new(curvature: f64) -> Result<Self> {
        if !curvature.is_finite() || curvature >= 0.0 {
            return Err(HypError::InvalidCurvature { curvature });
        }
        let c = -curvature;
        Ok(Self { curvature, c, sqrt_c: c.sqrt() })
    }

    /// Signed curvature κ.
    #[inline]
    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    /// Curvature magnitude `c = |κ|`.
    #[inline]
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Radius of the model ball, `1/√c`.
    #[inline]
    pub fn radius(&self) -> f64 {
        1.0 / self.sqrt_c
    }

    /// Open bound every valid point must stay under: `min(1, 1/√c)`.
    #[inline]
    pub fn limit(&self) -> f64 {
        self.radius().min(1.0)
    }

    /// Clamp radius used by [`project`](Self::project).
    #[inline]
    pub fn max_norm(&self) -> f64 {
        self.limit() * (1.0 - BALL_EPS)
    }

    /// True iff `v` is finite and strictly inside [`limit`](Self::limit).
    pub fn contains(&self, v: &[f64]) -> bool {
        is_finite(v) && norm(v) < self.limit()
    }

    /// Rescale `v` down to the clamp radius if `‖v‖ ≥ max_norm`.
    ///
    /// The rescaled vector sits a hair under the clamp radius, so projecting
    /// twice gives exactly the same vector. Infinite coordinates keep their
    /// sign as the direction.
    ///
    /// # Errors
    ///
    /// [`HypError::NonFinite`] if any coordinate is NaN.
    pub fn project(&self, v: &[f64]) -> Result<Vec<f64>> {
        if v.iter().any(|x| x.is_nan()) {
            return Err(HypError::NonFinite { context: "projected vector" });
        }
        let max = self.max_norm();
        if v.iter().any(|x| x.is_infinite()) {
            let dir: Vec<f64> = v
                .iter()
                .map(|x| if x.is_infinite() { x.signum() } else { 0.0 })
                .collect();
            return Ok(scale(&dir, max * (1.0 - PROJECTION_MARGIN) / norm(&dir)));
        }
        let n = norm(v);
        if n < max {
            Ok(v.to_vec())
        } else {
            Ok(scale(v, max * (1.0 - PROJECTION_MARGIN) / n))
        }
    }

    /// Accept `v` only if it already satisfies the ball invariant.
    ///
    /// Used on produced points after the standard clamp: a failure here is an
    /// internal defect and is surfaced, never reprojected.
    pub fn ensure(&self, v: Vec<f64>) -> Result<Vec<f64>> {
        self.check_point(&v)?;
        Ok(v)
    }

    fn check_point(&self, v: &[f64]) -> Result<()> {
        if !is_finite(v) {
            return Err(HypError::NonFinite { context: "point coordinates" });
        }
        let n = norm(v);
        if n >= self.limit() {
            return Err(HypError::OutOfBall { norm: n });
        }
        Ok(())
    }

    /// λₓ = 2 / (1 − c‖x‖²).
    #[inline]
    pub fn conformal_factor(&self, x: &[f64]) -> f64 {
        2.0 / (1.0 - self.c * norm_sq(x)).max(MIN_DENOM)
    }

    // ─────────────────────────────────────────────
    // Möbius operations
    // ─────────────────────────────────────────────

    fn mobius_add_raw(&self, u: &[f64], v: &[f64]) -> Vec<f64> {
        let c = self.c;
        let uv = dot_unchecked(u, v);
        let u2 = norm_sq(u);
        let v2 = norm_sq(v);

        let denom = (1.0 + 2.0 * c * uv + c * c * u2 * v2).max(MIN_DENOM);
        let coeff_u = (1.0 + 2.0 * c * uv + c * v2) / denom;
        let coeff_v = (1.0 - c * u2) / denom;

        u.iter()
            .zip(v.iter())
            .map(|(&ui, &vi)| coeff_u * ui + coeff_v * vi)
            .collect()
    }

    /// Möbius addition `u ⊕ v`, clamped to the ball.
    ///
    /// Not commutative: `u ⊕ v` and `v ⊕ u` agree in norm but differ by a
    /// gyration in direction.
    ///
    /// # Errors
    ///
    /// [`HypError::NonFinite`] if either operand has a NaN or infinite
    /// coordinate.
    pub fn mobius_add(&self, u: &[f64], v: &[f64]) -> Result<Vec<f64>> {
        check_dims(u, v)?;
        if !is_finite(u) || !is_finite(v) {
            return Err(HypError::NonFinite { context: "Möbius operand" });
        }
        self.ensure(self.project(&self.mobius_add_raw(u, v))?)
    }

    /// Möbius scalar multiplication `t ⊗ v`.
    ///
    /// `t = 0` and `‖v‖ ≈ 0` both return the origin directly.
    pub fn mobius_scalar_mult(&self, t: f64, v: &[f64]) -> Result<Vec<f64>> {
        if !t.is_finite() {
            return Err(HypError::NonFinite { context: "Möbius scalar" });
        }
        if !is_finite(v) {
            return Err(HypError::NonFinite { context: "Möbius operand" });
        }
        let n = norm(v);
        if t == 0.0 || n < MIN_NORM {
            return Ok(zeros(v.len()));
        }
        let arg = (self.sqrt_c * n).min(ATANH_ROUNDING_CAP);
        let factor = (t * arg.atanh()).tanh() / (self.sqrt_c * n);
        self.ensure(self.project(&scale(v, factor))?)
    }

    /// Hyperbolic distance.
    ///
    /// The `atanh` argument is capped at `1 − ε`, so the result is finite for
    /// every pair of in-ball points. Identical inputs return exactly 0.
    pub fn distance(&self, u: &[f64], v: &[f64]) -> Result<f64> {
        check_dims(u, v)?;
        if u == v {
            return Ok(0.0);
        }
        let w = self.mobius_add_raw(&neg(u), v);
        let arg = (self.sqrt_c * norm(&w)).min(1.0 - BALL_EPS);
        Ok(2.0 / self.sqrt_c * arg.atanh())
    }

    /// Gyrator `gyr[u, v] w` in closed form.
    ///
    /// Gyrations are Euclidean isometries, so `‖gyr[u,v]w‖ = ‖w‖`.
    pub fn gyration(&self, u: &[f64], v: &[f64], w: &[f64]) -> Result<Vec<f64>> {
        check_dims(u, v)?;
        check_dims(u, w)?;
        let c = self.c;
        let c2 = c * c;
        let uv = dot_unchecked(u, v);
        let uw = dot_unchecked(u, w);
        let vw = dot_unchecked(v, w);
        let u2 = norm_sq(u);
        let v2 = norm_sq(v);

        let a = -c2 * uw * v2 + c * vw + 2.0 * c2 * uv * vw;
        let b = -c2 * vw * u2 - c * uw;
        let d = (1.0 + 2.0 * c * uv + c2 * u2 * v2).max(MIN_DENOM);

        Ok(w.iter()
            .zip(u.iter().zip(v.iter()))
            .map(|(&wi, (&ui, &vi))| wi + 2.0 * (a * ui + b * vi) / d)
            .collect())
    }

    // ─────────────────────────────────────────────
    // Exponential / logarithmic maps
    // ─────────────────────────────────────────────

    /// Exponential map at the origin: `tanh(√c‖v‖) · v/(√c‖v‖)`.
    ///
    /// # Errors
    ///
    /// [`HypError::NonFinite`] if `v` has a NaN or infinite coordinate.
    pub fn exp_map_zero(&self, v: &[f64]) -> Result<Vec<f64>> {
        if !is_finite(v) {
            return Err(HypError::NonFinite { context: "tangent vector" });
        }
        let n = norm(v);
        if n < MIN_NORM {
            return Ok(zeros(v.len()));
        }
        let coeff = (self.sqrt_c * n).tanh() / (self.sqrt_c * n);
        self.ensure(self.project(&scale(v, coeff))?)
    }

    /// Logarithmic map at the origin: `atanh(√c‖y‖) · y/(√c‖y‖)`.
    ///
    /// # Errors
    ///
    /// [`HypError::OutOfBall`] if `y` is not a valid point.
    pub fn log_map_zero(&self, y: &[f64]) -> Result<Vec<f64>> {
        self.check_point(y)?;
        let n = norm(y);
        if n < MIN_NORM {
            return Ok(zeros(y.len()));
        }
        // `check_point` keeps √c‖y‖ below 1; the cap only absorbs rounding.
        let arg = (self.sqrt_c * n).min(ATANH_ROUNDING_CAP);
        Ok(scale(y, arg.atanh() / (self.sqrt_c * n)))
    }

    /// Exponential map at `base` in direction `tangent`.
    pub fn exp_map(&self, base: &[f64], tangent: &[f64]) -> Result<Vec<f64>> {
        check_dims(base, tangent)?;
        if !is_finite(base) || !is_finite(tangent) {
            return Err(HypError::NonFinite { context: "exponential map input" });
        }
        if norm(base) < MIN_NORM {
            return self.exp_map_zero(tangent);
        }
        let n = norm(tangent);
        if n < MIN_NORM {
            return self.project(base);
        }
        let lambda = self.conformal_factor(base);
        let coeff = (self.sqrt_c * lambda * n / 2.0).tanh() / (self.sqrt_c * n);
        let step = scale(tangent, coeff);
        self.ensure(self.project(&self.mobius_add_raw(base, &step))?)
    }

    /// Logarithmic map: tangent vector at `base` pointing at `point`.
    ///
    /// Inverse of [`exp_map`](Self::exp_map) up to rounding.
    pub fn log_map(&self, base: &[f64], point: &[f64]) -> Result<Vec<f64>> {
        check_dims(base, point)?;
        self.check_point(base)?;
        if norm(base) < MIN_NORM {
            return self.log_map_zero(point);
        }
        self.check_point(point)?;
        let w = self.mobius_add_raw(&neg(base), point);
        let n = norm(&w);
        if n < MIN_NORM {
            return Ok(zeros(base.len()));
        }
        let lambda = self.conformal_factor(base);
        let arg = (self.sqrt_c * n).min(ATANH_ROUNDING_CAP);
        let coeff = 2.0 / (self.sqrt_c * lambda) * arg.atanh() / n;
        Ok(scale(&w, coeff))
    }

    /// Move tangent vector `v` at `from` to the tangent space at `to` along
    /// the connecting geodesic.
    ///
    /// Preserves the Riemannian inner product `λ²⟨·,·⟩`, not the Euclidean norm.
    pub fn parallel_transport(&self, from: &[f64], to: &[f64], v: &[f64]) -> Result<Vec<f64>> {
        check_dims(from, to)?;
        check_dims(from, v)?;
        self.check_point(from)?;
        self.check_point(to)?;
        let rotated = self.gyration(to, &neg(from), v)?;
        let ratio = self.conformal_factor(from) / self.conformal_factor(to);
        Ok(scale(&rotated, ratio))
    }

    /// Transport from the origin: `(1 − c‖to‖²) · v`.
    pub fn parallel_transport_from_origin(&self, to: &[f64], v: &[f64]) -> Result<Vec<f64>> {
        check_dims(to, v)?;
        self.check_point(to)?;
        Ok(scale(v, 1.0 - self.c * norm_sq(to)))
    }

    // ─────────────────────────────────────────────
    // Means
    // ─────────────────────────────────────────────

    /// Weighted average taken in the tangent space at the origin.
    ///
    /// `log₀` every point, average with the (normalised) weights, `exp₀` back.
    /// This is the cheap approximation of a Möbius average; it is exact only
    /// for points on a common geodesic through the origin. `weights = None`
    /// means uniform.
    pub fn tangent_midpoint(&self, points: &[&[f64]], weights: Option<&[f64]>) -> Result<Vec<f64>> {
        let sum = weighted_tangent_sum(points, weights, |p| self.log_map_zero(p))?;
        self.exp_map_zero(&sum)
    }

    /// Iterative Karcher mean.
    ///
    /// Starts from [`tangent_midpoint`](Self::tangent_midpoint) and repeats
    /// `μ ← exp_μ(Σ wᵢ log_μ(pᵢ) / Σ wᵢ)` until the step is below `tol` or
    /// `max_iter` refinements have run.
    pub fn frechet_mean(
        &self,
        points: &[&[f64]],
        weights: Option<&[f64]>,
        max_iter: usize,
        tol: f64,
    ) -> Result<FrechetMean> {
        let mut mu = self.tangent_midpoint(points, weights)?;

        for iter in 0..max_iter {
            let step = weighted_tangent_sum(points, weights, |p| self.log_map(&mu, p))?;
            if norm(&step) < tol {
                return Ok(FrechetMean { point: mu, iterations: iter, converged: true });
            }
            mu = self.exp_map(&mu, &step)?;
        }

        tracing::debug!(max_iter, tol, "Karcher mean hit the iteration bound");
        Ok(FrechetMean { point: mu, iterations: max_iter, converged: false })
    }
}

/// `Σ wᵢ f(pᵢ) / Σ wᵢ` with the shared validation of the mean helpers.
pub(crate) fn weighted_tangent_sum<F>(
    points: &[&[f64]],
    weights: Option<&[f64]>,
    mut to_tangent: F,
) -> Result<Vec<f64>>
where
    F: FnMut(&[f64]) -> Result<Vec<f64>>,
{
    let first = points.first().ok_or(HypError::NullInput)?;
    let dim = first.len();

    if let Some(w) = weights {
        if w.len() != points.len() {
            return Err(HypError::DimensionMismatch { expected: points.len(), got: w.len() });
        }
        if !is_finite(w) || w.iter().any(|&x| x < 0.0) {
            return Err(HypError::NonFinite { context: "mean weights" });
        }
    }

    let total: f64 = match weights {
        Some(w) => w.iter().sum(),
        None => points.len() as f64,
    };
    if total < MIN_NORM {
        return Err(HypError::NullInput);
    }

    let mut sum = zeros(dim);
    for (i, &p) in points.iter().enumerate() {
        if p.len() != dim {
            return Err(HypError::DimensionMismatch { expected: dim, got: p.len() });
        }
        let w = weights.map_or(1.0, |w| w[i]);
        if w == 0.0 {
            continue;
        }
        let t = to_tangent(p)?;
        for (s, ti) in sum.iter_mut().zip(t.iter()) {
            *s += w * ti;
        }
    }
    for s in sum.iter_mut() {
        *s /= total;
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball() -> PoincareBall {
        PoincareBall::UNIT
    }

    fn close(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < tol)
    }

    // ── construction ───────────────────────────

    #[test]
    fn rejects_non_negative_curvature() {
        assert!(matches!(PoincareBall::new(0.0), Err(HypError::InvalidCurvature { .. })));
        assert!(matches!(PoincareBall::new(0.5), Err(HypError::InvalidCurvature { .. })));
        assert!(PoincareBall::new(f64::NAN).is_err());
        assert!(PoincareBall::new(-2.0).is_ok());
    }

    #[test]
    fn limit_never_exceeds_unit_ball() {
        let flat = PoincareBall::new(-0.25).unwrap(); // radius 2
        assert_eq!(flat.limit(), 1.0);
        let steep = PoincareBall::new(-4.0).unwrap(); // radius 0.5
        assert!((steep.limit() - 0.5).abs() < 1e-15);
    }

    // ── mobius_add ──────────────────────────────

    #[test]
    fn mobius_add_with_origin_is_identity() {
        let v = [0.3, -0.2, 0.5];
        let r = ball().mobius_add(&v, &[0.0; 3]).unwrap();
        assert!(close(&r, &v, 1e-10));
        let l = ball().mobius_add(&[0.0; 3], &v).unwrap();
        assert!(close(&l, &v, 1e-10));
    }

    #[test]
    fn mobius_add_concrete_pair_stays_inside() {
        let r = ball().mobius_add(&[0.3, 0.4], &[0.1, 0.6]).unwrap();
        assert!(norm(&r) < 1.0, "‖p1 ⊕ p2‖ = {}", norm(&r));
        // Hand-computed: ([0.573+0.075, 0.764+0.45]) / 1.6325
        assert!((r[0] - 0.648 / 1.6325).abs() < 1e-12);
        assert!((r[1] - 1.214 / 1.6325).abs() < 1e-12);
    }

    #[test]
    fn mobius_add_left_cancellation() {
        let u = [0.2, 0.5];
        let v = [-0.4, 0.1];
        let uv = ball().mobius_add(&u, &v).unwrap();
        let back = ball().mobius_add(&neg(&u), &uv).unwrap();
        assert!(close(&back, &v, 1e-10));
    }

    #[test]
    fn mobius_add_near_boundary_clamped() {
        let r = ball().mobius_add(&[0.99999, 0.0], &[0.99999, 0.0]).unwrap();
        assert!(norm(&r) < 1.0);
        assert!(ball().contains(&r));
    }

    #[test]
    fn mobius_add_dimension_mismatch() {
        let err = ball().mobius_add(&[0.1, 0.2], &[0.1]).unwrap_err();
        assert_eq!(err, HypError::DimensionMismatch { expected: 2, got: 1 });
    }

    // ── mobius_scalar_mult ─────────────────────

    #[test]
    fn scalar_zero_and_zero_vector_give_origin() {
        let b = ball();
        assert_eq!(b.mobius_scalar_mult(0.0, &[0.3, 0.4]).unwrap(), vec![0.0, 0.0]);
        assert_eq!(b.mobius_scalar_mult(3.0, &[0.0, 0.0]).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn scalar_one_is_identity_and_two_is_self_sum() {
        let b = ball();
        let v = [0.2, -0.3];
        assert!(close(&b.mobius_scalar_mult(1.0, &v).unwrap(), &v, 1e-12));
        let twice = b.mobius_scalar_mult(2.0, &v).unwrap();
        let sum = b.mobius_add(&v, &v).unwrap();
        assert!(close(&twice, &sum, 1e-10));
    }

    #[test]
    fn scalar_rejects_non_finite() {
        assert!(ball().mobius_scalar_mult(f64::NAN, &[0.1]).is_err());
    }

    // ── distance ───────────────────────────────

    #[test]
    fn distance_concrete_pair() {
        let b = ball();
        let p1 = [0.3, 0.4];
        let p2 = [0.1, 0.6];
        let d = b.distance(&p1, &p2).unwrap();
        assert!(d.is_finite() && d > 0.0);
        assert!(b.distance(&p1, &p1).unwrap().abs() < 1e-12);
    }

    #[test]
    fn distance_from_origin_matches_closed_form() {
        // d(0, x) = 2 atanh(‖x‖)
        let d = ball().distance(&[0.0, 0.0], &[0.5, 0.0]).unwrap();
        assert!((d - 2.0 * 0.5_f64.atanh()).abs() < 1e-12);
    }

    #[test]
    fn distance_matches_acosh_form() {
        let u: [f64; 2] = [0.1, 0.2];
        let v: [f64; 2] = [0.3, -0.1];
        let diff_sq: f64 = u.iter().zip(v.iter()).map(|(a, b)| (a - b).powi(2)).sum();
        let expected = (1.0 + 2.0 * diff_sq / ((1.0 - norm_sq(&u)) * (1.0 - norm_sq(&v)))).acosh();
        let d = ball().distance(&u, &v).unwrap();
        assert!((d - expected).abs() < 1e-10, "{d} vs {expected}");
    }

    #[test]
    fn distance_finite_at_clamp_radius() {
        let b = ball();
        let a = b.project(&[1.0, 0.0]).unwrap();
        let z = b.project(&[-1.0, 0.0]).unwrap();
        assert!(b.distance(&a, &z).unwrap().is_finite());
    }

    #[test]
    fn distance_scales_with_curvature() {
        let steep = PoincareBall::new(-4.0).unwrap();
        let d_unit = ball().distance(&[0.0, 0.0], &[0.2, 0.0]).unwrap();
        let d_steep = steep.distance(&[0.0, 0.0], &[0.2, 0.0]).unwrap();
        assert!((d_steep - 0.4_f64.atanh()).abs() < 1e-12);
        assert!(d_steep > d_unit);
    }

    // ── exp / log ──────────────────────────────

    #[test]
    fn exp_map_zero_always_inside_ball() {
        for s in [0.01, 0.1, 1.0, 10.0, 100.0, 1e6] {
            let x = ball().exp_map_zero(&[s, s, s]).unwrap();
            assert!(norm(&x) < 1.0, "exp₀({s}) escaped: {}", norm(&x));
        }
    }

    #[test]
    fn exp_map_at_origin_is_fast_path() {
        let v = [0.4, -0.1];
        let general = ball().exp_map(&[0.0, 0.0], &v).unwrap();
        assert!(close(&general, &ball().exp_map_zero(&v).unwrap(), 1e-15));
    }

    #[test]
    fn exp_map_rejects_non_finite_input() {
        let b = ball();
        assert!(matches!(b.exp_map_zero(&[f64::NAN, 0.0]), Err(HypError::NonFinite { .. })));
        assert!(matches!(b.exp_map(&[0.1, 0.0], &[f64::INFINITY, 0.0]), Err(HypError::NonFinite { .. })));
    }

    #[test]
    fn exp_log_roundtrip_off_origin() {
        let b = PoincareBall::new(-1.5).unwrap();
        let p = [0.2, -0.3, 0.1];
        let q = [-0.4, 0.25, 0.3];
        let t = b.log_map(&p, &q).unwrap();
        let back = b.exp_map(&p, &t).unwrap();
        assert!(close(&back, &q, 1e-10));
    }

    #[test]
    fn exp_log_roundtrip_near_boundary() {
        let b = ball();
        let p = [0.999, 0.0];
        for q in [[0.0, 0.999], [-0.999, 0.0], [0.0, -0.9999]] {
            let t = b.log_map(&p, &q).unwrap();
            let back = b.exp_map(&p, &t).unwrap();
            assert!(close(&back, &q, 1e-6), "{back:?} vs {q:?}");
        }
        let y = [0.0, 0.99999];
        let back = b.exp_map_zero(&b.log_map_zero(&y).unwrap()).unwrap();
        assert!(close(&back, &y, 1e-9), "{back:?}");
    }

    #[test]
    fn log_map_of_base_is_zero() {
        let p = [0.3, 0.2];
        assert!(norm(&ball().log_map(&p, &p).unwrap()) < 1e-14);
    }

    #[test]
    fn log_map_rejects_outside_ball() {
        assert!(matches!(
            ball().log_map_zero(&[0.8, 0.8]),
            Err(HypError::OutOfBall { .. })
        ));
        assert!(ball().log_map(&[0.1, 0.0], &[1.0, 0.0]).is_err());
    }

    #[test]
    fn log_map_norm_matches_distance() {
        // ‖log_p(q)‖_p = λ_p ‖log_p(q)‖ = d(p, q)
        let b = ball();
        let p = [0.1, 0.4];
        let q = [-0.3, 0.2];
        let t = b.log_map(&p, &q).unwrap();
        let riemannian_len = b.conformal_factor(&p) * norm(&t);
        assert!((riemannian_len - b.distance(&p, &q).unwrap()).abs() < 1e-10);
    }

    // ── transport ──────────────────────────────

    #[test]
    fn transport_preserves_riemannian_norm() {
        let b = ball();
        let from = [0.1, 0.2, -0.1];
        let to = [-0.5, 0.3, 0.2];
        let v = [0.7, -0.2, 0.4];
        let moved = b.parallel_transport(&from, &to, &v).unwrap();
        let before = b.conformal_factor(&from) * norm(&v);
        let after = b.conformal_factor(&to) * norm(&moved);
        assert!((before - after).abs() < 1e-10, "{before} vs {after}");
        // Euclidean magnitude changes when the conformal factors differ.
        assert!((norm(&v) - norm(&moved)).abs() > 1e-3);
    }

    #[test]
    fn transport_from_origin_matches_general_form() {
        let b = PoincareBall::new(-2.0).unwrap();
        let to = [0.3, -0.2];
        let v = [1.0, 0.5];
        let general = b.parallel_transport(&[0.0, 0.0], &to, &v).unwrap();
        let fast = b.parallel_transport_from_origin(&to, &v).unwrap();
        assert!(close(&general, &fast, 1e-12));
    }

    #[test]
    fn transport_to_same_point_is_identity() {
        let p = [0.3, -0.4];
        let v = [0.2, 0.9];
        let moved = ball().parallel_transport(&p, &p, &v).unwrap();
        assert!(close(&moved, &v, 1e-12));
    }

    #[test]
    fn gyration_is_isometry() {
        let g = ball().gyration(&[0.3, 0.1], &[-0.2, 0.5], &[1.5, -0.7]).unwrap();
        assert!((norm(&g) - norm(&[1.5, -0.7])).abs() < 1e-12);
    }

    // ── projection ─────────────────────────────

    #[test]
    fn project_is_idempotent() {
        let b = ball();
        for v in [[0.9, 0.9], [5.0, -3.0], [0.99999, 0.0], [0.3, 0.4]] {
            let once = b.project(&v).unwrap();
            let twice = b.project(&once).unwrap();
            assert_eq!(once, twice);
            assert!(norm(&once) < 1.0);
        }
    }

    #[test]
    fn project_keeps_direction_of_huge_and_infinite_vectors() {
        let b = ball();
        let p = b.project(&[1e200, 1e200]).unwrap();
        assert!(b.contains(&p));
        assert!((norm(&p) - b.max_norm()).abs() < 1e-9);
        assert!((p[0] - p[1]).abs() < 1e-15);

        let q = b.project(&[f64::INFINITY, 0.0]).unwrap();
        assert!(b.contains(&q));
        assert!(q[0] > 0.99 && q[1] == 0.0);
        let r = b.project(&[f64::NEG_INFINITY, 3.0, f64::INFINITY]).unwrap();
        assert!(r[0] < 0.0 && r[1] == 0.0 && r[2] > 0.0);
    }

    #[test]
    fn nan_input_surfaces_non_finite() {
        let b = ball();
        assert!(matches!(b.project(&[f64::NAN, 0.0]), Err(HypError::NonFinite { .. })));
        assert!(matches!(b.mobius_add(&[f64::NAN, 0.0], &[0.1, 0.0]), Err(HypError::NonFinite { .. })));
        assert!(matches!(b.mobius_add(&[0.1, 0.0], &[f64::INFINITY, 0.0]), Err(HypError::NonFinite { .. })));
        assert!(matches!(b.mobius_scalar_mult(2.0, &[f64::NAN]), Err(HypError::NonFinite { .. })));
    }

    #[test]
    fn ensure_surfaces_out_of_ball() {
        let b = ball();
        assert!(b.ensure(vec![0.3, 0.4]).is_ok());
        assert!(matches!(b.ensure(vec![0.8, 0.8]), Err(HypError::OutOfBall { .. })));
        assert!(matches!(b.ensure(vec![f64::NAN]), Err(HypError::NonFinite { .. })));
    }

    // ── means ──────────────────────────────────

    #[test]
    fn tangent_midpoint_of_opposite_points_is_origin() {
        let p = [0.3, 0.4];
        let q = neg(&p);
        let mid = ball().tangent_midpoint(&[&p, &q], None).unwrap();
        assert!(norm(&mid) < 1e-12);
    }

    #[test]
    fn tangent_midpoint_validates_weights() {
        let p = [0.3, 0.4];
        assert_eq!(ball().tangent_midpoint(&[], None).unwrap_err(), HypError::NullInput);
        assert!(matches!(
            ball().tangent_midpoint(&[&p], Some(&[1.0, 2.0])),
            Err(HypError::DimensionMismatch { .. })
        ));
        assert_eq!(
            ball().tangent_midpoint(&[&p], Some(&[0.0])).unwrap_err(),
            HypError::NullInput
        );
    }

    #[test]
    fn frechet_mean_is_equidistant_for_two_points() {
        let b = ball();
        let p = [0.5, 0.1];
        let q = [0.1, 0.6];
        let mean = b.frechet_mean(&[&p, &q], None, 32, 1e-10).unwrap();
        assert!(mean.converged);
        let dp = b.distance(&mean.point, &p).unwrap();
        let dq = b.distance(&mean.point, &q).unwrap();
        assert!((dp - dq).abs() < 1e-8, "{dp} vs {dq}");
    }

    #[test]
    fn frechet_mean_reports_iteration_bound() {
        let p = [0.5, 0.1];
        let q = [0.1, 0.6];
        let mean = ball().frechet_mean(&[&p, &q], None, 0, 1e-12).unwrap();
        assert!(!mean.converged);
        assert_eq!(mean.iterations, 0);
    }

    #[test]
    fn serde_roundtrip_validates_curvature() {
        let b = PoincareBall::new(-0.5).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "-0.5");
        let back: PoincareBall = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(serde_json::from_str::<PoincareBall>("1.0").is_err());
    }
}
