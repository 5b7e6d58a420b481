//! # Geometry selection
//!
//! [`Manifold`] is what layers and the trainer actually hold. It dispatches
//! every primitive either to a [`PoincareBall`] or to its flat `c → 0` limit:
//!
//! | Primitive | Euclidean limit |
//! |---|---|
//! | `u ⊕ v` | `u + v` |
//! | `t ⊗ v` | `t · v` |
//! | `exp₀`, `log₀` | identity |
//! | `d(u, v)` | `2‖u − v‖` |
//! | `λₓ` | `2` |
//! | parallel transport | identity |
//!
//! Points are clamped to the unit ball in both modes, so switching geometry
//! never produces an embedding that violates `‖x‖ < 1`.

use crate::ball::{weighted_tangent_sum, FrechetMean, PoincareBall};
use crate::error::{HypError, Result};
use crate::vector::{add, check_dims, euclidean_distance, is_finite, norm, scale, sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Manifold {
    /// Flat limit, points still clamped to the unit ball.
    Euclidean,
    Poincare(PoincareBall),
}

impl Default for Manifold {
    fn default() -> Self {
        Manifold::Poincare(PoincareBall::UNIT)
    }
}

impl From<PoincareBall> for Manifold {
    fn from(ball: PoincareBall) -> Self {
        Manifold::Poincare(ball)
    }
}

impl Manifold {
    /// Ball to use for clamping. The flat mode borrows the unit ball.
    #[inline]
    fn clamp_ball(&self) -> PoincareBall {
        match self {
            Manifold::Euclidean => PoincareBall::UNIT,
            Manifold::Poincare(b) => *b,
        }
    }

    /// Signed curvature; `0.0` in flat mode.
    pub fn curvature(&self) -> f64 {
        match self {
            Manifold::Euclidean => 0.0,
            Manifold::Poincare(b) => b.curvature(),
        }
    }

    pub fn is_hyperbolic(&self) -> bool {
        matches!(self, Manifold::Poincare(_))
    }

    pub fn max_norm(&self) -> f64 {
        self.clamp_ball().max_norm()
    }

    pub fn contains(&self, v: &[f64]) -> bool {
        self.clamp_ball().contains(v)
    }

    pub fn project(&self, v: &[f64]) -> Result<Vec<f64>> {
        self.clamp_ball().project(v)
    }

    /// [`project`](Self::project) every row, failing on the first NaN.
    pub fn project_all(&self, xs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        xs.iter().map(|x| self.project(x)).collect()
    }

    pub fn ensure(&self, v: Vec<f64>) -> Result<Vec<f64>> {
        self.clamp_ball().ensure(v)
    }

    pub fn conformal_factor(&self, x: &[f64]) -> f64 {
        match self {
            Manifold::Euclidean => 2.0,
            Manifold::Poincare(b) => b.conformal_factor(x),
        }
    }

    pub fn mobius_add(&self, u: &[f64], v: &[f64]) -> Result<Vec<f64>> {
        match self {
            Manifold::Euclidean => {
                require_finite(u, "Möbius operand")?;
                require_finite(v, "Möbius operand")?;
                self.project(&add(u, v)?)
            }
            Manifold::Poincare(b) => b.mobius_add(u, v),
        }
    }

    pub fn mobius_scalar_mult(&self, t: f64, v: &[f64]) -> Result<Vec<f64>> {
        match self {
            Manifold::Euclidean => {
                if !t.is_finite() {
                    return Err(HypError::NonFinite { context: "Möbius scalar" });
                }
                require_finite(v, "Möbius operand")?;
                self.project(&scale(v, t))
            }
            Manifold::Poincare(b) => b.mobius_scalar_mult(t, v),
        }
    }

    pub fn distance(&self, u: &[f64], v: &[f64]) -> Result<f64> {
        match self {
            Manifold::Euclidean => Ok(2.0 * euclidean_distance(u, v)?),
            Manifold::Poincare(b) => b.distance(u, v),
        }
    }

    pub fn exp_map_zero(&self, v: &[f64]) -> Result<Vec<f64>> {
        match self {
            Manifold::Euclidean => {
                require_finite(v, "tangent vector")?;
                self.project(v)
            }
            Manifold::Poincare(b) => b.exp_map_zero(v),
        }
    }

    pub fn log_map_zero(&self, y: &[f64]) -> Result<Vec<f64>> {
        match self {
            Manifold::Euclidean => self.ensure(y.to_vec()),
            Manifold::Poincare(b) => b.log_map_zero(y),
        }
    }

    pub fn exp_map(&self, base: &[f64], tangent: &[f64]) -> Result<Vec<f64>> {
        match self {
            Manifold::Euclidean => {
                require_finite(base, "exponential map input")?;
                require_finite(tangent, "exponential map input")?;
                self.project(&add(base, tangent)?)
            }
            Manifold::Poincare(b) => b.exp_map(base, tangent),
        }
    }

    pub fn log_map(&self, base: &[f64], point: &[f64]) -> Result<Vec<f64>> {
        match self {
            Manifold::Euclidean => {
                check_dims(base, point)?;
                self.ensure(base.to_vec())?;
                self.ensure(point.to_vec())?;
                sub(point, base)
            }
            Manifold::Poincare(b) => b.log_map(base, point),
        }
    }

    pub fn parallel_transport(&self, from: &[f64], to: &[f64], v: &[f64]) -> Result<Vec<f64>> {
        match self {
            Manifold::Euclidean => {
                check_dims(from, to)?;
                check_dims(from, v)?;
                Ok(v.to_vec())
            }
            Manifold::Poincare(b) => b.parallel_transport(from, to, v),
        }
    }

    pub fn tangent_midpoint(&self, points: &[&[f64]], weights: Option<&[f64]>) -> Result<Vec<f64>> {
        match self {
            Manifold::Euclidean => {
                let mean = weighted_tangent_sum(points, weights, |p| Ok(p.to_vec()))?;
                self.project(&mean)
            }
            Manifold::Poincare(b) => b.tangent_midpoint(points, weights),
        }
    }

    /// Karcher mean; in flat mode the weighted arithmetic mean is exact.
    pub fn frechet_mean(
        &self,
        points: &[&[f64]],
        weights: Option<&[f64]>,
        max_iter: usize,
        tol: f64,
    ) -> Result<FrechetMean> {
        match self {
            Manifold::Euclidean => Ok(FrechetMean {
                point: self.tangent_midpoint(points, weights)?,
                iterations: 0,
                converged: true,
            }),
            Manifold::Poincare(b) => b.frechet_mean(points, weights, max_iter, tol),
        }
    }
}

fn require_finite(v: &[f64], context: &'static str) -> Result<()> {
    if is_finite(v) {
        Ok(())
    } else {
        Err(HypError::NonFinite { context })
    }
}

// ─────────────────────────────────────────────
// Health checks
// ─────────────────────────────────────────────

/// Summary of how well a batch of points respects the ball invariant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifoldHealth {
    pub total: usize,
    pub non_finite: usize,
    pub outside: usize,
    /// Points between the clamp radius and the limit.
    pub near_boundary: usize,
    pub max_norm: f64,
    pub mean_norm: f64,
}

impl ManifoldHealth {
    pub fn is_healthy(&self) -> bool {
        self.non_finite == 0 && self.outside == 0
    }
}

/// Scan `points` and count invariant violations.
pub fn health_check<'a, I>(manifold: &Manifold, points: I) -> ManifoldHealth
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let ball = manifold.clamp_ball();
    let mut report = ManifoldHealth::default();
    let mut norm_sum = 0.0;

    for p in points {
        report.total += 1;
        if !is_finite(p) {
            report.non_finite += 1;
            continue;
        }
        let n = norm(p);
        norm_sum += n;
        report.max_norm = report.max_norm.max(n);
        if n >= ball.limit() {
            report.outside += 1;
        } else if n >= ball.max_norm() {
            report.near_boundary += 1;
        }
    }

    let finite = report.total - report.non_finite;
    if finite > 0 {
        report.mean_norm = norm_sum / finite as f64;
    }
    report
}
