//! # lobachevsky-hyp-ops
//!
//! Vector algebra and Möbius arithmetic for the Poincaré ball model.
//!
//! Every other Lobachevsky crate does its hyperbolic math through this one.
//!
//! ## Core operations
//!
//! | Item | Purpose |
//! |---|---|
//! | [`vector`] | Plain Euclidean algebra on `&[f64]` |
//! | [`PoincareBall`] | Möbius add/scale, exp/log maps, transport, distance, means |
//! | [`Manifold`] | Switch between the ball and its flat limit |
//! | [`Embedding`] | Validated point + metadata for consumers |
//! | [`project_to_ball`] | Clamp into the unit ball |
//! | [`validate_hyperbolic`] | Boolean ball check for API boundaries |
//!
//! ## Safety invariant
//!
//! Every point returned by this crate satisfies **‖x‖ < 1.0**. Inputs coming
//! from outside should be checked with [`validate_hyperbolic`] or
//! [`ensure_in_ball`]; tangent vectors carry no bound.

pub mod ball;
pub mod embedding;
pub mod error;
pub mod manifold;
pub mod vector;

pub use ball::{FrechetMean, PoincareBall};
pub use embedding::{now_unix_ms, Embedding};
pub use error::{HypError, Result};
pub use manifold::{health_check, Manifold, ManifoldHealth};

/// Boundary margin ε: points are clamped to `(1 − ε)` of the ball limit.
pub const BALL_EPS: f64 = 1e-5;

/// Below this norm a vector is treated as the origin.
pub const MIN_NORM: f64 = 1e-15;

/// Floor for denominators of the form `1 − c‖x‖²`.
pub(crate) const MIN_DENOM: f64 = 1e-15;

/// Relative margin under the clamp radius left by [`project_to_ball`].
pub(crate) const PROJECTION_MARGIN: f64 = 1e-10;

/// Cap on `atanh` arguments in the log maps, which only absorbs rounding.
/// [`PoincareBall::distance`] uses the coarser `1 − ε` instead.
pub(crate) const ATANH_ROUNDING_CAP: f64 = 1.0 - 1e-15;

/// Iteration bound for the Karcher mean used by batch normalisation.
pub const KARCHER_MAX_ITER: usize = 16;

/// Tangent-step tolerance for the Karcher mean.
pub const KARCHER_TOL: f64 = 1e-8;

// ─────────────────────────────────────────────
// Unit-ball shortcuts
// ─────────────────────────────────────────────

/// Rescale `v` to `(1 − ε) · v/‖v‖` when `‖v‖ ≥ 1 − ε`. Idempotent.
///
/// # Errors
///
/// [`HypError::NonFinite`] if `v` has a NaN coordinate.
pub fn project_to_ball(v: &[f64]) -> Result<Vec<f64>> {
    PoincareBall::UNIT.project(v)
}

/// True iff `v` is finite and `‖v‖ < 1`.
pub fn validate_hyperbolic(v: &[f64]) -> bool {
    PoincareBall::UNIT.contains(v)
}

/// Fail with [`HypError::OutOfBall`] unless `v` satisfies the ball invariant.
pub fn ensure_in_ball(v: &[f64]) -> Result<()> {
    PoincareBall::UNIT.ensure(v.to_vec()).map(|_| ())
}
