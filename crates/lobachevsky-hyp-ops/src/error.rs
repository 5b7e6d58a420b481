//! Error types for hyperbolic operations.

/// Errors that can occur during hyperbolic geometry operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HypError {
    /// A point was outside the open unit ball (‖x‖ ≥ 1.0), or a produced
    /// point still reached the boundary after clamping.
    #[error("vector outside Poincaré ball: ‖x‖ = {norm:.6} ≥ 1.0")]
    OutOfBall { norm: f64 },

    /// Two inputs had incompatible dimensions.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Curvature must be a finite negative number.
    #[error("invalid curvature {curvature}: the Poincaré ball needs κ < 0")]
    InvalidCurvature { curvature: f64 },

    /// An operation received an empty input where at least one element is required.
    #[error("null input: at least one point is required")]
    NullInput,

    /// A coordinate or scalar was NaN or infinite.
    #[error("non-finite value in {context}")]
    NonFinite { context: &'static str },
}

pub type Result<T> = std::result::Result<T, HypError>;
