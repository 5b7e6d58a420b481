use lobachevsky_hyp_ops::HypError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid layer dimension: in={in_dim}, out={out_dim} (both must be > 0)")]
    InvalidDimension { in_dim: usize, out_dim: usize },

    #[error("null input: {0}")]
    NullInput(&'static str),

    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("edge ({from}, {to}) out of range for {nodes} nodes")]
    EdgeOutOfRange { from: usize, to: usize, nodes: usize },

    #[error("layer output left the ball: ‖x‖ = {norm:.6}")]
    OutOfBall { norm: f64 },

    #[error("hyperbolic op failed: {0}")]
    Hyp(HypError),
}

/// Lift the shared cases onto the layer-level variants so callers match one set.
impl From<HypError> for LayerError {
    fn from(err: HypError) -> Self {
        match err {
            HypError::DimensionMismatch { expected, got } => {
                LayerError::DimensionMismatch { expected, got }
            }
            HypError::OutOfBall { norm } => LayerError::OutOfBall { norm },
            HypError::NullInput => LayerError::NullInput("empty point set"),
            other => LayerError::Hyp(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
