use lobachevsky_hyp_ops::HypError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("invalid generator parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("edge ({from}, {to}) out of range for {nodes} nodes")]
    EdgeOutOfRange { from: usize, to: usize, nodes: usize },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("node {index} outside the Poincaré ball: ‖x‖ = {norm:.6}")]
    OutOfBall { index: usize, norm: f64 },

    #[error("dataset has no nodes")]
    Empty,

    #[error("hyperbolic op failed: {0}")]
    Hyp(#[from] HypError),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
