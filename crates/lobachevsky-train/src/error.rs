use lobachevsky_dataset::DatasetError;
use lobachevsky_hyp_ops::HypError;
use lobachevsky_nn::LayerError;
use thiserror::Error;

use crate::orchestrator::TrainingState;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("invalid config: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("dataset dimension mismatch: stack expects {expected}, dataset has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("training diverged at epoch {epoch}: {reason}")]
    DivergedTraining { epoch: usize, reason: String },

    #[error("orchestrator busy (state {0:?})")]
    NotIdle(TrainingState),

    #[error("no datasets supplied")]
    NoData,

    #[error("layer error: {0}")]
    Layer(#[from] LayerError),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("hyperbolic op failed: {0}")]
    Hyp(#[from] HypError),

    #[error("snapshot serialisation failed: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrainError>;
