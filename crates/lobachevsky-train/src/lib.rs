//! # lobachevsky-train
//!
//! Owns a hyperbolic layer stack and fits it to graph datasets.
//!
//! ```text
//! DatasetGenerator ─▶ TrainingOrchestrator::train ─▶ Vec<Layer>::forward ─▶ Möbius ops
//!                     TrainingOrchestrator::predict  (read-only, same stack)
//! ```
//!
//! Loss per graph is a link term (edges pulled together, sampled non-edges
//! pushed past a margin) plus a weighted geometric regulariser (norm variance
//! and drift of geodesic distance from hop distance). Gradients are central
//! finite differences over each layer's tangent-space parameters, rescaled by
//! the inverse squared conformal factor before an SGD step.
//!
//! The geometry is selectable per orchestrator: Euclidean (curvature 0),
//! hyperbolic (fixed negative curvature) or adaptive (curvature learned once
//! per epoch).

pub mod auc;
pub mod cancel;
pub mod config;
pub mod error;
pub mod gradient;
pub mod insights;
pub mod loss;
pub mod orchestrator;
pub mod stack;

pub use auc::link_auc;
pub use cancel::CancellationToken;
pub use config::{GeometryMode, TrainConfig};
pub use error::{Result, TrainError};
pub use insights::{GeometricInsights, PredictResult};
pub use loss::{LossTargets, LossTerms};
pub use orchestrator::{
    ModelSnapshot, TrainingOrchestrator, TrainingOutcome, TrainingRecord, TrainingReport, TrainingState,
};
pub use stack::build_stack;
