//! The training orchestrator.
//!
//! ## State machine
//!
//! ```text
//! Idle ──train()──▶ Training ──┬─▶ Converged ────────┐
//!                              ├─▶ MaxEpochsReached ─┼─▶ Idle
//!                              └─▶ (cancel / error) ─┘
//! ```
//!
//! ## One epoch
//!
//! For every dataset, in order:
//! 1. forward pass (train mode, fixed dropout step) and loss;
//! 2. central-difference gradient of each layer's tangent-space parameters;
//! 3. joint clip, conformal rescale at the layer's mean output norm, SGD step.
//!
//! The epoch's record holds the mean pre-step loss over datasets. In adaptive
//! mode the curvature is then nudged by a central difference of that loss.
//!
//! Any non-finite loss or parameter rolls the layers back to the start of the
//! epoch and surfaces [`TrainError::DivergedTraining`].

use lobachevsky_dataset::topology::sample_non_edges;
use lobachevsky_dataset::HyperbolicDataset;
use lobachevsky_hyp_ops::vector::is_finite;
use lobachevsky_hyp_ops::{now_unix_ms, Embedding, HypError, Manifold, PoincareBall};
use lobachevsky_nn::{
    forward_stack, forward_trace, stack_output_dim, ForwardContext, Layer, LayerError, NodeBatch,
    Parameterized,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auc::link_auc;
use crate::cancel::CancellationToken;
use crate::config::{GeometryMode, TrainConfig};
use crate::error::{Result, TrainError};
use crate::gradient::{central_difference, clip_global_norm, riemannian_scale, sgd_step};
use crate::insights::{self, PredictResult};
use crate::loss::{compute_loss, LossTargets, LossTerms};
use crate::stack::build_stack;

/// Upper bound on the curvature probe step.
const CURVATURE_PROBE: f64 = 1e-3;
/// Offset separating evaluation negatives from training negatives.
const EVAL_SEED_OFFSET: u64 = 0x5EED_0E7A;

// ─────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrainingState {
    Idle,
    Training,
    Converged,
    MaxEpochsReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrainingOutcome {
    Converged,
    MaxEpochsReached,
    Cancelled,
}

/// One completed epoch. Records are append-only; `epoch` counts across
/// `train` calls starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    pub epoch: usize,
    pub task_loss: f64,
    pub geometric_loss: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    pub outcome: TrainingOutcome,
    /// Epochs completed by this call.
    pub epochs_run: usize,
    /// Weighted total of the last completed epoch.
    pub final_loss: Option<f64>,
    /// Curvature in effect when the call returned.
    pub curvature: f64,
}

/// Everything needed to rebuild a predict-ready orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSnapshot {
    pub config: TrainConfig,
    pub geometry_mode: GeometryMode,
    pub learned_curvature: f64,
    pub layers: Vec<Layer>,
    pub records: Vec<TrainingRecord>,
}

impl ModelSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A graph ready for repeated forward passes within one `train` call.
struct Prepared {
    batch: NodeBatch,
    targets: LossTargets,
}

// ─────────────────────────────────────────────
// TrainingOrchestrator
// ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TrainingOrchestrator {
    config: TrainConfig,
    layers: Vec<Layer>,
    mode: GeometryMode,
    /// Ball for [`GeometryMode::Hyperbolic`], fixed by the config.
    configured: PoincareBall,
    /// Ball for [`GeometryMode::Adaptive`], updated once per epoch.
    learned: PoincareBall,
    state: TrainingState,
    records: Vec<TrainingRecord>,
    /// Gradient steps taken so far; seeds the dropout masks.
    step: u64,
}

impl TrainingOrchestrator {
    /// Validate `config` and build the default stack for it.
    pub fn new(config: TrainConfig) -> Result<Self> {
        config.validate()?;
        let layers = build_stack(&config)?;
        Self::from_parts(config, layers)
    }

    /// Use an explicit layer stack. The stack must accept `config.input_dim()`.
    pub fn from_parts(config: TrainConfig, layers: Vec<Layer>) -> Result<Self> {
        config.validate()?;
        stack_output_dim(&layers, config.input_dim())?;
        let configured = PoincareBall::new(config.curvature)?;
        Ok(Self {
            mode: config.geometry_mode,
            configured,
            learned: configured,
            config,
            layers,
            state: TrainingState::Idle,
            records: Vec::new(),
            step: 0,
        })
    }

    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self> {
        let mut orch = Self::from_parts(snapshot.config, snapshot.layers)?;
        orch.mode = snapshot.geometry_mode;
        orch.learned = PoincareBall::new(snapshot.learned_curvature)?;
        orch.records = snapshot.records;
        Ok(orch)
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            config: self.config.clone(),
            geometry_mode: self.mode,
            learned_curvature: self.learned.curvature(),
            layers: self.layers.clone(),
            records: self.records.clone(),
        }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    pub fn records(&self) -> &[TrainingRecord] {
        &self.records
    }

    pub fn geometry_mode(&self) -> GeometryMode {
        self.mode
    }

    /// Geometry the next forward pass will use.
    pub fn manifold(&self) -> Manifold {
        match self.mode {
            GeometryMode::Euclidean => Manifold::Euclidean,
            GeometryMode::Hyperbolic => Manifold::Poincare(self.configured),
            GeometryMode::Adaptive => Manifold::Poincare(self.learned),
        }
    }

    /// Effective curvature: 0 in Euclidean mode.
    pub fn curvature(&self) -> f64 {
        self.manifold().curvature()
    }

    /// Switch geometry for subsequent passes. Earlier outputs are untouched,
    /// and the learned curvature survives a round trip through other modes.
    pub fn set_geometry_mode(&mut self, mode: GeometryMode) -> Result<()> {
        if self.state != TrainingState::Idle {
            return Err(TrainError::NotIdle(self.state));
        }
        if mode != self.mode {
            debug!(from = %self.mode, to = %mode, "geometry mode switched");
        }
        self.mode = mode;
        Ok(())
    }

    // ── Training ───────────────────────────────

    pub fn train(&mut self, datasets: &[HyperbolicDataset]) -> Result<TrainingReport> {
        self.train_with_cancel(datasets, &CancellationToken::new())
    }

    /// Like [`train`](Self::train), stopping at the first epoch boundary after
    /// `cancel` fires.
    pub fn train_with_cancel(
        &mut self,
        datasets: &[HyperbolicDataset],
        cancel: &CancellationToken,
    ) -> Result<TrainingReport> {
        if self.state != TrainingState::Idle {
            return Err(TrainError::NotIdle(self.state));
        }
        if datasets.is_empty() {
            return Err(TrainError::NoData);
        }
        for ds in datasets {
            self.check_dim(ds)?;
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(self.records.len() as u64));
        let negatives = self.config.negative_samples;
        let prepared = datasets
            .iter()
            .map(|ds| -> Result<Prepared> {
                Ok(Prepared {
                    batch: NodeBatch::new(ds.nodes().to_vec(), ds.edges())?,
                    targets: LossTargets::build(ds, negatives, &mut rng),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            datasets = datasets.len(),
            max_epochs = self.config.max_epochs,
            mode = %self.mode,
            curvature = self.curvature(),
            "training started"
        );
        self.state = TrainingState::Training;
        let result = self.run_epochs(&prepared, cancel);
        self.state = TrainingState::Idle;

        if let Ok(report) = &result {
            info!(
                outcome = ?report.outcome,
                epochs = report.epochs_run,
                final_loss = report.final_loss,
                curvature = report.curvature,
                "training finished"
            );
        }
        result
    }

    fn run_epochs(&mut self, prepared: &[Prepared], cancel: &CancellationToken) -> Result<TrainingReport> {
        let mut previous: Option<f64> = None;
        let mut stale = 0usize;

        for run in 0..self.config.max_epochs {
            if cancel.is_cancelled() {
                warn!(epochs = run, "training cancelled");
                return Ok(self.report(TrainingOutcome::Cancelled, run, previous));
            }

            let epoch = self.records.len() + 1;
            let saved_layers = self.layers.clone();
            let saved_curvature = self.learned;
            let terms = match self.run_epoch(prepared, epoch) {
                Ok(terms) => terms,
                Err(err) => {
                    self.layers = saved_layers;
                    self.learned = saved_curvature;
                    let err = into_divergence(err, epoch);
                    warn!(epoch, error = %err, "epoch failed, parameters rolled back");
                    return Err(err);
                }
            };

            self.records.push(TrainingRecord {
                epoch,
                task_loss: terms.task,
                geometric_loss: terms.geometric,
                timestamp: now_unix_ms(),
            });
            let total = terms.total(self.config.geometric_weight);
            debug!(epoch, task = terms.task, geometric = terms.geometric, total, "epoch complete");

            match previous {
                Some(prev) if prev - total < self.config.convergence_threshold => stale += 1,
                _ => stale = 0,
            }
            previous = Some(total);
            if stale >= self.config.patience {
                self.state = TrainingState::Converged;
                return Ok(self.report(TrainingOutcome::Converged, run + 1, previous));
            }
        }

        self.state = TrainingState::MaxEpochsReached;
        Ok(self.report(TrainingOutcome::MaxEpochsReached, self.config.max_epochs, previous))
    }

    fn report(&self, outcome: TrainingOutcome, epochs_run: usize, final_loss: Option<f64>) -> TrainingReport {
        TrainingReport { outcome, epochs_run, final_loss, curvature: self.curvature() }
    }

    fn run_epoch(&mut self, prepared: &[Prepared], epoch: usize) -> Result<LossTerms> {
        let manifold = self.manifold();
        let mut sum = LossTerms::default();
        for data in prepared {
            self.step += 1;
            let terms = self.gradient_step(&manifold, data, epoch)?;
            sum.task += terms.task;
            sum.geometric += terms.geometric;
        }
        let n = prepared.len() as f64;
        let mean = LossTerms { task: sum.task / n, geometric: sum.geometric / n };

        if self.mode == GeometryMode::Adaptive {
            self.update_curvature(prepared, epoch)?;
        }
        Ok(mean)
    }

    /// One SGD step on one graph. Returns the loss before the step.
    fn gradient_step(&mut self, manifold: &Manifold, data: &Prepared, epoch: usize) -> Result<LossTerms> {
        let step = self.step;
        let margin = self.config.margin;
        let weight = self.config.geometric_weight;
        let eps = self.config.grad_epsilon;

        let mut ctx = ForwardContext::train(step);
        let trace = forward_trace(&self.layers, manifold, &data.batch, &mut ctx)?;
        let terms = match trace.last() {
            Some(out) => compute_loss(manifold, out.nodes(), &data.targets, margin)?,
            None => {
                let projected = manifold.project_all(data.batch.nodes())?;
                compute_loss(manifold, &projected, &data.targets, margin)?
            }
        };
        if !terms.is_finite() {
            return Err(TrainError::DivergedTraining { epoch, reason: "non-finite loss".into() });
        }
        let mean_norms: Vec<f64> = trace.iter().map(NodeBatch::mean_norm).collect();

        let layers = &mut self.layers;
        let mut grads = Vec::with_capacity(layers.len());
        for l in 0..layers.len() {
            let params = layers[l].params();
            if params.is_empty() {
                grads.push(Vec::new());
                continue;
            }
            let grad = central_difference(&params, eps, |probe| {
                layers[l].set_params(probe)?;
                evaluate(layers, manifold, data, step, margin, weight)
            });
            layers[l].set_params(&params)?;
            grads.push(grad?);
        }

        let grad_norm = clip_global_norm(&mut grads, self.config.max_grad_norm);
        if !grad_norm.is_finite() {
            return Err(TrainError::DivergedTraining { epoch, reason: "non-finite gradient".into() });
        }

        for (l, grad) in grads.iter().enumerate() {
            if grad.is_empty() {
                continue;
            }
            let scale = riemannian_scale(manifold, mean_norms[l]);
            let updated = sgd_step(&layers[l].params(), grad, self.config.learning_rate, scale);
            if !is_finite(&updated) {
                return Err(TrainError::DivergedTraining {
                    epoch,
                    reason: format!("non-finite parameters in layer {l} ({})", layers[l].name()),
                });
            }
            layers[l].set_params(&updated)?;
        }
        Ok(terms)
    }

    /// Central difference of the mean loss in κ, then a clamped descent step.
    fn update_curvature(&mut self, prepared: &[Prepared], epoch: usize) -> Result<()> {
        let kappa = self.learned.curvature();
        let h = CURVATURE_PROBE.min(kappa.abs() / 2.0);
        let loss_at = |k: f64| -> Result<f64> {
            let m = Manifold::Poincare(PoincareBall::new(k)?);
            let mut total = 0.0;
            for data in prepared {
                total += evaluate(&self.layers, &m, data, self.step, self.config.margin, self.config.geometric_weight)?;
            }
            Ok(total / prepared.len() as f64)
        };
        let grad = (loss_at(kappa + h)? - loss_at(kappa - h)?) / (2.0 * h);
        let next = (kappa - self.config.curvature_learning_rate * grad)
            .clamp(self.config.min_curvature, self.config.max_curvature);
        if !next.is_finite() {
            return Err(TrainError::DivergedTraining { epoch, reason: "non-finite curvature".into() });
        }
        self.learned = PoincareBall::new(next)?;
        debug!(epoch, from = kappa, to = next, grad, "curvature updated");
        Ok(())
    }

    // ── Inference ──────────────────────────────

    /// Inference pass. Never mutates the orchestrator.
    pub fn predict(&self, dataset: &HyperbolicDataset) -> Result<PredictResult> {
        let manifold = self.manifold();
        let (embeddings, margins) = self.embed(&manifold, dataset)?;
        let confidence = insights::confidence(&manifold, &embeddings, &dataset.adjacency(), margins.as_deref())?;
        let geometric_insights = insights::geometric_insights(&manifold, &embeddings, dataset)?;
        debug!(
            nodes = embeddings.len(),
            hierarchy_depth = geometric_insights.hierarchy_depth,
            "prediction complete"
        );
        Ok(PredictResult { embeddings, confidence, geometric_insights })
    }

    /// [`predict`](Self::predict) stamped as [`Embedding`] records.
    pub fn predict_embeddings(&self, dataset: &HyperbolicDataset) -> Result<Vec<Embedding>> {
        self.predict(dataset)?.to_embeddings(&self.manifold())
    }

    /// AUC of `−d(u, v)` for the dataset's edges against an equal number of
    /// sampled non-edges. 0.5 when either side is empty.
    pub fn evaluate_link_prediction(&self, dataset: &HyperbolicDataset) -> Result<f64> {
        let manifold = self.manifold();
        let (x, _) = self.embed(&manifold, dataset)?;
        let adj = dataset.adjacency();
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(EVAL_SEED_OFFSET));
        let negatives = sample_non_edges(&adj, dataset.edges().len(), &mut rng);

        let score = |&(a, b): &(usize, usize)| manifold.distance(&x[a], &x[b]).map(|d| -d);
        let pos = dataset
            .edges()
            .iter()
            .filter(|(a, b)| a != b)
            .map(score)
            .collect::<std::result::Result<Vec<_>, HypError>>()?;
        let neg = negatives.iter().map(score).collect::<std::result::Result<Vec<_>, HypError>>()?;
        Ok(link_auc(&pos, &neg))
    }

    fn embed(&self, manifold: &Manifold, dataset: &HyperbolicDataset) -> Result<(Vec<Vec<f64>>, Option<Vec<f64>>)> {
        self.check_dim(dataset)?;
        let batch = NodeBatch::new(dataset.nodes().to_vec(), dataset.edges())?;
        let mut ctx = ForwardContext::infer();
        let out = forward_stack(&self.layers, manifold, &batch, &mut ctx)?;
        Ok((out.into_nodes(), ctx.take_margins()))
    }

    fn check_dim(&self, dataset: &HyperbolicDataset) -> Result<()> {
        let expected = self.config.input_dim();
        if dataset.dim() != expected {
            return Err(TrainError::DimensionMismatch { expected, got: dataset.dim() });
        }
        Ok(())
    }
}

/// Loss of the full stack under a fixed dropout step.
fn evaluate(
    layers: &[Layer],
    manifold: &Manifold,
    data: &Prepared,
    step: u64,
    margin: f64,
    geometric_weight: f64,
) -> Result<f64> {
    let mut ctx = ForwardContext::train(step);
    let out = forward_stack(layers, manifold, &data.batch, &mut ctx)?;
    Ok(compute_loss(manifold, out.nodes(), &data.targets, margin)?.total(geometric_weight))
}

/// Numeric blow-ups inside an epoch surface as divergence.
fn into_divergence(err: TrainError, epoch: usize) -> TrainError {
    let numeric = matches!(
        &err,
        TrainError::Hyp(HypError::NonFinite { .. } | HypError::OutOfBall { .. })
            | TrainError::Layer(
                LayerError::Hyp(HypError::NonFinite { .. })
                    | LayerError::OutOfBall { .. }
                    | LayerError::InvalidParameter { .. }
            )
    );
    if numeric {
        TrainError::DivergedTraining { epoch, reason: err.to_string() }
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobachevsky_dataset::DatasetGenerator;

    fn small_config() -> TrainConfig {
        TrainConfig {
            embedding_dim: 2,
            num_layers: 1,
            max_epochs: 3,
            ..TrainConfig::default()
        }
    }

    fn tree() -> HyperbolicDataset {
        DatasetGenerator::with_seed(2, 3).unwrap().tree(2, 2).unwrap()
    }

    #[test]
    fn new_orchestrator_is_idle_with_configured_curvature() {
        let orch = TrainingOrchestrator::new(small_config()).unwrap();
        assert_eq!(orch.state(), TrainingState::Idle);
        assert_eq!(orch.curvature(), -1.0);
        assert!(orch.records().is_empty());
        assert!(TrainingOrchestrator::new(TrainConfig { curvature: 1.0, ..small_config() }).is_err());
    }

    #[test]
    fn train_appends_one_record_per_epoch() {
        let mut orch = TrainingOrchestrator::new(small_config()).unwrap();
        let report = orch.train(&[tree()]).unwrap();
        assert_eq!(report.outcome, TrainingOutcome::MaxEpochsReached);
        assert_eq!(report.epochs_run, 3);
        assert_eq!(orch.state(), TrainingState::Idle);
        let epochs: Vec<usize> = orch.records().iter().map(|r| r.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3]);

        orch.train(&[tree()]).unwrap();
        assert_eq!(orch.records().len(), 6);
        assert_eq!(orch.records()[5].epoch, 6);
    }

    #[test]
    fn training_changes_parameters() {
        let mut orch = TrainingOrchestrator::new(small_config()).unwrap();
        let before: Vec<f64> = orch.layers().iter().flat_map(|l| l.params()).collect();
        orch.train(&[tree()]).unwrap();
        let after: Vec<f64> = orch.layers().iter().flat_map(|l| l.params()).collect();
        assert_ne!(before, after);
        assert!(is_finite(&after));
    }

    #[test]
    fn rejects_empty_and_mismatched_input() {
        let mut orch = TrainingOrchestrator::new(small_config()).unwrap();
        assert!(matches!(orch.train(&[]), Err(TrainError::NoData)));
        let wide = DatasetGenerator::with_seed(3, 1).unwrap().tree(2, 1).unwrap();
        assert!(matches!(
            orch.train(&[wide.clone()]),
            Err(TrainError::DimensionMismatch { expected: 2, got: 3 })
        ));
        assert!(orch.predict(&wide).is_err());
        assert!(orch.records().is_empty());
    }

    #[test]
    fn adaptive_mode_moves_curvature_within_bounds() {
        let cfg = TrainConfig {
            geometry_mode: GeometryMode::Adaptive,
            curvature_learning_rate: 0.5,
            ..small_config()
        };
        let mut orch = TrainingOrchestrator::new(cfg.clone()).unwrap();
        let report = orch.train(&[tree()]).unwrap();
        assert!(report.curvature >= cfg.min_curvature && report.curvature <= cfg.max_curvature);
        assert_ne!(report.curvature, cfg.curvature);
    }

    #[test]
    fn divergence_classification() {
        let err = into_divergence(TrainError::Layer(LayerError::OutOfBall { norm: 1.2 }), 4);
        assert!(matches!(err, TrainError::DivergedTraining { epoch: 4, .. }));
        let err = into_divergence(TrainError::NoData, 4);
        assert!(matches!(err, TrainError::NoData));
    }
}
