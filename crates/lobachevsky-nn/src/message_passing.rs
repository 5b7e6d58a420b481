//! Graph message passing in the ball.
//!
//! For node `i` with neighbourhood `N(i) ∪ {i}`:
//!
//! ```text
//! m_i = Agg_{j ∈ N(i) ∪ {i}} (w_ij, x_j)
//! h_i = Linear(m_i)
//! ```
//!
//! `w_ij` is uniform or a softmax of `⟨a, log₀(x_j)⟩` with a learnable `a`.
//! `Agg` is the tangent-space midpoint (default) or the Karcher mean.

use lobachevsky_hyp_ops::vector::dot;
use lobachevsky_hyp_ops::{Manifold, KARCHER_MAX_ITER, KARCHER_TOL};
use serde::{Deserialize, Serialize};

use crate::attention::softmax;
use crate::batch::NodeBatch;
use crate::error::{LayerError, Result};
use crate::layer::Parameterized;
use crate::linear::Linear;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeWeighting {
    #[default]
    Uniform,
    Learned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Weighted average in the tangent space at the origin.
    #[default]
    TangentOrigin,
    /// Iterative Karcher mean, bounded by `KARCHER_MAX_ITER`.
    Karcher,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMessagePassing")]
pub struct MessagePassing {
    linear: Linear,
    weighting: EdgeWeighting,
    aggregation: Aggregation,
    /// Scoring vector for learned weights; unused (and not a parameter) when uniform.
    score: Vec<f64>,
}

#[derive(Deserialize)]
struct RawMessagePassing {
    linear: Linear,
    weighting: EdgeWeighting,
    aggregation: Aggregation,
    score: Vec<f64>,
}

impl TryFrom<RawMessagePassing> for MessagePassing {
    type Error = LayerError;

    fn try_from(raw: RawMessagePassing) -> Result<Self> {
        if raw.score.len() != raw.linear.in_dim() {
            return Err(LayerError::DimensionMismatch { expected: raw.linear.in_dim(), got: raw.score.len() });
        }
        Ok(Self { linear: raw.linear, weighting: raw.weighting, aggregation: raw.aggregation, score: raw.score })
    }
}

impl MessagePassing {
    pub fn new(in_dim: usize, out_dim: usize, seed: u64) -> Result<Self> {
        Ok(Self {
            linear: Linear::new(in_dim, out_dim, seed)?,
            weighting: EdgeWeighting::Uniform,
            aggregation: Aggregation::TangentOrigin,
            score: vec![0.0; in_dim],
        })
    }

    pub fn with_weighting(mut self, weighting: EdgeWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn in_dim(&self) -> usize {
        self.linear.in_dim()
    }

    pub fn out_dim(&self) -> usize {
        self.linear.out_dim()
    }

    pub fn linear(&self) -> &Linear {
        &self.linear
    }

    fn neighbor_weights(&self, manifold: &Manifold, members: &[&[f64]]) -> Result<Option<Vec<f64>>> {
        match self.weighting {
            EdgeWeighting::Uniform => Ok(None),
            EdgeWeighting::Learned => {
                let logits = members
                    .iter()
                    .map(|x| -> Result<f64> { Ok(dot(&self.score, &manifold.log_map_zero(x)?)?) })
                    .collect::<Result<Vec<f64>>>()?;
                Ok(Some(softmax(&logits)))
            }
        }
    }

    /// Aggregate one neighbourhood into a single point.
    pub fn aggregate(&self, manifold: &Manifold, members: &[&[f64]]) -> Result<Vec<f64>> {
        if members.is_empty() {
            return Err(LayerError::NullInput("message passing got an empty neighbourhood"));
        }
        let weights = self.neighbor_weights(manifold, members)?;
        let point = match self.aggregation {
            Aggregation::TangentOrigin => manifold.tangent_midpoint(members, weights.as_deref())?,
            Aggregation::Karcher => {
                manifold
                    .frechet_mean(members, weights.as_deref(), KARCHER_MAX_ITER, KARCHER_TOL)?
                    .point
            }
        };
        Ok(manifold.ensure(point)?)
    }

    pub fn forward_graph(&self, manifold: &Manifold, batch: &NodeBatch) -> Result<NodeBatch> {
        if batch.is_empty() {
            return Err(LayerError::NullInput("message passing got an empty batch"));
        }
        if batch.dim() != self.in_dim() {
            return Err(LayerError::DimensionMismatch { expected: self.in_dim(), got: batch.dim() });
        }
        let nodes = batch.nodes();
        let clamped = manifold.project_all(nodes)?;

        let outputs = (0..nodes.len())
            .map(|i| -> Result<Vec<f64>> {
                let members: Vec<&[f64]> = batch
                    .neighborhood(i)
                    .into_iter()
                    .map(|j| clamped[j].as_slice())
                    .collect();
                let message = self.aggregate(manifold, &members)?;
                self.linear.forward(manifold, &message)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(batch.with_nodes(outputs))
    }
}

impl Parameterized for MessagePassing {
    fn num_params(&self) -> usize {
        match self.weighting {
            EdgeWeighting::Uniform => self.linear.num_params(),
            EdgeWeighting::Learned => self.linear.num_params() + self.score.len(),
        }
    }

    /// Linear parameters, then the scoring vector when weights are learned.
    fn params(&self) -> Vec<f64> {
        let mut p = self.linear.params();
        if self.weighting == EdgeWeighting::Learned {
            p.extend_from_slice(&self.score);
        }
        p
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.num_params() {
            return Err(LayerError::DimensionMismatch { expected: self.num_params(), got: params.len() });
        }
        let (lin, score) = params.split_at(self.linear.num_params());
        self.linear.set_params(lin)?;
        if self.weighting == EdgeWeighting::Learned {
            self.score.copy_from_slice(score);
        }
        Ok(())
    }
}
