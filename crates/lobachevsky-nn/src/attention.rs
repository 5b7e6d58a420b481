//! Distance-based hyperbolic attention.
//!
//! The score of a key is `exp(−β · d(q, k))`; scores are normalised to sum to
//! one (a softmax over `−β · d`) and the values are averaged with
//! [`Manifold::tangent_midpoint`] under those weights. `β` is the only
//! parameter and is stored as `ln β` so gradient steps keep it positive.

use lobachevsky_hyp_ops::Manifold;
use serde::{Deserialize, Serialize};

use crate::batch::NodeBatch;
use crate::context::ForwardContext;
use crate::error::{LayerError, Result};
use crate::layer::Parameterized;

/// Input of one independent head: a query with its own keys and values.
#[derive(Debug, Clone, Copy)]
pub struct Head<'a> {
    pub query: &'a [f64],
    pub keys: &'a [&'a [f64]],
    pub values: &'a [&'a [f64]],
}

/// One query's result.
#[derive(Debug, Clone, PartialEq)]
pub struct Attended {
    pub output: Vec<f64>,
    pub weights: Vec<f64>,
    /// Top weight minus runner-up; `1.0` with a single key.
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAttention")]
pub struct Attention {
    dim: usize,
    log_beta: f64,
}

#[derive(Deserialize)]
struct RawAttention {
    dim: usize,
    log_beta: f64,
}

impl TryFrom<RawAttention> for Attention {
    type Error = LayerError;

    fn try_from(raw: RawAttention) -> Result<Self> {
        let mut att = Attention::new(raw.dim)?;
        att.set_params(&[raw.log_beta])?;
        Ok(att)
    }
}

impl Attention {
    pub fn new(dim: usize) -> Result<Self> {
        Self::with_temperature(dim, 1.0)
    }

    /// `beta` is the inverse temperature: larger values sharpen the weights.
    pub fn with_temperature(dim: usize, beta: f64) -> Result<Self> {
        if dim == 0 {
            return Err(LayerError::InvalidDimension { in_dim: dim, out_dim: dim });
        }
        if !beta.is_finite() || beta <= 0.0 {
            return Err(LayerError::InvalidParameter { name: "attention_beta", value: beta });
        }
        Ok(Self { dim, log_beta: beta.ln() })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn beta(&self) -> f64 {
        self.log_beta.exp()
    }

    /// Normalised attention weights of `query` over `keys`.
    pub fn weights(&self, manifold: &Manifold, query: &[f64], keys: &[&[f64]]) -> Result<Vec<f64>> {
        if keys.is_empty() {
            return Err(LayerError::NullInput("attention needs at least one key"));
        }
        if query.len() != self.dim {
            return Err(LayerError::DimensionMismatch { expected: self.dim, got: query.len() });
        }
        let beta = self.beta();
        let logits = keys
            .iter()
            .map(|k| -> Result<f64> { Ok(-beta * manifold.distance(query, k)?) })
            .collect::<Result<Vec<f64>>>()?;
        Ok(softmax(&logits))
    }

    /// Single-head attention of one query over `keys` / `values`.
    pub fn attend(
        &self,
        manifold: &Manifold,
        query: &[f64],
        keys: &[&[f64]],
        values: &[&[f64]],
    ) -> Result<Attended> {
        if keys.len() != values.len() {
            return Err(LayerError::DimensionMismatch { expected: keys.len(), got: values.len() });
        }
        let weights = self.weights(manifold, query, keys)?;
        let output = manifold.tangent_midpoint(values, Some(&weights))?;
        let output = manifold.ensure(output)?;
        Ok(Attended { output, margin: margin(&weights), weights })
    }

    /// Multi-head form: [`attend`](Self::attend) runs independently on every
    /// (query, keys, values) triple. One result per head, in order.
    pub fn attend_heads(&self, manifold: &Manifold, heads: &[Head<'_>]) -> Result<Vec<Attended>> {
        if heads.is_empty() {
            return Err(LayerError::NullInput("attention got no queries"));
        }
        heads
            .iter()
            .map(|h| self.attend(manifold, h.query, h.keys, h.values))
            .collect()
    }

    /// [`attend_heads`](Self::attend_heads) with every query sharing one
    /// key/value set.
    pub fn attend_batch(
        &self,
        manifold: &Manifold,
        queries: &[&[f64]],
        keys: &[&[f64]],
        values: &[&[f64]],
    ) -> Result<Vec<Attended>> {
        let heads: Vec<Head<'_>> = queries.iter().map(|&query| Head { query, keys, values }).collect();
        self.attend_heads(manifold, &heads)
    }

    /// Graph form: every node attends over itself and its neighbours.
    /// Records the per-node margins in `ctx`.
    pub fn forward_graph(
        &self,
        manifold: &Manifold,
        batch: &NodeBatch,
        ctx: &mut ForwardContext,
    ) -> Result<NodeBatch> {
        if batch.is_empty() {
            return Err(LayerError::NullInput("attention got an empty batch"));
        }
        let nodes = batch.nodes();
        let mut outputs = Vec::with_capacity(nodes.len());
        let mut margins = Vec::with_capacity(nodes.len());

        for (i, query) in nodes.iter().enumerate() {
            let hood: Vec<&[f64]> = batch
                .neighborhood(i)
                .into_iter()
                .map(|j| nodes[j].as_slice())
                .collect();
            let attended = self.attend(manifold, query, &hood, &hood)?;
            margins.push(attended.margin);
            outputs.push(attended.output);
        }

        ctx.record_margins(margins);
        Ok(batch.with_nodes(outputs))
    }
}

impl Parameterized for Attention {
    fn num_params(&self) -> usize {
        1
    }

    fn params(&self) -> Vec<f64> {
        vec![self.log_beta]
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        match params {
            [log_beta] if log_beta.is_finite() => {
                self.log_beta = *log_beta;
                Ok(())
            }
            [log_beta] => Err(LayerError::InvalidParameter { name: "attention_log_beta", value: *log_beta }),
            _ => Err(LayerError::DimensionMismatch { expected: 1, got: params.len() }),
        }
    }
}

pub(crate) fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

fn margin(weights: &[f64]) -> f64 {
    if weights.len() < 2 {
        return 1.0;
    }
    let (mut first, mut second) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &w in weights {
        if w > first {
            second = first;
            first = w;
        } else if w > second {
            second = w;
        }
    }
    first - second
}
