//! Hyperbolic batch normalisation.
//!
//! 1. `μ` = Karcher mean of the batch, at most [`KARCHER_MAX_ITER`] refinements
//!    with tolerance [`KARCHER_TOL`]. This is an approximation of the exact
//!    Fréchet mean; a non-converged mean is logged and still used.
//! 2. Every point is re-centred at the origin with `(−μ) ⊕ x`.
//! 3. A per-coordinate tangent scale `γ` and shift `β` are applied at the origin.
//!
//! Batch statistics are used in both modes; there are no running averages.

use lobachevsky_hyp_ops::vector::neg;
use lobachevsky_hyp_ops::{Manifold, KARCHER_MAX_ITER, KARCHER_TOL};
use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};
use crate::layer::Parameterized;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBatchNorm")]
pub struct BatchNorm {
    gamma: Vec<f64>,
    beta: Vec<f64>,
}

#[derive(Deserialize)]
struct RawBatchNorm {
    gamma: Vec<f64>,
    beta: Vec<f64>,
}

impl TryFrom<RawBatchNorm> for BatchNorm {
    type Error = LayerError;

    fn try_from(raw: RawBatchNorm) -> Result<Self> {
        let mut bn = BatchNorm::new(raw.gamma.len())?;
        if raw.beta.len() != raw.gamma.len() {
            return Err(LayerError::DimensionMismatch { expected: raw.gamma.len(), got: raw.beta.len() });
        }
        bn.gamma = raw.gamma;
        bn.beta = raw.beta;
        Ok(bn)
    }
}

impl BatchNorm {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(LayerError::InvalidDimension { in_dim: 0, out_dim: 0 });
        }
        Ok(Self { gamma: vec![1.0; dim], beta: vec![0.0; dim] })
    }

    pub fn dim(&self) -> usize {
        self.gamma.len()
    }

    pub fn forward_batch(&self, manifold: &Manifold, xs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if xs.is_empty() {
            return Err(LayerError::NullInput("batch norm got an empty batch"));
        }
        if let Some(bad) = xs.iter().find(|x| x.len() != self.dim()) {
            return Err(LayerError::DimensionMismatch { expected: self.dim(), got: bad.len() });
        }

        let clamped = manifold.project_all(xs)?;
        let refs: Vec<&[f64]> = clamped.iter().map(Vec::as_slice).collect();
        let mean = manifold.frechet_mean(&refs, None, KARCHER_MAX_ITER, KARCHER_TOL)?;
        if !mean.converged {
            tracing::warn!(
                batch = xs.len(),
                iterations = mean.iterations,
                "batch norm: Karcher mean did not reach tolerance"
            );
        }
        let to_origin = neg(&mean.point);

        clamped
            .iter()
            .map(|x| -> Result<Vec<f64>> {
                let centred = manifold.mobius_add(&to_origin, x)?;
                let t = manifold.log_map_zero(&centred)?;
                let shifted: Vec<f64> = t
                    .iter()
                    .zip(self.gamma.iter().zip(self.beta.iter()))
                    .map(|(&ti, (&g, &b))| g * ti + b)
                    .collect();
                Ok(manifold.exp_map_zero(&shifted)?)
            })
            .collect()
    }
}

impl Parameterized for BatchNorm {
    fn num_params(&self) -> usize {
        2 * self.dim()
    }

    /// `γ` then `β`.
    fn params(&self) -> Vec<f64> {
        self.gamma.iter().chain(self.beta.iter()).copied().collect()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.num_params() {
            return Err(LayerError::DimensionMismatch { expected: self.num_params(), got: params.len() });
        }
        let (g, b) = params.split_at(self.dim());
        self.gamma.copy_from_slice(g);
        self.beta.copy_from_slice(b);
        Ok(())
    }
}
