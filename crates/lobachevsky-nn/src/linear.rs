//! Hyperbolic linear layer.
//!
//! ```text
//! y = exp₀( W · log₀(x) + b )
//! ```
//!
//! `W` and `b` live in the tangent space at the origin, so the affine part is
//! ordinary matrix algebra; the maps on either side keep the output in the ball.

use lobachevsky_hyp_ops::Manifold;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};
use crate::layer::Parameterized;

/// Deserialisation goes through [`Linear::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLinear")]
pub struct Linear {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

#[derive(Deserialize)]
struct RawLinear {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl TryFrom<RawLinear> for Linear {
    type Error = LayerError;

    fn try_from(raw: RawLinear) -> Result<Self> {
        Linear::from_parts(raw.weights, raw.bias)
    }
}

impl Linear {
    /// Xavier-normal weights drawn from `seed`, zero bias.
    pub fn new(in_dim: usize, out_dim: usize, seed: u64) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(LayerError::InvalidDimension { in_dim, out_dim });
        }
        let std = (2.0 / (in_dim + out_dim) as f64).sqrt();
        let normal = Normal::new(0.0, std)
            .map_err(|_| LayerError::InvalidParameter { name: "xavier_std", value: std })?;
        let mut rng = StdRng::seed_from_u64(seed);
        let weights = Array2::from_shape_fn((out_dim, in_dim), |_| normal.sample(&mut rng));
        Ok(Self { weights, bias: Array1::zeros(out_dim) })
    }

    /// Build from explicit parameters. `weights` is `out_dim × in_dim`.
    pub fn from_parts(weights: Array2<f64>, bias: Array1<f64>) -> Result<Self> {
        let (out_dim, in_dim) = weights.dim();
        if in_dim == 0 || out_dim == 0 {
            return Err(LayerError::InvalidDimension { in_dim, out_dim });
        }
        if bias.len() != out_dim {
            return Err(LayerError::DimensionMismatch { expected: out_dim, got: bias.len() });
        }
        Ok(Self { weights, bias })
    }

    pub fn in_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn out_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Affine part only: `W · t + b` on a tangent vector.
    pub fn tangent(&self, t: &[f64]) -> Result<Vec<f64>> {
        if t.len() != self.in_dim() {
            return Err(LayerError::DimensionMismatch { expected: self.in_dim(), got: t.len() });
        }
        let out = self.weights.dot(&ArrayView1::from(t)) + &self.bias;
        Ok(out.to_vec())
    }

    /// Map one point.
    ///
    /// The input is clamped into the ball first, so any input without NaN
    /// gives a valid point (infinite coordinates clamp along their sign);
    /// NaN input fails.
    pub fn forward(&self, manifold: &Manifold, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.in_dim() {
            return Err(LayerError::DimensionMismatch { expected: self.in_dim(), got: x.len() });
        }
        let t = manifold.log_map_zero(&manifold.project(x)?)?;
        let y = self.tangent(&t)?;
        Ok(manifold.exp_map_zero(&y)?)
    }

    pub fn forward_batch(&self, manifold: &Manifold, xs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if xs.is_empty() {
            return Err(LayerError::NullInput("linear layer got an empty batch"));
        }
        xs.iter().map(|x| self.forward(manifold, x)).collect()
    }
}

impl Parameterized for Linear {
    fn num_params(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    /// Row-major weights, then bias.
    fn params(&self) -> Vec<f64> {
        self.weights.iter().chain(self.bias.iter()).copied().collect()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.num_params() {
            return Err(LayerError::DimensionMismatch { expected: self.num_params(), got: params.len() });
        }
        let (w, b) = params.split_at(self.weights.len());
        for (dst, src) in self.weights.iter_mut().zip(w) {
            *dst = *src;
        }
        for (dst, src) in self.bias.iter_mut().zip(b) {
            *dst = *src;
        }
        Ok(())
    }
}
