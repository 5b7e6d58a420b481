//! Pointwise non-linearities applied in the tangent space at the origin:
//! `exp₀(σ(log₀(x)))`.

use lobachevsky_hyp_ops::Manifold;
use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    LeakyRelu { alpha: f64 },
    Tanh,
    Sigmoid,
}

impl Default for Activation {
    fn default() -> Self {
        Activation::Relu
    }
}

impl Activation {
    pub fn leaky_relu(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(LayerError::InvalidParameter { name: "leaky_relu_alpha", value: alpha });
        }
        Ok(Activation::LeakyRelu { alpha })
    }

    /// Scalar non-linearity.
    #[inline]
    pub fn apply_scalar(&self, t: f64) -> f64 {
        match *self {
            Activation::Relu => t.max(0.0),
            Activation::LeakyRelu { alpha } => {
                if t >= 0.0 {
                    t
                } else {
                    alpha * t
                }
            }
            Activation::Tanh => t.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-t).exp()),
        }
    }

    pub fn forward(&self, manifold: &Manifold, x: &[f64]) -> Result<Vec<f64>> {
        if x.is_empty() {
            return Err(LayerError::NullInput("activation got an empty vector"));
        }
        let t = manifold.log_map_zero(&manifold.project(x)?)?;
        let activated: Vec<f64> = t.iter().map(|&v| self.apply_scalar(v)).collect();
        Ok(manifold.exp_map_zero(&activated)?)
    }

    pub fn forward_batch(&self, manifold: &Manifold, xs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if xs.is_empty() {
            return Err(LayerError::NullInput("activation got an empty batch"));
        }
        xs.iter().map(|x| self.forward(manifold, x)).collect()
    }
}
