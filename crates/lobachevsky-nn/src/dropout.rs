//! Tangent-space dropout.
//!
//! Coordinates of `log₀(x)` are zeroed with probability `rate` and the
//! survivors scaled by `1/(1 − rate)`. Identity at inference time. Masks come
//! from `(seed, step)`, so a pass is reproducible.

use lobachevsky_hyp_ops::Manifold;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::context::{mix_seed, ForwardContext};
use crate::error::{LayerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDropout")]
pub struct Dropout {
    rate: f64,
    seed: u64,
}

#[derive(Deserialize)]
struct RawDropout {
    rate: f64,
    seed: u64,
}

impl TryFrom<RawDropout> for Dropout {
    type Error = LayerError;

    fn try_from(raw: RawDropout) -> Result<Self> {
        Dropout::new(raw.rate, raw.seed)
    }
}

impl Dropout {
    /// `rate` must lie in `[0, 1)`.
    pub fn new(rate: f64, seed: u64) -> Result<Self> {
        if !(0.0..1.0).contains(&rate) {
            return Err(LayerError::InvalidParameter { name: "dropout_rate", value: rate });
        }
        Ok(Self { rate, seed })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn forward_batch(
        &self,
        manifold: &Manifold,
        xs: &[Vec<f64>],
        ctx: &ForwardContext,
    ) -> Result<Vec<Vec<f64>>> {
        if xs.is_empty() {
            return Err(LayerError::NullInput("dropout got an empty batch"));
        }
        if !ctx.is_training() || self.rate == 0.0 {
            return xs
                .iter()
                .map(|x| -> Result<Vec<f64>> { Ok(manifold.ensure(manifold.project(x)?)?) })
                .collect();
        }

        let mut rng = StdRng::seed_from_u64(mix_seed(self.seed, ctx.step()));
        let keep_scale = 1.0 / (1.0 - self.rate);
        xs.iter()
            .map(|x| -> Result<Vec<f64>> {
                let t = manifold.log_map_zero(&manifold.project(x)?)?;
                let dropped: Vec<f64> = t
                    .iter()
                    .map(|&v| if rng.gen::<f64>() < self.rate { 0.0 } else { v * keep_scale })
                    .collect();
                Ok(manifold.exp_map_zero(&dropped)?)
            })
            .collect()
    }
}
