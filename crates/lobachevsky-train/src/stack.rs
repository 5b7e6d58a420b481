//! Default layer stack built from a [`TrainConfig`].
//!
//! ```text
//! MessagePassing(in → d) ─ act ─ [dropout] ─ MessagePassing(d → d) ─ … ─ [BatchNorm] ─ [Attention]
//! ```
//!
//! The activation (and dropout, when enabled) sits between message-passing
//! layers, never after the last one, so the final embeddings are not squashed.

use lobachevsky_nn::{Attention, BatchNorm, Dropout, Layer, MessagePassing};

use crate::config::TrainConfig;
use crate::error::Result;

/// Per-layer seeds are spread out so neighbouring layers never share a stream.
const SEED_STRIDE: u64 = 0x9E37_79B9;

pub fn build_stack(config: &TrainConfig) -> Result<Vec<Layer>> {
    let dim = config.embedding_dim;
    let mut layers = Vec::with_capacity(config.num_layers * 3 + 2);
    let mut in_dim = config.input_dim();

    for i in 0..config.num_layers {
        let seed = config.seed.wrapping_add(SEED_STRIDE.wrapping_mul(i as u64 + 1));
        layers.push(Layer::MessagePassing(MessagePassing::new(in_dim, dim, seed)?));
        in_dim = dim;

        if i + 1 < config.num_layers {
            layers.push(Layer::Activation(config.activation));
            if config.dropout_rate > 0.0 {
                layers.push(Layer::Dropout(Dropout::new(config.dropout_rate, seed ^ 0xD0)?));
            }
        }
    }
    if config.use_batch_norm {
        layers.push(Layer::BatchNorm(BatchNorm::new(dim)?));
    }
    if config.use_attention {
        layers.push(Layer::Attention(Attention::new(dim)?));
    }
    Ok(layers)
}
