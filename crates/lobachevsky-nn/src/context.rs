//! Per-pass state threaded through a layer stack.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    Infer,
}

/// Mode, dropout step and the attention margins of the last attention layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardContext {
    mode: Mode,
    step: u64,
    margins: Option<Vec<f64>>,
}

impl ForwardContext {
    /// Training pass. `step` seeds the dropout masks, so two passes with the
    /// same step see the same masks.
    pub fn train(step: u64) -> Self {
        Self { mode: Mode::Train, step, margins: None }
    }

    pub fn infer() -> Self {
        Self { mode: Mode::Infer, step: 0, margins: None }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_training(&self) -> bool {
        self.mode == Mode::Train
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Later attention layers overwrite earlier ones.
    pub(crate) fn record_margins(&mut self, margins: Vec<f64>) {
        self.margins = Some(margins);
    }

    pub fn margins(&self) -> Option<&[f64]> {
        self.margins.as_deref()
    }

    pub fn take_margins(&mut self) -> Option<Vec<f64>> {
        self.margins.take()
    }
}

/// SplitMix64 finaliser, used to derive independent seeds from (seed, step).
pub(crate) fn mix_seed(seed: u64, step: u64) -> u64 {
    let mut z = seed ^ step.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
