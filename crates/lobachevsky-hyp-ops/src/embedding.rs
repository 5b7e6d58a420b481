//! Embedding records handed to external consumers.

use serde::{Deserialize, Serialize};

use crate::ball::PoincareBall;
use crate::error::{HypError, Result};
use crate::manifold::Manifold;
use crate::vector::norm;

/// A point in the ball plus the metadata it was produced with.
///
/// Immutable: the `with_*` methods return a new record. Deserialisation
/// re-runs the checks of [`Embedding::new`] under the stored curvature and
/// recomputes `norm` from the coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEmbedding")]
pub struct Embedding {
    coords: Vec<f64>,
    norm: f64,
    curvature: f64,
    created_at: i64,
    confidence: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEmbedding {
    coords: Vec<f64>,
    curvature: f64,
    created_at: i64,
    confidence: f64,
}

impl TryFrom<RawEmbedding> for Embedding {
    type Error = HypError;

    fn try_from(raw: RawEmbedding) -> Result<Self> {
        let manifold = if raw.curvature == 0.0 {
            Manifold::Euclidean
        } else {
            Manifold::Poincare(PoincareBall::new(raw.curvature)?)
        };
        let mut e = Embedding::new(raw.coords, &manifold, raw.confidence)?;
        e.created_at = raw.created_at;
        Ok(e)
    }
}

impl Embedding {
    /// Validate `coords` against `manifold` and stamp the record.
    ///
    /// `confidence` is clamped into `[0, 1]`; NaN becomes 0.
    pub fn new(coords: Vec<f64>, manifold: &Manifold, confidence: f64) -> Result<Self> {
        let coords = manifold.ensure(coords)?;
        Ok(Self {
            norm: norm(&coords),
            coords,
            curvature: manifold.curvature(),
            created_at: now_unix_ms(),
            confidence: clamp_unit(confidence),
        })
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    pub fn norm(&self) -> f64 {
        self.norm
    }

    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    /// Unix time in milliseconds.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn with_confidence(&self, confidence: f64) -> Self {
        Self { confidence: clamp_unit(confidence), ..self.clone() }
    }

    pub fn into_coords(self) -> Vec<f64> {
        self.coords
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Milliseconds since the Unix epoch; 0 if the clock is before it.
pub fn now_unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
