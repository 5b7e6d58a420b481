//! Orchestrator configuration.
//!
//! Plain serde struct with defaults; [`TrainConfig::from_env`] overlays
//! `LOBACHEVSKY_*` environment variables.

use std::fmt;
use std::str::FromStr;

use lobachevsky_nn::Activation;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryMode {
    /// Curvature 0: flat formulas, points still clamped to the unit ball.
    Euclidean,
    /// The configured negative curvature.
    #[default]
    Hyperbolic,
    /// Curvature is a learned scalar, updated once per epoch.
    Adaptive,
}

impl fmt::Display for GeometryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GeometryMode::Euclidean => "euclidean",
            GeometryMode::Hyperbolic => "hyperbolic",
            GeometryMode::Adaptive => "adaptive",
        })
    }
}

impl FromStr for GeometryMode {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" => Ok(GeometryMode::Euclidean),
            "hyperbolic" => Ok(GeometryMode::Hyperbolic),
            "adaptive" => Ok(GeometryMode::Adaptive),
            other => Err(TrainError::InvalidConfig {
                field: "geometryMode",
                reason: format!("unknown mode {other:?}"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainConfig {
    /// Negative curvature κ used in hyperbolic mode and as the adaptive start.
    pub curvature: f64,
    pub embedding_dim: usize,
    /// Dimension of dataset node coordinates; `None` means `embedding_dim`.
    pub input_dim: Option<usize>,
    /// Number of message-passing layers.
    pub num_layers: usize,
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub geometry_mode: GeometryMode,

    pub use_attention: bool,
    pub use_batch_norm: bool,
    pub dropout_rate: f64,
    pub activation: Activation,
    pub seed: u64,

    /// Minimum per-epoch loss improvement that resets the patience counter.
    pub convergence_threshold: f64,
    /// Consecutive epochs below the threshold before declaring convergence.
    pub patience: usize,
    pub geometric_weight: f64,
    /// Non-edges sampled per edge for the hinge term.
    pub negative_samples: usize,
    pub margin: f64,
    /// Central-difference step for parameter gradients.
    pub grad_epsilon: f64,
    pub max_grad_norm: f64,

    pub curvature_learning_rate: f64,
    pub min_curvature: f64,
    pub max_curvature: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            curvature: -1.0,
            embedding_dim: 4,
            input_dim: None,
            num_layers: 2,
            learning_rate: 0.05,
            max_epochs: 100,
            geometry_mode: GeometryMode::Hyperbolic,
            use_attention: false,
            use_batch_norm: false,
            dropout_rate: 0.0,
            activation: Activation::Tanh,
            seed: 42,
            convergence_threshold: 1e-4,
            patience: 5,
            geometric_weight: 0.1,
            negative_samples: 1,
            margin: 1.0,
            grad_epsilon: 1e-5,
            max_grad_norm: 5.0,
            curvature_learning_rate: 0.01,
            min_curvature: -10.0,
            max_curvature: -0.05,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl TrainConfig {
    /// Defaults overlaid with `LOBACHEVSKY_*` variables. Unparseable values
    /// fall back to the default.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            curvature: env_or("LOBACHEVSKY_CURVATURE", d.curvature),
            embedding_dim: env_or("LOBACHEVSKY_EMBEDDING_DIM", d.embedding_dim),
            input_dim: std::env::var("LOBACHEVSKY_INPUT_DIM").ok().and_then(|s| s.parse().ok()),
            num_layers: env_or("LOBACHEVSKY_NUM_LAYERS", d.num_layers),
            learning_rate: env_or("LOBACHEVSKY_LEARNING_RATE", d.learning_rate),
            max_epochs: env_or("LOBACHEVSKY_MAX_EPOCHS", d.max_epochs),
            geometry_mode: env_or("LOBACHEVSKY_GEOMETRY_MODE", d.geometry_mode),
            use_attention: env_or("LOBACHEVSKY_USE_ATTENTION", d.use_attention),
            use_batch_norm: env_or("LOBACHEVSKY_USE_BATCH_NORM", d.use_batch_norm),
            dropout_rate: env_or("LOBACHEVSKY_DROPOUT_RATE", d.dropout_rate),
            seed: env_or("LOBACHEVSKY_SEED", d.seed),
            patience: env_or("LOBACHEVSKY_PATIENCE", d.patience),
            convergence_threshold: env_or("LOBACHEVSKY_CONVERGENCE_THRESHOLD", d.convergence_threshold),
            ..d
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim.unwrap_or(self.embedding_dim)
    }

    /// Reject out-of-range values before any layer is built.
    pub fn validate(&self) -> Result<()> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> TrainError {
            TrainError::InvalidConfig { field, reason: reason.into() }
        }

        if !self.curvature.is_finite() || self.curvature >= 0.0 {
            return Err(invalid("curvature", format!("{} is not < 0", self.curvature)));
        }
        if self.embedding_dim == 0 {
            return Err(invalid("embeddingDim", "must be > 0"));
        }
        if self.input_dim == Some(0) {
            return Err(invalid("inputDim", "must be > 0"));
        }
        if self.num_layers == 0 {
            return Err(invalid("numLayers", "must be ≥ 1"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(invalid("learningRate", format!("{} is not > 0", self.learning_rate)));
        }
        if self.max_epochs == 0 {
            return Err(invalid("maxEpochs", "must be ≥ 1"));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(invalid("dropoutRate", format!("{} is not in [0, 1)", self.dropout_rate)));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(invalid("convergenceThreshold", "must be ≥ 0"));
        }
        if self.patience == 0 {
            return Err(invalid("patience", "must be ≥ 1"));
        }
        if !self.geometric_weight.is_finite() || self.geometric_weight < 0.0 {
            return Err(invalid("geometricWeight", "must be ≥ 0"));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(invalid("margin", "must be ≥ 0"));
        }
        if !self.grad_epsilon.is_finite() || self.grad_epsilon <= 0.0 {
            return Err(invalid("gradEpsilon", "must be > 0"));
        }
        if !self.max_grad_norm.is_finite() || self.max_grad_norm <= 0.0 {
            return Err(invalid("maxGradNorm", "must be > 0"));
        }
        if !self.curvature_learning_rate.is_finite() || self.curvature_learning_rate < 0.0 {
            return Err(invalid("curvatureLearningRate", "must be ≥ 0"));
        }
        if !(self.min_curvature.is_finite()
            && self.max_curvature < 0.0
            && self.min_curvature <= self.max_curvature)
        {
            return Err(invalid(
                "minCurvature/maxCurvature",
                format!("[{}, {}] is not a negative range", self.min_curvature, self.max_curvature),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        TrainConfig::default().validate().unwrap();
        assert_eq!(TrainConfig::default().input_dim(), 4);
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let bad = [
            TrainConfig { curvature: 0.0, ..TrainConfig::default() },
            TrainConfig { embedding_dim: 0, ..TrainConfig::default() },
            TrainConfig { num_layers: 0, ..TrainConfig::default() },
            TrainConfig { learning_rate: -1.0, ..TrainConfig::default() },
            TrainConfig { max_epochs: 0, ..TrainConfig::default() },
            TrainConfig { dropout_rate: 1.0, ..TrainConfig::default() },
            TrainConfig { min_curvature: -0.01, max_curvature: -1.0, ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(TrainError::InvalidConfig { .. })), "{cfg:?}");
        }
    }

    #[test]
    fn geometry_mode_parses_and_serialises_lowercase() {
        assert_eq!("Adaptive".parse::<GeometryMode>().unwrap(), GeometryMode::Adaptive);
        assert!("spherical".parse::<GeometryMode>().is_err());
        assert_eq!(serde_json::to_string(&GeometryMode::Euclidean).unwrap(), r#""euclidean""#);
    }

    #[test]
    fn camel_case_config_with_partial_fields() {
        let cfg: TrainConfig = serde_json::from_str(
            r#"{"curvature": -0.5, "embeddingDim": 3, "numLayers": 1,
                "learningRate": 0.1, "maxEpochs": 7, "geometryMode": "adaptive"}"#,
        )
        .unwrap();
        assert_eq!(cfg.embedding_dim, 3);
        assert_eq!(cfg.geometry_mode, GeometryMode::Adaptive);
        assert_eq!(cfg.patience, 5);
        cfg.validate().unwrap();
    }

    #[test]
    fn from_env_overlays_defaults() {
        std::env::set_var("LOBACHEVSKY_MAX_EPOCHS", "17");
        std::env::set_var("LOBACHEVSKY_GEOMETRY_MODE", "euclidean");
        std::env::set_var("LOBACHEVSKY_LEARNING_RATE", "not-a-number");
        let cfg = TrainConfig::from_env();
        std::env::remove_var("LOBACHEVSKY_MAX_EPOCHS");
        std::env::remove_var("LOBACHEVSKY_GEOMETRY_MODE");
        std::env::remove_var("LOBACHEVSKY_LEARNING_RATE");

        assert_eq!(cfg.max_epochs, 17);
        assert_eq!(cfg.geometry_mode, GeometryMode::Euclidean);
        assert_eq!(cfg.learning_rate, TrainConfig::default().learning_rate);
    }
}
