//! Synthetic hierarchical graphs.
//!
//! ## Tree layout
//!
//! The root sits at the origin. Each child is spawned from its parent by
//! Möbius-translating a step of length `depth_step` along the parent's radial
//! direction, perturbed by Gaussian angular jitter:
//!
//! ```text
//! child = parent ⊕ depth_step · normalise(r̂ + jitter · z),   z ~ N(0, I)
//! ```
//!
//! so deeper nodes sit closer to the boundary, the way trees embed naturally
//! in hyperbolic space. Children of the root get uniformly random directions.
//!
//! All generators draw from one seeded `StdRng`, so a given seed always
//! produces the same datasets.

use lobachevsky_hyp_ops::vector::norm;
use lobachevsky_hyp_ops::PoincareBall;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::dataset::HyperbolicDataset;
use crate::error::{DatasetError, Result};

/// Upper bound on generated node counts.
pub const MAX_NODES: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub dim: usize,
    pub seed: u64,
    /// Euclidean length of the per-level Möbius step, in (0, 1).
    pub depth_step: f64,
    /// Standard deviation of the angular perturbation.
    pub jitter: f64,
    /// Radius bound for [`DatasetGenerator::random_graph`] nodes.
    pub max_radius: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { dim: 2, seed: 42, depth_step: 0.35, jitter: 0.25, max_radius: 0.9 }
    }
}

pub struct DatasetGenerator {
    config: GeneratorConfig,
    ball: PoincareBall,
    rng: StdRng,
}

impl DatasetGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        if config.dim == 0 {
            return Err(DatasetError::InvalidParameter { name: "dim", value: 0.0 });
        }
        if !(config.depth_step > 0.0 && config.depth_step < 1.0) {
            return Err(DatasetError::InvalidParameter { name: "depth_step", value: config.depth_step });
        }
        if !config.jitter.is_finite() || config.jitter < 0.0 {
            return Err(DatasetError::InvalidParameter { name: "jitter", value: config.jitter });
        }
        if !(config.max_radius > 0.0 && config.max_radius < 1.0) {
            return Err(DatasetError::InvalidParameter { name: "max_radius", value: config.max_radius });
        }
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, ball: PoincareBall::UNIT, rng })
    }

    /// Defaults with the given dimension and seed.
    pub fn with_seed(dim: usize, seed: u64) -> Result<Self> {
        Self::new(GeneratorConfig { dim, seed, ..GeneratorConfig::default() })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Complete `branching`-ary tree of the given depth (depth 0 = root only).
    /// Depth labels are attached.
    pub fn tree(&mut self, branching: usize, depth: usize) -> Result<HyperbolicDataset> {
        if branching == 0 {
            return Err(DatasetError::InvalidParameter { name: "branching", value: 0.0 });
        }
        let total = tree_size(branching, depth)
            .filter(|&n| n <= MAX_NODES)
            .ok_or(DatasetError::InvalidParameter { name: "depth", value: depth as f64 })?;

        let dim = self.config.dim;
        let mut nodes = Vec::with_capacity(total);
        let mut edges = Vec::with_capacity(total.saturating_sub(1));
        let mut depths = Vec::with_capacity(total);
        nodes.push(vec![0.0; dim]);
        depths.push(0);

        let mut frontier = vec![0usize];
        for level in 1..=depth {
            let mut next = Vec::with_capacity(frontier.len() * branching);
            for &parent in &frontier {
                for _ in 0..branching {
                    let child = self.spawn_child(&nodes[parent])?;
                    let idx = nodes.len();
                    nodes.push(child);
                    edges.push((parent, idx));
                    depths.push(level);
                    next.push(idx);
                }
            }
            frontier = next;
        }

        tracing::debug!(branching, depth, nodes = nodes.len(), "generated tree dataset");
        HyperbolicDataset::new(nodes, edges)?.with_depths(depths)
    }

    /// Erdős–Rényi graph over `n` random ball points.
    pub fn random_graph(&mut self, n: usize, edge_probability: f64) -> Result<HyperbolicDataset> {
        if n == 0 || n > MAX_NODES {
            return Err(DatasetError::InvalidParameter { name: "n", value: n as f64 });
        }
        if !(0.0..=1.0).contains(&edge_probability) {
            return Err(DatasetError::InvalidParameter { name: "edge_probability", value: edge_probability });
        }
        let (dim, max_radius) = (self.config.dim, self.config.max_radius);
        let nodes = (0..n)
            .map(|_| random_hyperbolic_point(dim, max_radius, &mut self.rng))
            .collect::<Result<Vec<_>>>()?;
        let mut edges = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if self.rng.gen::<f64>() < edge_probability {
                    edges.push((i, j));
                }
            }
        }
        tracing::debug!(n, edges = edges.len(), "generated random graph dataset");
        HyperbolicDataset::new(nodes, edges)
    }

    /// `count` independent trees.
    pub fn batch(&mut self, count: usize, branching: usize, depth: usize) -> Result<Vec<HyperbolicDataset>> {
        if count == 0 {
            return Err(DatasetError::InvalidParameter { name: "count", value: 0.0 });
        }
        (0..count).map(|_| self.tree(branching, depth)).collect()
    }

    fn spawn_child(&mut self, parent: &[f64]) -> Result<Vec<f64>> {
        let dim = parent.len();
        let n = norm(parent);
        let direction: Vec<f64> = if n > 1e-8 {
            let noise: Vec<f64> = (0..dim).map(|_| self.gaussian()).collect();
            parent
                .iter()
                .zip(noise.iter())
                .map(|(p, z)| p / n + self.config.jitter * z)
                .collect()
        } else {
            (0..dim).map(|_| self.gaussian()).collect()
        };
        let dn = norm(&direction);
        let step: Vec<f64> = if dn > 1e-12 {
            direction.iter().map(|d| d / dn * self.config.depth_step).collect()
        } else {
            let mut s = vec![0.0; dim];
            s[0] = self.config.depth_step;
            s
        };
        Ok(self.ball.mobius_add(parent, &step)?)
    }

    fn gaussian(&mut self) -> f64 {
        StandardNormal.sample(&mut self.rng)
    }
}

/// `1 + b + b² + … + b^depth`, `None` on overflow.
fn tree_size(branching: usize, depth: usize) -> Option<usize> {
    let mut total = 1usize;
    let mut level = 1usize;
    for _ in 0..depth {
        level = level.checked_mul(branching)?;
        total = total.checked_add(level)?;
    }
    Some(total)
}

/// Uniform point in the Euclidean ball of radius `max_radius`.
///
/// # Errors
///
/// [`DatasetError::InvalidParameter`] unless `dim > 0` and `0 < max_radius < 1`.
pub fn random_hyperbolic_point(dim: usize, max_radius: f64, rng: &mut impl Rng) -> Result<Vec<f64>> {
    if dim == 0 {
        return Err(DatasetError::InvalidParameter { name: "dim", value: 0.0 });
    }
    if !(max_radius > 0.0 && max_radius < 1.0) {
        return Err(DatasetError::InvalidParameter { name: "max_radius", value: max_radius });
    }
    let raw: Vec<f64> = (0..dim).map(|_| StandardNormal.sample(rng)).collect();
    let n = norm(&raw).max(1e-12);
    let r = max_radius * rng.gen::<f64>().powf(1.0 / dim as f64);
    Ok(raw.iter().map(|x| x / n * r).collect())
}

/// Random tangent vector of exactly `magnitude` length.
pub fn random_tangent(dim: usize, magnitude: f64, rng: &mut impl Rng) -> Vec<f64> {
    let raw: Vec<f64> = (0..dim).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect();
    let n = norm(&raw).max(1e-12);
    raw.into_iter().map(|v| v / n * magnitude).collect()
}
