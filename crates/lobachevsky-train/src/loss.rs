//! Task and geometric loss over one graph's embeddings.
//!
//! ```text
//! task      = mean_{(u,v) ∈ E} d(u,v)²  +  mean_{(u,v) ∈ N} max(0, margin − d(u,v))²
//! geometric = Var(‖x‖)  +  mean_{(u,v) ∈ H} (d(u,v) − hops(u,v))²
//! ```
//!
//! `E` are the graph edges, `N` sampled non-edges and `H` reachable node pairs
//! with their BFS hop count.

use lobachevsky_dataset::topology::{hop_distances, sample_non_edges};
use lobachevsky_dataset::HyperbolicDataset;
use lobachevsky_hyp_ops::vector::norm;
use lobachevsky_hyp_ops::Manifold;
use rand::seq::index::sample;
use rand::Rng;

use crate::error::Result;

/// Above this many nodes, structural pairs come from a sample of BFS sources.
pub const MAX_HOP_SOURCES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LossTerms {
    pub task: f64,
    pub geometric: f64,
}

impl LossTerms {
    pub fn total(&self, geometric_weight: f64) -> f64 {
        self.task + geometric_weight * self.geometric
    }

    pub fn is_finite(&self) -> bool {
        self.task.is_finite() && self.geometric.is_finite()
    }
}

/// Index pairs the loss is evaluated on, fixed for one `train` call.
#[derive(Debug, Clone, Default)]
pub struct LossTargets {
    pub edges: Vec<(usize, usize)>,
    pub negatives: Vec<(usize, usize)>,
    pub hops: Vec<(usize, usize, f64)>,
}

impl LossTargets {
    pub fn build(dataset: &HyperbolicDataset, negatives_per_edge: usize, rng: &mut impl Rng) -> Self {
        let adj = dataset.adjacency();
        let n = adj.len();
        let edges: Vec<(usize, usize)> = dataset.edges().iter().copied().filter(|(a, b)| a != b).collect();
        let negatives = sample_non_edges(&adj, edges.len().saturating_mul(negatives_per_edge), rng);

        let (sources, all_pairs) = if n <= MAX_HOP_SOURCES {
            ((0..n).collect::<Vec<_>>(), true)
        } else {
            (sample(rng, n, MAX_HOP_SOURCES).into_vec(), false)
        };
        let mut hops = Vec::new();
        for s in sources {
            for (t, h) in hop_distances(&adj, s).into_iter().enumerate() {
                let keep = if all_pairs { t > s } else { t != s };
                if let (true, Some(h)) = (keep, h) {
                    hops.push((s, t, h as f64));
                }
            }
        }
        Self { edges, negatives, hops }
    }
}

pub fn compute_loss(
    manifold: &Manifold,
    embeddings: &[Vec<f64>],
    targets: &LossTargets,
    margin: f64,
) -> Result<LossTerms> {
    let d = |(a, b): (usize, usize)| manifold.distance(&embeddings[a], &embeddings[b]);

    let mut task = 0.0;
    if !targets.edges.is_empty() {
        let mut sum = 0.0;
        for &e in &targets.edges {
            sum += d(e)?.powi(2);
        }
        task += sum / targets.edges.len() as f64;
    }
    if !targets.negatives.is_empty() {
        let mut sum = 0.0;
        for &e in &targets.negatives {
            sum += (margin - d(e)?).max(0.0).powi(2);
        }
        task += sum / targets.negatives.len() as f64;
    }

    let norms: Vec<f64> = embeddings.iter().map(|x| norm(x)).collect();
    let mut geometric = variance(&norms);
    if !targets.hops.is_empty() {
        let mut sum = 0.0;
        for &(a, b, h) in &targets.hops {
            sum += (d((a, b))? - h).powi(2);
        }
        geometric += sum / targets.hops.len() as f64;
    }

    Ok(LossTerms { task, geometric })
}

fn variance(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}
