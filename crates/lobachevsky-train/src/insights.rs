//! Prediction output: embeddings, per-node confidence and graph-level insights.

use lobachevsky_dataset::topology::max_degree_node;
use lobachevsky_dataset::HyperbolicDataset;
use lobachevsky_hyp_ops::vector::norm;
use lobachevsky_hyp_ops::{Embedding, Manifold};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometricInsights {
    /// Largest geodesic distance from the inferred root.
    pub hierarchy_depth: f64,
    /// Average local clustering of the edge set.
    pub clustering_coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResult {
    pub embeddings: Vec<Vec<f64>>,
    pub confidence: Vec<f64>,
    pub geometric_insights: GeometricInsights,
}

impl PredictResult {
    /// Stamp each row as an [`Embedding`] record under `manifold`.
    pub fn to_embeddings(&self, manifold: &Manifold) -> Result<Vec<Embedding>> {
        self.embeddings
            .iter()
            .zip(&self.confidence)
            .map(|(x, &c)| -> Result<Embedding> { Ok(Embedding::new(x.clone(), manifold, c)?) })
            .collect()
    }
}

/// Norm gap under which two nodes count as equally close to the origin.
const ROOT_TIE_TOL: f64 = 1e-9;

/// The root is the embedding closest to the origin. Nodes tied on norm are
/// split by degree in `adjacency`, then by lowest index.
pub fn infer_root(embeddings: &[Vec<f64>], adjacency: &[Vec<usize>]) -> Option<usize> {
    let norms: Vec<f64> = embeddings.iter().map(|x| norm(x)).collect();
    let min = norms.iter().copied().min_by(f64::total_cmp)?;
    let tied = norms
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n <= min + ROOT_TIE_TOL)
        .map(|(i, _)| i);
    max_degree_node(adjacency, tied)
}

pub fn geometric_insights(
    manifold: &Manifold,
    embeddings: &[Vec<f64>],
    dataset: &HyperbolicDataset,
) -> Result<GeometricInsights> {
    let mut hierarchy_depth = 0.0_f64;
    if let Some(root) = infer_root(embeddings, &dataset.adjacency()) {
        for x in embeddings {
            hierarchy_depth = hierarchy_depth.max(manifold.distance(&embeddings[root], x)?);
        }
    }
    Ok(GeometricInsights {
        hierarchy_depth,
        clustering_coefficient: dataset.clustering_coefficient(),
    })
}

/// Per-node confidence in [0, 1].
///
/// With attention margins available they are used directly. Otherwise a node
/// scores the mean `exp(−d)` to its neighbours, and isolated nodes score 0.
pub fn confidence(
    manifold: &Manifold,
    embeddings: &[Vec<f64>],
    adjacency: &[Vec<usize>],
    margins: Option<&[f64]>,
) -> Result<Vec<f64>> {
    if let Some(m) = margins.filter(|m| m.len() == embeddings.len()) {
        return Ok(m.iter().map(|x| x.clamp(0.0, 1.0)).collect());
    }
    embeddings
        .iter()
        .zip(adjacency)
        .map(|(x, nbrs)| -> Result<f64> {
            if nbrs.is_empty() {
                return Ok(0.0);
            }
            let mut sum = 0.0;
            for &j in nbrs {
                sum += (-manifold.distance(x, &embeddings[j])?).exp();
            }
            Ok(sum / nbrs.len() as f64)
        })
        .collect()
}
