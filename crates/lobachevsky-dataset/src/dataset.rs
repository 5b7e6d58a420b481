//! The graph + embedding bundle consumed by training and prediction.

use lobachevsky_hyp_ops::vector::{is_finite, norm};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::topology;

/// Node embeddings, an edge list and optional per-node depth labels.
///
/// Read-only once built; construction and deserialisation both validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct HyperbolicDataset {
    nodes: Vec<Vec<f64>>,
    edges: Vec<(usize, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    depths: Option<Vec<usize>>,
}

#[derive(Deserialize)]
struct RawDataset {
    nodes: Vec<Vec<f64>>,
    edges: Vec<(usize, usize)>,
    #[serde(default)]
    depths: Option<Vec<usize>>,
}

impl TryFrom<RawDataset> for HyperbolicDataset {
    type Error = DatasetError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        let ds = HyperbolicDataset::new(raw.nodes, raw.edges)?;
        match raw.depths {
            Some(d) => ds.with_depths(d),
            None => Ok(ds),
        }
    }
}

impl HyperbolicDataset {
    pub fn new(nodes: Vec<Vec<f64>>, edges: Vec<(usize, usize)>) -> Result<Self> {
        let ds = Self { nodes, edges, depths: None };
        ds.validate()?;
        Ok(ds)
    }

    /// Attach one depth label per node.
    pub fn with_depths(mut self, depths: Vec<usize>) -> Result<Self> {
        if depths.len() != self.nodes.len() {
            return Err(DatasetError::DimensionMismatch { expected: self.nodes.len(), got: depths.len() });
        }
        self.depths = Some(depths);
        Ok(self)
    }

    /// Non-empty, one dimension throughout, edges in range, every node in the ball.
    pub fn validate(&self) -> Result<()> {
        let dim = self.nodes.first().ok_or(DatasetError::Empty)?.len();
        if dim == 0 {
            return Err(DatasetError::InvalidParameter { name: "dim", value: 0.0 });
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if node.len() != dim {
                return Err(DatasetError::DimensionMismatch { expected: dim, got: node.len() });
            }
            let n = norm(node);
            if !is_finite(node) || n >= 1.0 {
                return Err(DatasetError::OutOfBall { index, norm: n });
            }
        }
        let count = self.nodes.len();
        if let Some(&(from, to)) = self.edges.iter().find(|&&(a, b)| a >= count || b >= count) {
            return Err(DatasetError::EdgeOutOfRange { from, to, nodes: count });
        }
        if let Some(d) = &self.depths {
            if d.len() != count {
                return Err(DatasetError::DimensionMismatch { expected: count, got: d.len() });
            }
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Vec<f64>] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn depths(&self) -> Option<&[usize]> {
        self.depths.as_deref()
    }

    pub fn dim(&self) -> usize {
        self.nodes.first().map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Undirected adjacency lists, see [`topology::adjacency`].
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        topology::adjacency(self.nodes.len(), &self.edges)
    }

    pub fn clustering_coefficient(&self) -> f64 {
        topology::average_clustering(&self.adjacency())
    }
}
