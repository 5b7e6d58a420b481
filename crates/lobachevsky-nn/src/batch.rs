//! One graph's worth of node embeddings plus its undirected neighbourhoods.

use std::sync::Arc;

use crate::error::{LayerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeBatch {
    nodes: Vec<Vec<f64>>,
    /// Sorted, deduplicated, self excluded. Shared between the batches a stack produces.
    neighbors: Arc<Vec<Vec<usize>>>,
}

impl NodeBatch {
    /// Validate shapes and build the adjacency lists.
    ///
    /// Edges are read as undirected; self-loops and duplicates are dropped.
    pub fn new(nodes: Vec<Vec<f64>>, edges: &[(usize, usize)]) -> Result<Self> {
        let dim = nodes.first().ok_or(LayerError::NullInput("no nodes"))?.len();
        if dim == 0 {
            return Err(LayerError::NullInput("zero-dimensional nodes"));
        }
        if let Some(bad) = nodes.iter().find(|n| n.len() != dim) {
            return Err(LayerError::DimensionMismatch { expected: dim, got: bad.len() });
        }

        let n = nodes.len();
        let mut neighbors = vec![Vec::new(); n];
        for &(from, to) in edges {
            if from >= n || to >= n {
                return Err(LayerError::EdgeOutOfRange { from, to, nodes: n });
            }
            if from != to {
                neighbors[from].push(to);
                neighbors[to].push(from);
            }
        }
        for list in neighbors.iter_mut() {
            list.sort_unstable();
            list.dedup();
        }

        Ok(Self { nodes, neighbors: Arc::new(neighbors) })
    }

    /// Nodes with no edges.
    pub fn isolated(nodes: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(nodes, &[])
    }

    /// Same topology, new embeddings.
    pub(crate) fn with_nodes(&self, nodes: Vec<Vec<f64>>) -> Self {
        Self { nodes, neighbors: Arc::clone(&self.neighbors) }
    }

    pub fn nodes(&self) -> &[Vec<f64>] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Vec<f64>> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.nodes.first().map_or(0, Vec::len)
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        self.neighbors.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `node` followed by its neighbours.
    pub fn neighborhood(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(1 + self.neighbors(node).len());
        out.push(node);
        out.extend_from_slice(self.neighbors(node));
        out
    }

    /// Mean Euclidean norm of the node embeddings.
    pub fn mean_norm(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let total: f64 = self.nodes.iter().map(|n| lobachevsky_hyp_ops::vector::norm(n)).sum();
        total / self.nodes.len() as f64
    }
}
