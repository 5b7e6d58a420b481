//! Graph topology over index-based edge lists.
//!
//! Everything here ignores the embeddings: clustering and hop distances are
//! properties of the edge set alone.

use std::collections::{HashSet, VecDeque};

use rand::Rng;

/// Undirected adjacency lists. Sorted, deduplicated, self-loops dropped,
/// out-of-range edges ignored.
pub fn adjacency(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); n];
    for &(a, b) in edges {
        if a < n && b < n && a != b {
            adj[a].push(b);
            adj[b].push(a);
        }
    }
    for list in adj.iter_mut() {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

/// BFS hop counts from `source`; `None` for unreachable nodes.
pub fn hop_distances(adj: &[Vec<usize>], source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; adj.len()];
    if source >= adj.len() {
        return dist;
    }
    dist[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(u) = queue.pop_front() {
        let next = dist[u].map_or(0, |d| d + 1);
        for &v in &adj[u] {
            if dist[v].is_none() {
                dist[v] = Some(next);
                queue.push_back(v);
            }
        }
    }
    dist
}

/// Local clustering coefficient of each node: closed neighbour pairs over
/// possible pairs. Nodes with degree < 2 score 0.
pub fn local_clustering(adj: &[Vec<usize>]) -> Vec<f64> {
    let sets: Vec<HashSet<usize>> = adj.iter().map(|l| l.iter().copied().collect()).collect();
    adj.iter()
        .map(|nbrs| {
            let k = nbrs.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for (i, &a) in nbrs.iter().enumerate() {
                for &b in &nbrs[i + 1..] {
                    if sets[a].contains(&b) {
                        links += 1;
                    }
                }
            }
            2.0 * links as f64 / (k * (k - 1)) as f64
        })
        .collect()
}

/// Mean of [`local_clustering`] over all nodes; 0 for an empty graph.
pub fn average_clustering(adj: &[Vec<usize>]) -> f64 {
    if adj.is_empty() {
        return 0.0;
    }
    local_clustering(adj).iter().sum::<f64>() / adj.len() as f64
}

/// Among `candidates`, the node with the most neighbours (lowest index on
/// ties). Indices past the end of `adj` count as isolated.
pub fn max_degree_node<I>(adj: &[Vec<usize>], candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    let degree = |i: usize| adj.get(i).map_or(0, Vec::len);
    candidates
        .into_iter()
        .max_by(|&a, &b| degree(a).cmp(&degree(b)).then(b.cmp(&a)))
}

/// Sample up to `count` distinct unordered non-adjacent pairs.
///
/// Gives up after `20 · count` draws, so dense graphs may return fewer.
pub fn sample_non_edges(adj: &[Vec<usize>], count: usize, rng: &mut impl Rng) -> Vec<(usize, usize)> {
    let n = adj.len();
    let mut out = Vec::with_capacity(count);
    if n < 2 {
        return out;
    }
    let mut seen = HashSet::new();
    let mut attempts = 0usize;
    while out.len() < count && attempts < count.saturating_mul(20) {
        attempts += 1;
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if a == b {
            continue;
        }
        let pair = (a.min(b), a.max(b));
        if adj[pair.0].binary_search(&pair.1).is_ok() || !seen.insert(pair) {
            continue;
        }
        out.push(pair);
    }
    out
}
