//! Minimum spanning forest
//!
//! Kruskal's algorithm over a CSR snapshot: edges sorted by weight (ties
//! broken on endpoint indices, so the chosen forest is deterministic),
//! accepted greedily through a union-find with path compression and
//! union by rank. Disconnected input yields a spanning forest, one tree
//! per component.

use crate::error::GraphError;
use crate::graph::{Graph, NodeKey};
use crate::storage::CompactRowGraph;
use anyhow::Result;

/// Edges of a minimum spanning forest plus their total weight.
#[derive(Debug, Clone)]
pub struct MstResult<N: NodeKey> {
    /// Accepted edges as `(source, target, weight)`, in acceptance order.
    pub edges: Vec<(N, N, f64)>,
    /// Sum of accepted edge weights.
    pub total_weight: f64,
}

impl<N: NodeKey> MstResult<N> {
    /// Number of edges in the forest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the forest has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

struct UnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let parent = (0..n as u32).collect();
        Self {
            parent,
            rank: vec![0; n],
        }
    }

    fn find(&mut self, node: u32) -> u32 {
        let mut root = node;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        // Path compression.
        let mut cursor = node;
        while self.parent[cursor as usize] != root {
            let next = self.parent[cursor as usize];
            self.parent[cursor as usize] = root;
            cursor = next;
        }
        root
    }

    /// Union by rank; returns `false` when both nodes already share a set.
    fn union(&mut self, a: u32, b: u32) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }
        match self.rank[root_a as usize].cmp(&self.rank[root_b as usize]) {
            std::cmp::Ordering::Less => self.parent[root_a as usize] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b as usize] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b as usize] = root_a;
                self.rank[root_a as usize] += 1;
            }
        }
        true
    }
}

/// Minimum spanning forest of an undirected graph.
///
/// Self-loops never enter a spanning tree and are skipped. A forest over
/// c components has exactly `n - c` edges.
///
/// # Errors
///
/// [`GraphError::DirectedUnsupported`] for directed input.
pub fn minimum_spanning_forest<N: NodeKey>(graph: &Graph<N>) -> Result<MstResult<N>> {
    if graph.is_directed() {
        return Err(GraphError::DirectedUnsupported("minimum_spanning_forest").into());
    }

    let csr = CompactRowGraph::from_graph(graph);
    let n = csr.node_count();

    // Each undirected edge once, smaller index first.
    let mut edges: Vec<(u32, u32, f64)> = Vec::with_capacity(csr.edge_count() / 2);
    for source in 0..n {
        #[allow(clippy::cast_possible_truncation)]
        let (cols, weights) = csr.neighbor_weights(source as u32)?;
        for (&target, &weight) in cols.iter().zip(weights.iter()) {
            #[allow(clippy::cast_possible_truncation)]
            if target > source as u32 {
                edges.push((source as u32, target, weight));
            }
        }
    }
    edges.sort_by(|a, b| {
        a.2.partial_cmp(&b.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.0, a.1).cmp(&(b.0, b.1)))
    });

    let mut uf = UnionFind::new(n);
    let mut accepted = Vec::new();
    let mut total_weight = 0.0;
    for (source, target, weight) in edges {
        if uf.union(source, target) {
            accepted.push((
                csr.index_to_node(source)?.clone(),
                csr.index_to_node(target)?.clone(),
                weight,
            ));
            total_weight += weight;
            if accepted.len() + 1 == n {
                break; // single spanning tree is complete
            }
        }
    }

    Ok(MstResult {
        edges: accepted,
        total_weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mst_known_weights() {
        let mut g = Graph::undirected();
        g.add_edge_weighted("a", "b", 1.0);
        g.add_edge_weighted("a", "c", 3.0);
        g.add_edge_weighted("b", "c", 3.0);
        g.add_edge_weighted("b", "d", 6.0);
        g.add_edge_weighted("c", "d", 4.0);

        let mst = minimum_spanning_forest(&g).unwrap();
        assert_eq!(mst.len(), 3);
        assert!((mst.total_weight - 8.0).abs() < 1e-12);

        let mut weights: Vec<f64> = mst.edges.iter().map(|&(_, _, w)| w).collect();
        weights.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(weights, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_mst_tie_break_deterministic() {
        // a-c and b-c tie at weight 3; the smaller index pair wins and
        // both runs must agree edge for edge.
        let mut g = Graph::undirected();
        g.add_edge_weighted("a", "b", 1.0);
        g.add_edge_weighted("a", "c", 3.0);
        g.add_edge_weighted("b", "c", 3.0);

        let first = minimum_spanning_forest(&g).unwrap();
        let second = minimum_spanning_forest(&g).unwrap();
        assert_eq!(first.edges, second.edges);
        assert!(first.edges.contains(&("a", "c", 3.0)));
    }

    #[test]
    fn test_mst_disconnected_forest() {
        let mut g = Graph::undirected();
        g.add_edge_weighted(0, 1, 1.0);
        g.add_edge_weighted(1, 2, 2.0);
        g.add_edge_weighted(10, 11, 5.0);

        let forest = minimum_spanning_forest(&g).unwrap();
        // 5 nodes, 2 components: 3 edges.
        assert_eq!(forest.len(), 3);
        assert!((forest.total_weight - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_mst_skips_self_loops() {
        let mut g = Graph::undirected();
        g.add_edge_weighted(0, 0, 0.1);
        g.add_edge_weighted(0, 1, 2.0);

        let mst = minimum_spanning_forest(&g).unwrap();
        assert_eq!(mst.len(), 1);
        assert!((mst.total_weight - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_mst_empty_and_single() {
        let empty: Graph<u32> = Graph::undirected();
        assert!(minimum_spanning_forest(&empty).unwrap().is_empty());

        let mut single = Graph::undirected();
        single.add_node(7);
        let mst = minimum_spanning_forest(&single).unwrap();
        assert!(mst.is_empty());
        assert_eq!(mst.total_weight, 0.0);
    }

    #[test]
    fn test_mst_rejects_directed() {
        let mut g = Graph::directed();
        g.add_edge(0, 1);
        let err = minimum_spanning_forest(&g).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::DirectedUnsupported(_))
        ));
    }
}
