//! Modularity framework
//!
//! Shared scoring utilities consumed by every community-detection
//! algorithm: total edge weight, weighted degree, neighbor-community
//! lookup, and the modularity score itself,
//!
//! ```text
//! Q = (1/2M) Σ_{i,j} [A_ij − γ·k_i·k_j/(2M)] · δ(c_i, c_j)
//! ```
//!
//! computed via per-community aggregates (internal weight and total degree)
//! rather than the O(n²) double sum. The resolution parameter γ scales the
//! null-model term: for any fixed partition with at least one inter-node
//! edge, raising γ strictly lowers Q.

use crate::error::GraphError;
use crate::graph::{Graph, NodeKey};
use anyhow::Result;
use std::collections::{BTreeSet, HashMap};

/// Total community assignment: every node in the graph maps to a label.
pub type Partition<N> = HashMap<N, usize>;

/// Sum of edge weights, each undirected edge counted once.
#[must_use]
pub fn total_edge_weight<N: NodeKey>(graph: &Graph<N>) -> f64 {
    graph.edges().map(|(_, _, w)| w).sum()
}

/// Sum of weights incident to `node`. Self-loops count once per incidence,
/// matching adjacency storage.
///
/// # Errors
///
/// [`GraphError::NodeNotFound`] if the node does not exist.
pub fn weighted_degree<N: NodeKey>(graph: &Graph<N>, node: &N) -> Result<f64> {
    Ok(graph.neighbors(node)?.map(|(_, w)| w).sum())
}

/// Community labels found among `node`'s neighbors, in ascending order.
/// Includes `node`'s own community exactly when a neighbor shares it.
///
/// # Errors
///
/// [`GraphError::NodeNotFound`] if the node does not exist, or
/// [`GraphError::PartialPartition`] if a neighbor has no label.
pub fn neighbor_communities<N: NodeKey>(
    graph: &Graph<N>,
    node: &N,
    partition: &Partition<N>,
) -> Result<BTreeSet<usize>> {
    let mut labels = BTreeSet::new();
    for (neighbor, _) in graph.neighbors(node)? {
        let label = partition
            .get(neighbor)
            .ok_or_else(|| GraphError::PartialPartition(format!("{neighbor:?}")))?;
        labels.insert(*label);
    }
    Ok(labels)
}

/// Modularity of `partition` at the given resolution.
///
/// Returns 0.0 for an edgeless graph. O(n + m) via per-community
/// aggregates.
///
/// # Errors
///
/// [`GraphError::DirectedUnsupported`] for directed graphs (the null model
/// here is undirected), or [`GraphError::PartialPartition`] if any node
/// lacks a label.
pub fn modularity<N: NodeKey>(
    graph: &Graph<N>,
    partition: &Partition<N>,
    resolution: f64,
) -> Result<f64> {
    if graph.is_directed() {
        return Err(GraphError::DirectedUnsupported("modularity").into());
    }

    let m = total_edge_weight(graph);
    if m == 0.0 {
        return Ok(0.0);
    }
    let two_m = 2.0 * m;

    // Per-community aggregates: total weighted degree and internal weight.
    // Iterating adjacency counts each intra-community edge from both
    // endpoints (and self-loops once), matching the A_ij double sum.
    let mut community_degree: HashMap<usize, f64> = HashMap::new();
    let mut community_internal: HashMap<usize, f64> = HashMap::new();

    for node in graph.nodes() {
        let label = *partition
            .get(node)
            .ok_or_else(|| GraphError::PartialPartition(format!("{node:?}")))?;
        let k = weighted_degree(graph, node)?;
        *community_degree.entry(label).or_insert(0.0) += k;

        for (neighbor, weight) in graph.neighbors(node)? {
            let neighbor_label = partition
                .get(neighbor)
                .ok_or_else(|| GraphError::PartialPartition(format!("{neighbor:?}")))?;
            if *neighbor_label == label {
                *community_internal.entry(label).or_insert(0.0) += weight;
            }
        }
    }

    let mut q = 0.0;
    for (label, degree) in &community_degree {
        let internal = community_internal.get(label).copied().unwrap_or(0.0);
        q += internal / two_m - resolution * (degree / two_m).powi(2);
    }
    Ok(q)
}

/// Relabel a partition onto the dense range `0..k`, assigning labels in
/// ascending order of the original ones.
#[must_use]
pub fn renumber_partition<N: NodeKey>(partition: &Partition<N>) -> Partition<N> {
    let mut labels: Vec<usize> = partition.values().copied().collect();
    labels.sort_unstable();
    labels.dedup();
    let dense: HashMap<usize, usize> = labels
        .into_iter()
        .enumerate()
        .map(|(new, old)| (old, new))
        .collect();
    partition
        .iter()
        .map(|(node, label)| (node.clone(), dense[label]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Graph<u32> {
        let mut g = Graph::undirected();
        for &(s, t) in &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)] {
            g.add_edge(s, t);
        }
        g
    }

    fn split_partition() -> Partition<u32> {
        (0..6_u32).map(|v| (v, usize::from(v >= 3))).collect()
    }

    #[test]
    fn test_total_edge_weight_undirected_counts_once() {
        let mut g = Graph::undirected();
        g.add_edge_weighted(0, 1, 2.0);
        g.add_edge_weighted(1, 2, 3.0);
        assert!((total_edge_weight(&g) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_total_edge_weight_directed() {
        let mut g = Graph::directed();
        g.add_edge_weighted(0, 1, 2.0);
        g.add_edge_weighted(1, 0, 3.0);
        assert!((total_edge_weight(&g) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_degree() {
        let mut g = Graph::undirected();
        g.add_edge_weighted(0, 1, 2.0);
        g.add_edge_weighted(0, 2, 3.0);
        g.add_edge_weighted(0, 0, 4.0); // self-loop, counted once
        assert!((weighted_degree(&g, &0).unwrap() - 9.0).abs() < 1e-12);
        assert!(weighted_degree(&g, &9).is_err());
    }

    #[test]
    fn test_neighbor_communities() {
        let g = two_triangles();
        let partition = split_partition();

        // Node 2 touches its own community (0) and the other triangle (1).
        let labels = neighbor_communities(&g, &2, &partition).unwrap();
        assert_eq!(labels.into_iter().collect::<Vec<_>>(), vec![0, 1]);

        // Node 4's neighbors are all in community 1.
        let labels = neighbor_communities(&g, &4, &partition).unwrap();
        assert_eq!(labels.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_modularity_good_split_beats_singletons() {
        let g = two_triangles();
        let split = split_partition();
        let singletons: Partition<u32> = (0..6_u32).map(|v| (v, v as usize)).collect();

        let q_split = modularity(&g, &split, 1.0).unwrap();
        let q_single = modularity(&g, &singletons, 1.0).unwrap();
        assert!(q_split > q_single);
        assert!(q_split > 0.0);
    }

    #[test]
    fn test_modularity_known_value() {
        // Two triangles + bridge, split by triangle: each community has
        // internal weight 6 (3 edges, both directions), degree 7; M = 7.
        // Q = 2 * (6/14 - (7/14)^2) = 2 * (3/7 - 1/4) = 5/14.
        let g = two_triangles();
        let q = modularity(&g, &split_partition(), 1.0).unwrap();
        assert!((q - 5.0 / 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_modularity_edgeless_graph_is_zero() {
        let mut g: Graph<u32> = Graph::undirected();
        g.add_node(0);
        g.add_node(1);
        let partition: Partition<u32> = [(0, 0), (1, 1)].into_iter().collect();
        assert_eq!(modularity(&g, &partition, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_modularity_strictly_decreasing_in_resolution() {
        let g = two_triangles();
        let partition = split_partition();
        let low = modularity(&g, &partition, 0.5).unwrap();
        let high = modularity(&g, &partition, 2.0).unwrap();
        assert!(low > high);
    }

    #[test]
    fn test_modularity_rejects_directed() {
        let mut g = Graph::directed();
        g.add_edge(0, 1);
        let partition: Partition<u32> = [(0, 0), (1, 0)].into_iter().collect();
        let err = modularity(&g, &partition, 1.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::DirectedUnsupported(_))
        ));
    }

    #[test]
    fn test_modularity_rejects_partial_partition() {
        let mut g = Graph::undirected();
        g.add_edge(0, 1);
        let partition: Partition<u32> = [(0, 0)].into_iter().collect();
        let err = modularity(&g, &partition, 1.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::PartialPartition(_))
        ));
    }

    #[test]
    fn test_renumber_partition_dense() {
        let partition: Partition<u32> = [(0, 7), (1, 7), (2, 3), (3, 12)].into_iter().collect();
        let dense = renumber_partition(&partition);

        assert_eq!(dense[&2], 0); // label 3 -> 0
        assert_eq!(dense[&0], 1); // label 7 -> 1
        assert_eq!(dense[&1], 1);
        assert_eq!(dense[&3], 2); // label 12 -> 2
    }
}
