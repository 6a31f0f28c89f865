//! Louvain-style community detection
//!
//! Greedy modularity optimization (Blondel et al., 2008) with two
//! alternating phases:
//!
//! 1. **Local moving**: every node is offered to each community found
//!    among its neighbors and takes the move with the best strictly
//!    positive modularity gain, computed in closed form from the
//!    community's aggregate degree and the node's edge weight into it.
//!    Passes repeat until a full pass moves nothing or `max_iterations`
//!    is hit.
//! 2. **Aggregation**: communities collapse into super-nodes. Edge weight
//!    between two super-nodes is the total weight crossing between the
//!    communities, and intra-community weight accumulates as self-loops.
//!    Local moving recurses on the coarser graph.
//!
//! The final partition composes the per-level mappings back to original
//! node ids and is renumbered onto `0..k`. Visit order is shuffled with a
//! seeded RNG, so a fixed seed and input always produce the same partition.
//!
//! Policy variants layered on the same core: per-level partitions on the
//! result (hierarchical cut selection), [`resolution_scan`], and the
//! `min_community_size` post-filter.

use crate::algorithms::modularity::{modularity, renumber_partition, Partition};
use crate::error::GraphError;
use crate::graph::{Graph, NodeKey};
use crate::storage::CompactRowGraph;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Tuning for community detection.
#[derive(Debug, Clone, Copy)]
pub struct CommunityOptions {
    /// Resolution γ of the modularity objective. Higher values favor more,
    /// smaller communities.
    pub resolution: f64,
    /// Cap on local-moving passes per level.
    pub max_iterations: usize,
    /// Minimum gain for a move to count as an improvement.
    pub tolerance: f64,
    /// Seed for the visit-order shuffle. Same seed, same partition.
    pub seed: u64,
    /// If set, communities smaller than this are merged into their most
    /// strongly connected neighbor community after optimization.
    pub min_community_size: Option<usize>,
}

impl Default for CommunityOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_iterations: 100,
            tolerance: 1e-9,
            seed: 0,
            min_community_size: None,
        }
    }
}

/// Outcome of a community-detection run.
#[derive(Debug, Clone)]
pub struct CommunityResult<N: NodeKey> {
    /// Final community label per node, dense in `0..num_communities`.
    pub partition: Partition<N>,
    /// Number of distinct communities.
    pub num_communities: usize,
    /// Modularity of the final partition at the requested resolution.
    pub modularity: f64,
    /// Composed partition after each aggregation level, coarsest last.
    /// Useful for picking a cut higher up the hierarchy.
    pub levels: Vec<Partition<N>>,
    /// Total local-moving passes across all levels.
    pub iterations: usize,
}

impl<N: NodeKey> CommunityResult<N> {
    /// Community label of `node`, if it was in the input graph.
    #[must_use]
    pub fn community_of(&self, node: &N) -> Option<usize> {
        self.partition.get(node).copied()
    }

    /// Communities as sorted member lists, indexed by label.
    #[must_use]
    pub fn communities(&self) -> Vec<Vec<N>> {
        let mut groups = vec![Vec::new(); self.num_communities];
        for (node, &label) in &self.partition {
            groups[label].push(node.clone());
        }
        for group in &mut groups {
            group.sort_unstable();
        }
        groups
    }
}

/// Working representation of one aggregation level. Self-loops are kept
/// out of the adjacency rows; a loop of weight w contributes 2w to its
/// node's degree, the convention the gain formula assumes.
struct LevelGraph {
    adj: Vec<Vec<(u32, f64)>>,
    self_loop: Vec<f64>,
    degree: Vec<f64>,
    two_m: f64,
}

impl LevelGraph {
    fn from_snapshot<N: NodeKey>(csr: &CompactRowGraph<N>) -> Result<Self> {
        let n = csr.node_count();
        let mut adj = vec![Vec::new(); n];
        let mut self_loop = vec![0.0; n];

        for i in 0..n {
            #[allow(clippy::cast_possible_truncation)]
            let (cols, weights) = csr.neighbor_weights(i as u32)?;
            for (&j, &w) in cols.iter().zip(weights.iter()) {
                if j as usize == i {
                    self_loop[i] += w;
                } else {
                    adj[i].push((j, w));
                }
            }
        }

        Ok(Self::assemble(adj, self_loop))
    }

    fn assemble(adj: Vec<Vec<(u32, f64)>>, self_loop: Vec<f64>) -> Self {
        let degree: Vec<f64> = adj
            .iter()
            .zip(self_loop.iter())
            .map(|(row, &loop_w)| row.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * loop_w)
            .collect();
        let two_m = degree.iter().sum();
        Self {
            adj,
            self_loop,
            degree,
            two_m,
        }
    }

    fn node_count(&self) -> usize {
        self.adj.len()
    }
}

/// Detect communities with the two-phase Louvain core.
///
/// Disconnected graphs are valid input and simply yield per-component
/// communities. An edgeless graph degenerates to all-singletons with
/// modularity 0.
///
/// # Errors
///
/// [`GraphError::DirectedUnsupported`] for directed input; fails before
/// any optimization work.
pub fn louvain<N: NodeKey>(
    graph: &Graph<N>,
    options: CommunityOptions,
) -> Result<CommunityResult<N>> {
    if graph.is_directed() {
        return Err(GraphError::DirectedUnsupported("louvain").into());
    }

    let csr = CompactRowGraph::from_graph(graph);
    let n = csr.node_count();
    if n == 0 {
        return Ok(CommunityResult {
            partition: Partition::new(),
            num_communities: 0,
            modularity: 0.0,
            levels: Vec::new(),
            iterations: 0,
        });
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut level_graph = LevelGraph::from_snapshot(&csr)?;

    // Original node index -> community at the current level.
    #[allow(clippy::cast_possible_truncation)]
    let mut mapping: Vec<u32> = (0..n as u32).collect();
    let mut levels = Vec::new();
    let mut total_passes = 0;

    loop {
        let moves = local_move(&level_graph, &options, &mut rng);
        total_passes += moves.passes;

        let (aggregated, dense) = aggregate(&level_graph, &moves.community);
        for slot in &mut mapping {
            *slot = dense[moves.community[*slot as usize] as usize];
        }
        levels.push(partition_from_mapping(&csr, &mapping)?);

        let shrunk = aggregated.node_count() < level_graph.node_count();
        level_graph = aggregated;
        if !moves.moved_any || !shrunk {
            break;
        }
    }

    let mut partition = levels.last().cloned().unwrap_or_default();

    if let Some(min_size) = options.min_community_size {
        partition = merge_small_communities(graph, partition, min_size)?;
        partition = renumber_partition(&partition);
    }

    let q = modularity(graph, &partition, options.resolution)?;
    let num_communities = count_labels(&partition);

    Ok(CommunityResult {
        partition,
        num_communities,
        modularity: q,
        levels,
        iterations: total_passes,
    })
}

/// Run [`louvain`] at each resolution and keep the partition scoring the
/// highest modularity at γ = 1.0 (comparable across runs). Earlier
/// resolutions win ties.
///
/// # Errors
///
/// Same conditions as [`louvain`]. An empty resolution list falls back to
/// a single run at `options.resolution`.
pub fn resolution_scan<N: NodeKey>(
    graph: &Graph<N>,
    resolutions: &[f64],
    options: CommunityOptions,
) -> Result<CommunityResult<N>> {
    let mut best: Option<(f64, CommunityResult<N>)> = None;
    for &resolution in resolutions {
        let result = louvain(
            graph,
            CommunityOptions {
                resolution,
                ..options
            },
        )?;
        let score = modularity(graph, &result.partition, 1.0)?;
        let better = best
            .as_ref()
            .map_or(true, |(best_score, _)| score > *best_score);
        if better {
            best = Some((score, result));
        }
    }

    match best {
        Some((_, result)) => Ok(result),
        None => louvain(graph, options),
    }
}

struct LocalMoves {
    community: Vec<u32>,
    passes: usize,
    moved_any: bool,
}

/// One round of greedy local moving over a level graph.
fn local_move(level: &LevelGraph, options: &CommunityOptions, rng: &mut StdRng) -> LocalMoves {
    let n = level.node_count();
    #[allow(clippy::cast_possible_truncation)]
    let mut community: Vec<u32> = (0..n as u32).collect();
    let mut community_degree = level.degree.clone();

    #[allow(clippy::cast_possible_truncation)]
    let mut order: Vec<u32> = (0..n as u32).collect();
    order.shuffle(rng);

    let mut passes = 0;
    let mut moved_any = false;

    loop {
        passes += 1;
        let mut moved_this_pass = false;

        for &node in &order {
            let node_idx = node as usize;
            let current = community[node_idx];
            let k = level.degree[node_idx];

            // Edge weight from the node into each neighboring community.
            // BTreeMap keeps candidate order deterministic.
            let mut links: BTreeMap<u32, f64> = BTreeMap::new();
            for &(neighbor, weight) in &level.adj[node_idx] {
                *links.entry(community[neighbor as usize]).or_insert(0.0) += weight;
            }

            // Gains are evaluated with the node lifted out of its community.
            community_degree[current as usize] -= k;

            let gain_of = |label: u32, link_weight: f64| {
                link_weight
                    - options.resolution * community_degree[label as usize] * k / level.two_m
            };

            let stay_gain = gain_of(current, links.get(&current).copied().unwrap_or(0.0));
            let mut best_label = current;
            let mut best_gain = stay_gain;
            for (&label, &link_weight) in &links {
                if label == current {
                    continue;
                }
                let gain = gain_of(label, link_weight);
                if gain > best_gain + options.tolerance {
                    best_label = label;
                    best_gain = gain;
                }
            }

            community[node_idx] = best_label;
            community_degree[best_label as usize] += k;
            if best_label != current {
                moved_this_pass = true;
                moved_any = true;
            }
        }

        if !moved_this_pass || passes >= options.max_iterations {
            break;
        }
    }

    LocalMoves {
        community,
        passes,
        moved_any,
    }
}

/// Collapse communities into super-nodes. Returns the coarser level and
/// the dense relabeling applied to the community ids.
fn aggregate(level: &LevelGraph, community: &[u32]) -> (LevelGraph, Vec<u32>) {
    let n = level.node_count();

    // Dense renumbering of surviving labels, ascending.
    let mut labels: Vec<u32> = community.to_vec();
    labels.sort_unstable();
    labels.dedup();
    let mut dense = vec![0_u32; n];
    for (new, &old) in labels.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        {
            dense[old as usize] = new as u32;
        }
    }

    let k = labels.len();
    let mut self_loop = vec![0.0; k];
    let mut cross: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); k];

    for i in 0..n {
        let ci = dense[community[i] as usize];
        self_loop[ci as usize] += level.self_loop[i];
        for &(j, w) in &level.adj[i] {
            if (j as usize) < i {
                continue; // count each undirected pair once
            }
            let cj = dense[community[j as usize] as usize];
            if ci == cj {
                self_loop[ci as usize] += w;
            } else {
                *cross[ci as usize].entry(cj).or_insert(0.0) += w;
                *cross[cj as usize].entry(ci).or_insert(0.0) += w;
            }
        }
    }

    let adj: Vec<Vec<(u32, f64)>> = cross
        .into_iter()
        .map(|row| row.into_iter().collect())
        .collect();

    (LevelGraph::assemble(adj, self_loop), dense)
}

fn partition_from_mapping<N: NodeKey>(
    csr: &CompactRowGraph<N>,
    mapping: &[u32],
) -> Result<Partition<N>> {
    let mut partition = Partition::new();
    for (index, &label) in mapping.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let id = csr.index_to_node(index as u32)?;
        partition.insert(id.clone(), label as usize);
    }
    Ok(partition)
}

fn count_labels<N: NodeKey>(partition: &Partition<N>) -> usize {
    let mut labels: Vec<usize> = partition.values().copied().collect();
    labels.sort_unstable();
    labels.dedup();
    labels.len()
}

/// Merge communities smaller than `min_size` into the neighbor community
/// they share the most edge weight with. Communities with no external
/// edges are left alone; there is nothing to merge them into.
fn merge_small_communities<N: NodeKey>(
    graph: &Graph<N>,
    mut partition: Partition<N>,
    min_size: usize,
) -> Result<Partition<N>> {
    let max_rounds = count_labels(&partition);
    for _ in 0..max_rounds {
        let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();
        for &label in partition.values() {
            *sizes.entry(label).or_insert(0) += 1;
        }

        let undersized: Vec<usize> = sizes
            .iter()
            .filter(|&(_, &size)| size < min_size)
            .map(|(&label, _)| label)
            .collect();
        if undersized.is_empty() {
            break;
        }

        let mut merged_any = false;
        for label in undersized {
            let members: Vec<N> = partition
                .iter()
                .filter(|&(_, &l)| l == label)
                .map(|(node, _)| node.clone())
                .collect();

            // Strongest-connected neighbor community; smallest label wins ties.
            let mut connection: BTreeMap<usize, f64> = BTreeMap::new();
            for node in &members {
                for (neighbor, weight) in graph.neighbors(node)? {
                    let other = *partition
                        .get(neighbor)
                        .ok_or_else(|| GraphError::PartialPartition(format!("{neighbor:?}")))?;
                    if other != label {
                        *connection.entry(other).or_insert(0.0) += weight;
                    }
                }
            }

            let target = connection
                .iter()
                .max_by(|a, b| {
                    a.1.partial_cmp(b.1)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(b.0.cmp(a.0))
                })
                .map(|(&l, _)| l);

            if let Some(target) = target {
                for node in members {
                    partition.insert(node, target);
                }
                merged_any = true;
            }
        }

        if !merged_any {
            break;
        }
    }
    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles_with_bridge() -> Graph<u32> {
        let mut g = Graph::undirected();
        for &(s, t) in &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)] {
            g.add_edge(s, t);
        }
        g
    }

    #[test]
    fn test_louvain_empty_graph() {
        let g: Graph<u32> = Graph::undirected();
        let result = louvain(&g, CommunityOptions::default()).unwrap();
        assert_eq!(result.num_communities, 0);
        assert!(result.partition.is_empty());
    }

    #[test]
    fn test_louvain_edgeless_graph_singletons() {
        let mut g: Graph<u32> = Graph::undirected();
        g.add_node(0);
        g.add_node(1);
        g.add_node(2);

        let result = louvain(&g, CommunityOptions::default()).unwrap();
        assert_eq!(result.partition.len(), 3);
        assert_eq!(result.num_communities, 3);
        assert_eq!(result.modularity, 0.0);
    }

    #[test]
    fn test_louvain_two_triangles() {
        let g = two_triangles_with_bridge();
        let result = louvain(&g, CommunityOptions::default()).unwrap();

        assert_eq!(result.num_communities, 2);
        assert_eq!(result.community_of(&0), result.community_of(&1));
        assert_eq!(result.community_of(&1), result.community_of(&2));
        assert_eq!(result.community_of(&3), result.community_of(&4));
        assert_eq!(result.community_of(&4), result.community_of(&5));
        assert_ne!(result.community_of(&0), result.community_of(&3));
        assert!(result.modularity > 0.0);
    }

    #[test]
    fn test_louvain_beats_singleton_partition() {
        let g = two_triangles_with_bridge();
        let singletons: Partition<u32> = (0..6_u32).map(|v| (v, v as usize)).collect();
        let q_singletons = modularity(&g, &singletons, 1.0).unwrap();

        let result = louvain(&g, CommunityOptions::default()).unwrap();
        assert!(result.modularity >= q_singletons);
    }

    #[test]
    fn test_partition_total_and_dense() {
        let g = two_triangles_with_bridge();
        let result = louvain(&g, CommunityOptions::default()).unwrap();

        assert_eq!(result.partition.len(), 6); // every node labeled
        let mut labels: Vec<usize> = result.partition.values().copied().collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels, (0..result.num_communities).collect::<Vec<_>>());
    }

    #[test]
    fn test_louvain_rejects_directed() {
        let mut g = Graph::directed();
        g.add_edge(0, 1);
        let err = louvain(&g, CommunityOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::DirectedUnsupported("louvain"))
        ));
    }

    #[test]
    fn test_louvain_disconnected_components() {
        let mut g = Graph::undirected();
        for &(s, t) in &[(0, 1), (1, 2), (2, 0), (10, 11), (11, 12), (12, 10)] {
            g.add_edge(s, t);
        }
        let result = louvain(&g, CommunityOptions::default()).unwrap();
        assert_eq!(result.num_communities, 2);
        assert_ne!(result.community_of(&0), result.community_of(&10));
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let g = two_triangles_with_bridge();
        let options = CommunityOptions {
            seed: 42,
            ..CommunityOptions::default()
        };
        let a = louvain(&g, options).unwrap();
        let b = louvain(&g, options).unwrap();
        assert_eq!(a.partition, b.partition);
        assert!((a.modularity - b.modularity).abs() < f64::EPSILON);
    }

    #[test]
    fn test_levels_recorded() {
        let g = two_triangles_with_bridge();
        let result = louvain(&g, CommunityOptions::default()).unwrap();

        assert!(!result.levels.is_empty());
        // Every level partition is total.
        for level in &result.levels {
            assert_eq!(level.len(), 6);
        }
        // The last level is the final partition (no post-filter configured).
        assert_eq!(result.levels.last(), Some(&result.partition));
    }

    #[test]
    fn test_min_community_size_filter() {
        // Triangle plus a pendant pair weakly attached to it.
        let mut g = Graph::undirected();
        for &(s, t) in &[(0, 1), (1, 2), (2, 0)] {
            g.add_edge(s, t);
        }
        g.add_edge_weighted(2, 3, 0.1);
        g.add_edge_weighted(3, 4, 1.0);

        let options = CommunityOptions {
            min_community_size: Some(3),
            ..CommunityOptions::default()
        };
        let result = louvain(&g, options).unwrap();

        for group in result.communities() {
            assert!(group.len() >= 3, "undersized community {group:?}");
        }
    }

    #[test]
    fn test_resolution_scan_picks_best() {
        let g = two_triangles_with_bridge();
        let scanned = resolution_scan(&g, &[0.5, 1.0, 2.0], CommunityOptions::default()).unwrap();
        let plain = louvain(&g, CommunityOptions::default()).unwrap();

        let q_scanned = modularity(&g, &scanned.partition, 1.0).unwrap();
        let q_plain = modularity(&g, &plain.partition, 1.0).unwrap();
        assert!(q_scanned >= q_plain - 1e-12);
    }

    #[test]
    fn test_resolution_scan_empty_list_falls_back() {
        let g = two_triangles_with_bridge();
        let result = resolution_scan(&g, &[], CommunityOptions::default()).unwrap();
        assert_eq!(result.num_communities, 2);
    }

    #[test]
    fn test_higher_resolution_never_coarser() {
        let g = two_triangles_with_bridge();
        let coarse = louvain(
            &g,
            CommunityOptions {
                resolution: 0.5,
                ..CommunityOptions::default()
            },
        )
        .unwrap();
        let fine = louvain(
            &g,
            CommunityOptions {
                resolution: 2.0,
                ..CommunityOptions::default()
            },
        )
        .unwrap();
        assert!(fine.num_communities >= coarse.num_communities);
    }
}
