//! Direction-optimized breadth-first search
//!
//! Beamer-style hybrid BFS (Beamer, Asanović & Patterson, SC 2012) over a
//! [`CompactRowGraph`]. Each level is expanded either top-down (scan the
//! frontier's out-edges) or bottom-up (scan unvisited nodes' in-edges for a
//! frontier member), chosen by a cost heuristic:
//!
//! - expand top-down while `frontier_edges × α < unvisited_edges`;
//! - once bottom-up, return to top-down when `|frontier| × β < n`.
//!
//! The switch is purely a cost optimization: both strategies produce the
//! distances and parent tree of [`naive_bfs`], which is kept as the semantic
//! reference (and the fallback for callers that want a plain queue BFS).
//!
//! State is deliberately compact: a [`BitSet`] frontier, a [`BitVec`]
//! visited mask, a 16-bit [`DistanceArray`], and an `i32` parent array with
//! `-1` meaning "no parent".

use crate::bits::{BitSet, BitVec, DistanceArray, UNREACHED};
use crate::graph::NodeKey;
use crate::storage::CompactRowGraph;
use anyhow::Result;
use std::collections::HashMap;

/// Tuning knobs for the direction switch.
#[derive(Debug, Clone, Copy)]
pub struct BfsOptions {
    /// Top-down edge-cost multiplier. Higher values keep the search
    /// top-down longer.
    pub alpha: f64,
    /// Frontier-size divisor for switching back to top-down.
    pub beta: f64,
}

impl Default for BfsOptions {
    /// Beamer's published defaults.
    fn default() -> Self {
        Self {
            alpha: 14.0,
            beta: 24.0,
        }
    }
}

/// Expansion strategy for one BFS level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    TopDown,
    BottomUp,
}

/// Distances and parent tree produced by a BFS.
#[derive(Debug, Clone)]
pub struct BfsResult {
    /// Hop distance per node index; [`UNREACHED`] for nodes the search
    /// never touched.
    pub distances: DistanceArray,
    /// Parent index per node; `-1` for the source and unreached nodes.
    pub parents: Vec<i32>,
    /// Levels expanded top-down.
    pub top_down_levels: usize,
    /// Levels expanded bottom-up.
    pub bottom_up_levels: usize,
}

impl BfsResult {
    /// Distance to `index`, or `None` if unreached.
    #[must_use]
    pub fn distance(&self, index: u32) -> Option<u16> {
        let d = self.distances.get(index as usize);
        (d != UNREACHED).then_some(d)
    }

    /// Whether the search reached `index`.
    #[must_use]
    pub fn reached(&self, index: u32) -> bool {
        !self.distances.is_unreached(index as usize)
    }

    /// Distances keyed by node id, reached nodes only.
    ///
    /// # Errors
    ///
    /// Returns an error if the result does not belong to `csr`.
    pub fn distance_map<N: NodeKey>(&self, csr: &CompactRowGraph<N>) -> Result<HashMap<N, u16>> {
        let mut map = HashMap::new();
        for index in 0..self.distances.len() {
            let d = self.distances.get(index);
            if d != UNREACHED {
                #[allow(clippy::cast_possible_truncation)]
                let id = csr.index_to_node(index as u32)?;
                map.insert(id.clone(), d);
            }
        }
        Ok(map)
    }
}

/// Direction-optimized BFS from `source`.
///
/// # Errors
///
/// [`crate::GraphError::NodeNotFound`] for an out-of-range source, or
/// [`crate::GraphError::DistanceOverflow`] if the graph has 65535+ levels.
pub fn hybrid_bfs<N: NodeKey>(
    csr: &CompactRowGraph<N>,
    source: u32,
    options: BfsOptions,
) -> Result<BfsResult> {
    csr.neighbors(source)?; // validates the source index
    let n = csr.node_count();
    let (row_start, _, _) = csr.components();
    let out_degree =
        |v: u32| -> u64 { u64::from(row_start[v as usize + 1] - row_start[v as usize]) };
    let total_edges = csr.edge_count() as u64;

    let mut distances = DistanceArray::new(n);
    let mut parents = vec![-1_i32; n];
    let mut visited = BitVec::new(n);
    let mut frontier = BitSet::with_capacity(n);
    let mut next = BitSet::with_capacity(n);

    distances.set(source as usize, 0)?;
    visited.set(source as usize);
    frontier.insert(source);

    // Running sum of out-degrees over visited nodes; unvisited edge cost is
    // derived from it instead of rescanning all rows every level.
    let mut visited_edges = out_degree(source);

    let mut direction = Direction::TopDown;
    let mut level = 0_u32;
    let mut top_down_levels = 0;
    let mut bottom_up_levels = 0;

    while !frontier.is_empty() {
        let frontier_edges: u64 = frontier.iter().map(out_degree).sum();
        let unvisited_edges = total_edges - visited_edges;

        #[allow(clippy::cast_precision_loss)]
        let stay_top_down = match direction {
            Direction::TopDown => (frontier_edges as f64) * options.alpha < unvisited_edges as f64,
            Direction::BottomUp => (frontier.len() as f64) * options.beta < n as f64,
        };
        direction = if stay_top_down {
            Direction::TopDown
        } else {
            Direction::BottomUp
        };

        match direction {
            Direction::TopDown => {
                top_down_levels += 1;
                for v in frontier.iter() {
                    for &w in csr.neighbors(v)? {
                        if !visited.get(w as usize) {
                            visited.set(w as usize);
                            distances.set(w as usize, level + 1)?;
                            #[allow(clippy::cast_possible_wrap)]
                            {
                                parents[w as usize] = v as i32;
                            }
                            next.insert(w);
                            visited_edges += out_degree(w);
                        }
                    }
                }
            }
            Direction::BottomUp => {
                bottom_up_levels += 1;
                for u in 0..n {
                    if visited.get(u) {
                        continue;
                    }
                    #[allow(clippy::cast_possible_truncation)]
                    let u_idx = u as u32;
                    for &p in csr.in_neighbors(u_idx)? {
                        if frontier.contains(p) {
                            visited.set(u);
                            distances.set(u, level + 1)?;
                            #[allow(clippy::cast_possible_wrap)]
                            {
                                parents[u] = p as i32;
                            }
                            next.insert(u_idx);
                            visited_edges += out_degree(u_idx);
                            break;
                        }
                    }
                }
            }
        }

        frontier.swap(&mut next);
        next.clear();
        level += 1;
    }

    Ok(BfsResult {
        distances,
        parents,
        top_down_levels,
        bottom_up_levels,
    })
}

/// Level-synchronous top-down BFS, the semantic reference for
/// [`hybrid_bfs`]. Each level is processed in ascending index order so the
/// parent tree is deterministic: a node's parent is its smallest-index
/// frontier in-neighbor.
///
/// # Errors
///
/// [`crate::GraphError::NodeNotFound`] for an out-of-range source, or
/// [`crate::GraphError::DistanceOverflow`] if the graph has 65535+ levels.
pub fn naive_bfs<N: NodeKey>(csr: &CompactRowGraph<N>, source: u32) -> Result<BfsResult> {
    csr.neighbors(source)?;
    let n = csr.node_count();

    let mut distances = DistanceArray::new(n);
    let mut parents = vec![-1_i32; n];
    let mut visited = vec![false; n];

    distances.set(source as usize, 0)?;
    visited[source as usize] = true;

    let mut level_nodes = vec![source];
    let mut level = 0_u32;

    while !level_nodes.is_empty() {
        let mut next_level = Vec::new();
        for &v in &level_nodes {
            for &w in csr.neighbors(v)? {
                if !visited[w as usize] {
                    visited[w as usize] = true;
                    distances.set(w as usize, level + 1)?;
                    #[allow(clippy::cast_possible_wrap)]
                    {
                        parents[w as usize] = v as i32;
                    }
                    next_level.push(w);
                }
            }
        }
        next_level.sort_unstable();
        level_nodes = next_level;
        level += 1;
    }

    Ok(BfsResult {
        distances,
        parents,
        top_down_levels: level as usize,
        bottom_up_levels: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn snapshot(edges: &[(u32, u32)], directed: bool) -> CompactRowGraph<u32> {
        let mut g = Graph::new(directed);
        for &(s, t) in edges {
            g.add_edge(s, t);
        }
        CompactRowGraph::from_graph(&g)
    }

    fn assert_same_result(csr: &CompactRowGraph<u32>, source: u32) {
        let hybrid = hybrid_bfs(csr, source, BfsOptions::default()).unwrap();
        let naive = naive_bfs(csr, source).unwrap();
        assert_eq!(hybrid.distances, naive.distances);
        assert_eq!(hybrid.parents, naive.parents);
    }

    #[test]
    fn test_chain_distances() {
        let csr = snapshot(&[(0, 1), (1, 2), (2, 3)], false);
        let result = hybrid_bfs(&csr, 0, BfsOptions::default()).unwrap();

        assert_eq!(result.distance(0), Some(0));
        assert_eq!(result.distance(1), Some(1));
        assert_eq!(result.distance(2), Some(2));
        assert_eq!(result.distance(3), Some(3));
        assert_eq!(result.parents, vec![-1, 0, 1, 2]);
    }

    #[test]
    fn test_source_has_no_parent() {
        let csr = snapshot(&[(0, 1)], false);
        let result = hybrid_bfs(&csr, 0, BfsOptions::default()).unwrap();
        assert_eq!(result.parents[0], -1);
        assert_eq!(result.distance(0), Some(0));
    }

    #[test]
    fn test_unreached_nodes_hold_sentinel() {
        let csr = snapshot(&[(0, 1), (2, 3)], false);
        let result = hybrid_bfs(&csr, 0, BfsOptions::default()).unwrap();

        assert!(result.reached(1));
        assert!(!result.reached(2));
        assert!(!result.reached(3));
        assert_eq!(result.distance(3), None);
        assert_eq!(result.parents[2], -1);
    }

    #[test]
    fn test_matches_naive_on_disconnected_graph() {
        let csr = snapshot(&[(0, 1), (1, 2), (3, 4), (5, 5)], false);
        assert_same_result(&csr, 0);
        assert_same_result(&csr, 3);
    }

    #[test]
    fn test_matches_naive_on_directed_graph() {
        let csr = snapshot(&[(0, 1), (1, 2), (2, 0), (2, 3), (4, 0)], true);
        assert_same_result(&csr, 0);
        // Node 4 only reaches others; nothing reaches it.
        let result = hybrid_bfs(&csr, 0, BfsOptions::default()).unwrap();
        assert!(!result.reached(4));
    }

    #[test]
    fn test_forced_bottom_up_matches_naive() {
        // A huge alpha makes the top-down cost estimate lose immediately,
        // and a huge beta keeps the search bottom-up to the end.
        let dense: Vec<(u32, u32)> = (0..8)
            .flat_map(|i| ((i + 1)..8).map(move |j| (i, j)))
            .collect();
        let csr = snapshot(&dense, false);

        let forced = BfsOptions {
            alpha: 1e12,
            beta: 1e12,
        };
        let hybrid = hybrid_bfs(&csr, 0, forced).unwrap();
        let naive = naive_bfs(&csr, 0).unwrap();

        assert!(hybrid.bottom_up_levels > 0);
        assert_eq!(hybrid.distances, naive.distances);
        assert_eq!(hybrid.parents, naive.parents);
    }

    #[test]
    fn test_direction_switch_on_bushy_graph() {
        // Star + funnel: a wide middle level triggers bottom-up, the
        // shrinking frontier switches back.
        let mut edges: Vec<(u32, u32)> = (1..40).map(|i| (0, i)).collect();
        edges.extend((1..40).map(|i| (i, 40)));
        let csr = snapshot(&edges, false);

        let options = BfsOptions {
            alpha: 1.0,
            beta: 4.0,
        };
        let hybrid = hybrid_bfs(&csr, 0, options).unwrap();
        let naive = naive_bfs(&csr, 0).unwrap();

        assert_eq!(hybrid.distances, naive.distances);
        assert_eq!(hybrid.parents, naive.parents);
        assert!(hybrid.bottom_up_levels > 0);
        assert!(hybrid.top_down_levels > 0);
    }

    #[test]
    fn test_invalid_source_fails() {
        let csr = snapshot(&[(0, 1)], false);
        assert!(hybrid_bfs(&csr, 9, BfsOptions::default()).is_err());
        assert!(naive_bfs(&csr, 9).is_err());
    }

    #[test]
    fn test_distance_map_by_node_id() {
        let mut g = Graph::undirected();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_edge("x", "y");
        let csr = CompactRowGraph::from_graph(&g);

        let source = csr.node_to_index(&"a").unwrap();
        let result = hybrid_bfs(&csr, source, BfsOptions::default()).unwrap();
        let map = result.distance_map(&csr).unwrap();

        assert_eq!(map.get(&"a"), Some(&0));
        assert_eq!(map.get(&"c"), Some(&2));
        assert!(!map.contains_key(&"x")); // unreached nodes absent
    }
}
