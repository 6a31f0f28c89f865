//! Mutable graph store
//!
//! [`Graph`] is the source of truth every algorithm reads from: a weighted
//! adjacency-map graph, directed or undirected, generic over the node id
//! type. Undirected graphs mirror each edge in both endpoints' adjacency and
//! the mutation API keeps that mirror atomic; directed graphs additionally
//! maintain an inbound view so in-degree and in-neighbor queries stay O(1).
//!
//! Each graph carries a process-unique id and a version counter bumped on
//! every successful mutation. The pair keys
//! [`SnapshotCache`](crate::storage::SnapshotCache), so a stale CSR snapshot
//! can never be served for a mutated graph.
//!
//! # Example
//!
//! ```
//! use canopy_graph::Graph;
//!
//! let mut g = Graph::undirected();
//! g.add_edge("a", "b");
//! g.add_edge_weighted("b", "c", 2.5);
//!
//! assert_eq!(g.node_count(), 3);
//! assert_eq!(g.edge_count(), 2);
//! assert!(g.has_edge(&"b", &"a")); // mirrored
//! assert_eq!(g.degree(&"b").unwrap(), 2);
//! ```

use crate::error::GraphError;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

/// Capabilities a node identifier must provide.
///
/// Algorithms rely only on equality, ordering, hashing, and cloning; the
/// concrete representation (string, integer, ...) is up to the caller.
pub trait NodeKey: Clone + Eq + Ord + Hash + Debug {}

impl<T: Clone + Eq + Ord + Hash + Debug> NodeKey for T {}

/// Default edge weight when none is given.
pub const DEFAULT_EDGE_WEIGHT: f64 = 1.0;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

/// Mutable weighted graph over generic node ids.
#[derive(Debug)]
pub struct Graph<N: NodeKey> {
    directed: bool,
    /// node -> (neighbor -> weight). For undirected graphs every edge
    /// appears in both endpoints' maps; self-loops appear once.
    adjacency: HashMap<N, HashMap<N, f64>>,
    /// Inbound view, maintained for directed graphs only.
    inbound: HashMap<N, HashMap<N, f64>>,
    edge_count: usize,
    id: u64,
    version: u64,
}

impl<N: NodeKey> Graph<N> {
    /// Create an empty graph. Directedness is fixed for the graph's lifetime.
    #[must_use]
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            adjacency: HashMap::new(),
            inbound: HashMap::new(),
            edge_count: 0,
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            version: 0,
        }
    }

    /// Create an empty undirected graph.
    #[must_use]
    pub fn undirected() -> Self {
        Self::new(false)
    }

    /// Create an empty directed graph.
    #[must_use]
    pub fn directed() -> Self {
        Self::new(true)
    }

    /// Whether edges have direction.
    #[must_use]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Process-unique identity, for snapshot caching.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mutation counter; bumped on every successful change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges (undirected edges counted once).
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Add a node. Returns `true` if it was new. No-op for existing nodes.
    pub fn add_node(&mut self, node: N) -> bool {
        if self.adjacency.contains_key(&node) {
            return false;
        }
        if self.directed {
            self.inbound.insert(node.clone(), HashMap::new());
        }
        self.adjacency.insert(node, HashMap::new());
        self.version += 1;
        true
    }

    /// Add an edge with the default weight of 1.0, creating missing
    /// endpoints. See [`Graph::add_edge_weighted`].
    pub fn add_edge(&mut self, source: N, target: N) {
        self.add_edge_weighted(source, target, DEFAULT_EDGE_WEIGHT);
    }

    /// Add an edge, creating missing endpoints. For undirected graphs the
    /// mirrored entry is installed in the same operation. Re-adding an
    /// existing edge overwrites its weight.
    pub fn add_edge_weighted(&mut self, source: N, target: N, weight: f64) {
        self.add_node(source.clone());
        self.add_node(target.clone());

        let existed = self
            .adjacency
            .get_mut(&source)
            .map(|nbrs| nbrs.insert(target.clone(), weight).is_some())
            .unwrap_or(false);

        if self.directed {
            if let Some(sources) = self.inbound.get_mut(&target) {
                sources.insert(source, weight);
            }
        } else if source != target {
            if let Some(nbrs) = self.adjacency.get_mut(&target) {
                nbrs.insert(source, weight);
            }
        }

        if !existed {
            self.edge_count += 1;
        }
        self.version += 1;
    }

    /// Remove an edge (and its mirror, for undirected graphs).
    ///
    /// # Errors
    ///
    /// [`GraphError::EdgeNotFound`] if the edge does not exist.
    pub fn remove_edge(&mut self, source: &N, target: &N) -> Result<()> {
        let removed = self
            .adjacency
            .get_mut(source)
            .map(|nbrs| nbrs.remove(target).is_some())
            .unwrap_or(false);

        if !removed {
            return Err(GraphError::EdgeNotFound(
                format!("{source:?}"),
                format!("{target:?}"),
            )
            .into());
        }

        if self.directed {
            if let Some(sources) = self.inbound.get_mut(target) {
                sources.remove(source);
            }
        } else if source != target {
            if let Some(nbrs) = self.adjacency.get_mut(target) {
                nbrs.remove(source);
            }
        }

        self.edge_count -= 1;
        self.version += 1;
        Ok(())
    }

    /// Remove a node and every edge referencing it.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn remove_node(&mut self, node: &N) -> Result<()> {
        let neighbors = self
            .adjacency
            .remove(node)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{node:?}")))?;

        // Outgoing edges (undirected mirrors included).
        self.edge_count -= neighbors.len();
        if !self.directed {
            for neighbor in neighbors.keys() {
                if let Some(nbrs) = self.adjacency.get_mut(neighbor) {
                    nbrs.remove(node);
                }
            }
        } else {
            for neighbor in neighbors.keys() {
                if let Some(sources) = self.inbound.get_mut(neighbor) {
                    sources.remove(node);
                }
            }
            // Incoming edges from other nodes (the self-loop, if any, was
            // already counted with the outgoing edges).
            if let Some(sources) = self.inbound.remove(node) {
                self.edge_count -= sources.keys().filter(|s| *s != node).count();
                for source in sources.keys() {
                    if let Some(nbrs) = self.adjacency.get_mut(source) {
                        nbrs.remove(node);
                    }
                }
            }
        }

        self.version += 1;
        Ok(())
    }

    /// Membership test for a node.
    #[must_use]
    pub fn has_node(&self, node: &N) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Membership test for an edge.
    #[must_use]
    pub fn has_edge(&self, source: &N, target: &N) -> bool {
        self.adjacency
            .get(source)
            .is_some_and(|nbrs| nbrs.contains_key(target))
    }

    /// Weight of an edge.
    ///
    /// # Errors
    ///
    /// [`GraphError::EdgeNotFound`] if the edge does not exist.
    pub fn edge_weight(&self, source: &N, target: &N) -> Result<f64> {
        self.adjacency
            .get(source)
            .and_then(|nbrs| nbrs.get(target).copied())
            .ok_or_else(|| {
                GraphError::EdgeNotFound(format!("{source:?}"), format!("{target:?}")).into()
            })
    }

    /// Number of adjacent nodes (out-degree for directed graphs).
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn degree(&self, node: &N) -> Result<usize> {
        self.neighbor_map(node).map(HashMap::len)
    }

    /// Out-degree. Equals [`Graph::degree`] for undirected graphs.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn out_degree(&self, node: &N) -> Result<usize> {
        self.degree(node)
    }

    /// In-degree. Equals [`Graph::degree`] for undirected graphs.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn in_degree(&self, node: &N) -> Result<usize> {
        if !self.directed {
            return self.degree(node);
        }
        self.inbound
            .get(node)
            .map(HashMap::len)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{node:?}")).into())
    }

    /// Neighbors with edge weights (out-neighbors for directed graphs).
    /// The returned iterator is finite and can be re-created at will.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn neighbors(&self, node: &N) -> Result<impl Iterator<Item = (&N, f64)> + '_> {
        self.neighbor_map(node)
            .map(|nbrs| nbrs.iter().map(|(n, &w)| (n, w)))
    }

    /// Out-neighbors with edge weights. Alias of [`Graph::neighbors`].
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn out_neighbors(&self, node: &N) -> Result<impl Iterator<Item = (&N, f64)> + '_> {
        self.neighbors(node)
    }

    /// In-neighbors with edge weights. Equals [`Graph::neighbors`] for
    /// undirected graphs.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn in_neighbors(&self, node: &N) -> Result<impl Iterator<Item = (&N, f64)> + '_> {
        let map = if self.directed {
            self.inbound
                .get(node)
                .ok_or_else(|| GraphError::NodeNotFound(format!("{node:?}")))?
        } else {
            self.neighbor_map(node)?
        };
        Ok(map.iter().map(|(n, &w)| (n, w)))
    }

    /// Iterate over all node ids.
    pub fn nodes(&self) -> impl Iterator<Item = &N> + '_ {
        self.adjacency.keys()
    }

    /// Iterate over all edges as `(source, target, weight)`.
    ///
    /// For undirected graphs each edge appears once, with its endpoints in
    /// canonical (ascending) order.
    pub fn edges(&self) -> impl Iterator<Item = (&N, &N, f64)> + '_ {
        self.adjacency.iter().flat_map(move |(source, nbrs)| {
            nbrs.iter().filter_map(move |(target, &weight)| {
                if !self.directed && source > target {
                    return None; // mirror; canonical copy emitted from the other side
                }
                Some((source, target, weight))
            })
        })
    }

    fn neighbor_map(&self, node: &N) -> Result<&HashMap<N, f64>> {
        self.adjacency
            .get(node)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{node:?}")).into())
    }
}

impl<N: NodeKey> Clone for Graph<N> {
    /// A clone is a new graph, not a view: it gets a fresh identity so
    /// cached snapshots of the original are never served for the copy.
    fn clone(&self) -> Self {
        Self {
            directed: self.directed,
            adjacency: self.adjacency.clone(),
            inbound: self.inbound.clone(),
            edge_count: self.edge_count,
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            version: 0,
        }
    }
}
