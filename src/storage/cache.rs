//! Explicit snapshot cache
//!
//! CSR snapshots are expensive to build and cheap to share, but they go
//! stale the moment the source graph mutates. [`SnapshotCache`] keys each
//! cached snapshot by the graph's `(id, version)` pair: a version mismatch
//! triggers a rebuild, so a stale snapshot can never be served. The cache
//! owns its entries and is evicted explicitly; there is no reliance on
//! liveness tracking.
//!
//! # Example
//!
//! ```
//! use canopy_graph::{Graph, SnapshotCache};
//!
//! let mut g = Graph::undirected();
//! g.add_edge(0, 1);
//!
//! let mut cache = SnapshotCache::new();
//! let snap = cache.snapshot(&g);
//! assert!(std::sync::Arc::ptr_eq(&snap, &cache.snapshot(&g))); // cache hit
//!
//! g.add_edge(1, 2); // version bump
//! let fresh = cache.snapshot(&g);
//! assert_eq!(fresh.node_count(), 3);
//! ```

use crate::graph::{Graph, NodeKey};
use crate::storage::CompactRowGraph;
use std::collections::HashMap;
use std::sync::Arc;

/// One cached snapshot per graph identity, invalidated by version.
#[derive(Debug, Default)]
pub struct SnapshotCache<N: NodeKey> {
    entries: HashMap<u64, (u64, Arc<CompactRowGraph<N>>)>,
}

impl<N: NodeKey> SnapshotCache<N> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Return the cached snapshot for `graph`, rebuilding it if the graph
    /// has mutated since the entry was stored (or was never cached).
    pub fn snapshot(&mut self, graph: &Graph<N>) -> Arc<CompactRowGraph<N>> {
        match self.entries.get(&graph.id()) {
            Some((version, snap)) if *version == graph.version() => Arc::clone(snap),
            _ => {
                let snap = Arc::new(CompactRowGraph::from_graph(graph));
                self.entries
                    .insert(graph.id(), (graph.version(), Arc::clone(&snap)));
                snap
            }
        }
    }

    /// Drop the entry for a graph id. Returns `true` if one was present.
    pub fn evict(&mut self, graph_id: u64) -> bool {
        self.entries.remove(&graph_id).is_some()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
