//! canopy-graph: embedded graph analytics engine
//!
//! # Overview
//!
//! canopy-graph pairs a mutable adjacency-map graph with an immutable CSR
//! (Compressed Sparse Row) snapshot that the analytics run against. Mutate
//! freely, snapshot once, analyze many times; the [`SnapshotCache`] keys
//! snapshots by graph identity and version so a stale one is never served.
//!
//! # Quick Start
//!
//! ```
//! use canopy_graph::{hybrid_bfs, louvain, BfsOptions, CommunityOptions, CompactRowGraph, Graph};
//!
//! # fn example() -> canopy_graph::Result<()> {
//! // Build a small social graph
//! let mut graph = Graph::undirected();
//! graph.add_edge("alice", "bob");
//! graph.add_edge("bob", "carol");
//! graph.add_edge("carol", "alice");
//! graph.add_edge("carol", "dave");
//!
//! // Freeze it into a CSR snapshot
//! let csr = CompactRowGraph::from_graph(&graph);
//!
//! // Direction-optimizing BFS from alice
//! let source = csr.node_to_index(&"alice")?;
//! let bfs = hybrid_bfs(&csr, source, BfsOptions::default())?;
//! assert_eq!(bfs.distance(csr.node_to_index(&"dave")?), Some(2));
//!
//! // Community detection on the mutable graph
//! let communities = louvain(&graph, CommunityOptions::default())?;
//! assert!(communities.num_communities >= 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Architecture
//!
//! - **Graph**: mutable adjacency maps over arbitrary ordered node ids
//! - **Storage**: CSR snapshots with sorted rows, plus a versioned cache
//! - **Primitives**: bit sets, bit vectors, and u16 distance arrays
//! - **Algorithms**: hybrid BFS, Louvain communities, power-iteration
//!   centrality, minimum spanning forests

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod bits;
pub mod error;
pub mod graph;
pub mod storage;

// Re-export core types
pub use algorithms::{
    eigenvector_centrality, hybrid_bfs, katz_centrality, louvain, minimum_spanning_forest,
    modularity, naive_bfs, resolution_scan, BfsOptions, BfsResult, CentralityOptions,
    CentralityResult, CommunityOptions, CommunityResult, ConvergenceStatus, KatzOptions,
    MstResult, Partition,
};
pub use bits::{BitSet, BitVec, DistanceArray, UNREACHED};
pub use error::GraphError;
pub use graph::{Graph, NodeKey, DEFAULT_EDGE_WEIGHT};
pub use storage::{CompactRowGraph, SnapshotCache};

// Error type
pub use anyhow::{Error, Result};
