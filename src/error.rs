//! Error taxonomy for the graph engine
//!
//! Failures fall into two families: invalid references (an id or index the
//! structure does not know about) and structural precondition violations (an
//! algorithm handed a graph shape it cannot process). Numerical edge cases
//! (edgeless graphs, zero-norm vectors, empty communities) are *not* errors;
//! they produce documented degenerate results instead.
//!
//! Public APIs return `anyhow::Result`; the typed variants below stay
//! downcastable through that boundary:
//!
//! ```
//! use canopy_graph::{Graph, GraphError};
//!
//! let graph: Graph<&str> = Graph::undirected();
//! let err = graph.degree(&"missing").unwrap_err();
//! assert!(matches!(
//!     err.downcast_ref::<GraphError>(),
//!     Some(GraphError::NodeNotFound(_))
//! ));
//! ```

use thiserror::Error;

/// Typed failure conditions surfaced by graph structures and algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// A node id or CSR index referenced a node the structure does not hold.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// An edge lookup or removal referenced a missing edge.
    #[error("edge not found: {0} -> {1}")]
    EdgeNotFound(String, String),

    /// An algorithm requiring an undirected graph received a directed one.
    #[error("{0} requires an undirected graph")]
    DirectedUnsupported(&'static str),

    /// An algorithm requiring a connected graph received a disconnected one.
    #[error("{0} requires a connected graph")]
    Disconnected(&'static str),

    /// A partition did not assign a community to every node in the graph.
    #[error("partition is missing an assignment for node {0}")]
    PartialPartition(String),

    /// A write into the compact distance array reached the unvisited
    /// sentinel. Distances are capped at `u16::MAX - 1`.
    #[error("distance {0} overflows the 16-bit distance array")]
    DistanceOverflow(u32),
}
