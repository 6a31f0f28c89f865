//! Read-optimized graph storage
//!
//! Provides the immutable CSR snapshot ([`CompactRowGraph`]) and the
//! explicit `(graph-id, version)`-keyed [`SnapshotCache`].

pub mod cache;
pub mod csr;

pub use cache::SnapshotCache;
pub use csr::CompactRowGraph;
