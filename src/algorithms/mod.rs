//! Graph algorithms (hybrid BFS, community detection, centrality, MST)
//!
//! Every algorithm here runs over an immutable [`crate::storage::CompactRowGraph`]
//! snapshot and reports results keyed by the caller's node ids.

pub mod centrality;
pub mod louvain;
pub mod modularity;
pub mod mst;
pub mod traversal;

pub use centrality::{
    eigenvector_centrality, katz_centrality, CentralityOptions, CentralityResult,
    ConvergenceStatus, KatzOptions,
};
pub use louvain::{louvain, resolution_scan, CommunityOptions, CommunityResult};
pub use modularity::{modularity, renumber_partition, Partition};
pub use mst::{minimum_spanning_forest, MstResult};
pub use traversal::{hybrid_bfs, naive_bfs, BfsOptions, BfsResult};
