//! Power-iteration centrality
//!
//! Two fixed-point scores over the weighted adjacency matrix:
//!
//! - **Eigenvector centrality**: repeated application of `x ← Aᵀx + x`
//!   with L2 normalization after every step. The identity shift keeps the
//!   dominant eigenvalue strictly largest in magnitude, so the iteration
//!   converges on bipartite graphs (paths, stars) where the unshifted
//!   iteration oscillates; the principal eigenvector is unchanged. A node
//!   is central in proportion to how central its neighbors are. If the
//!   neighbor sum alone is the zero vector (an edgeless graph), all
//!   scores degenerate to zero.
//! - **Katz centrality**: `x ← αAᵀx + β` iterated without per-step
//!   normalization. The base score β keeps isolated and peripheral nodes
//!   above zero, and α discounts each additional hop; the fixed point sums
//!   α^len over all walks into a node. Converges when α is below the
//!   reciprocal of the spectral radius.
//!
//! Both run over a CSR snapshot and scatter along out-edge rows, which
//! applies `Aᵀ` for directed graphs and plain `A` for undirected ones
//! (the matrix is symmetric there). Node ordering in the snapshot is
//! deterministic, so identical inputs give bitwise-identical scores.

use crate::graph::{Graph, NodeKey};
use crate::storage::CompactRowGraph;
use anyhow::Result;
use std::collections::HashMap;

/// How a power iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// The max per-node delta dropped below tolerance.
    Converged,
    /// The iteration cap was hit first; scores are the last iterate.
    MaxIterationsReached,
}

/// Tuning for eigenvector centrality.
#[derive(Debug, Clone, Copy)]
pub struct CentralityOptions {
    /// Iteration cap.
    pub max_iterations: usize,
    /// Max per-node delta below which iteration stops.
    pub tolerance: f64,
    /// Min-max rescale the final scores onto `[0, 1]`.
    pub normalize: bool,
}

impl Default for CentralityOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            normalize: false,
        }
    }
}

/// Tuning for Katz centrality.
#[derive(Debug, Clone, Copy)]
pub struct KatzOptions {
    /// Attenuation per hop. Must stay below the reciprocal of the
    /// adjacency spectral radius for the iteration to converge.
    pub alpha: f64,
    /// Base score every node receives unconditionally.
    pub beta: f64,
    /// Iteration cap.
    pub max_iterations: usize,
    /// Max per-node delta below which iteration stops.
    pub tolerance: f64,
    /// Min-max rescale the final scores onto `[0, 1]`.
    pub normalize: bool,
}

impl Default for KatzOptions {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            beta: 1.0,
            max_iterations: 100,
            tolerance: 1e-6,
            normalize: false,
        }
    }
}

/// Scores keyed by node, plus how the iteration ended.
#[derive(Debug, Clone)]
pub struct CentralityResult<N: NodeKey> {
    /// Final score per node.
    pub scores: HashMap<N, f64>,
    /// Iterations actually run.
    pub iterations: usize,
    /// Whether tolerance was reached.
    pub status: ConvergenceStatus,
}

impl<N: NodeKey> CentralityResult<N> {
    /// Score of `node`, if it was in the input graph.
    #[must_use]
    pub fn score_of(&self, node: &N) -> Option<f64> {
        self.scores.get(node).copied()
    }

    /// The `k` highest-scoring nodes, descending; ties break on the
    /// smaller node id so the order is stable.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(N, f64)> {
        let mut ranked: Vec<(N, f64)> = self
            .scores
            .iter()
            .map(|(node, &score)| (node.clone(), score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked
    }
}

/// Eigenvector centrality by normalized power iteration.
///
/// Starts uniform and applies the shifted step `x ← Aᵀx + x` with L2
/// normalization. The zero-norm check runs on the neighbor sum before
/// the shift: an edgeless graph short-circuits to all-zero scores and
/// counts as converged, since there is no principal eigenvector to find.
/// Isolated nodes inside a graph that has edges elsewhere are driven to
/// zero by the normalization instead.
///
/// # Errors
///
/// Propagates snapshot index errors; none occur for a well-formed graph.
pub fn eigenvector_centrality<N: NodeKey>(
    graph: &Graph<N>,
    options: CentralityOptions,
) -> Result<CentralityResult<N>> {
    let csr = CompactRowGraph::from_graph(graph);
    let n = csr.node_count();
    if n == 0 {
        return Ok(empty_result());
    }

    #[allow(clippy::cast_precision_loss)]
    let mut x = vec![1.0 / n as f64; n];
    let mut iterations = 0;
    let mut status = ConvergenceStatus::MaxIterationsReached;

    for _ in 0..options.max_iterations {
        iterations += 1;
        let mut next = scatter(&csr, &x)?;

        // Degenerate-case check on the unshifted neighbor sum: a zero
        // vector here means the graph has no edges to propagate over.
        let raw_norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if raw_norm == 0.0 {
            x = vec![0.0; n];
            status = ConvergenceStatus::Converged;
            break;
        }

        for (value, &prev) in next.iter_mut().zip(x.iter()) {
            *value += prev; // identity shift, see module docs
        }

        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        let next: Vec<f64> = next.into_iter().map(|v| v / norm).collect();

        let delta = max_delta(&x, &next);
        x = next;
        if delta < options.tolerance {
            status = ConvergenceStatus::Converged;
            break;
        }
    }

    if options.normalize {
        min_max_rescale(&mut x);
    }
    assemble_result(&csr, x, iterations, status)
}

/// Katz centrality by fixed-point iteration.
///
/// Iterates `x ← αAᵀx + β` from the all-β vector. Scores are not
/// normalized between steps, so raising α strictly raises every score a
/// multi-hop walk contributes to.
///
/// # Errors
///
/// Propagates snapshot index errors; none occur for a well-formed graph.
pub fn katz_centrality<N: NodeKey>(
    graph: &Graph<N>,
    options: KatzOptions,
) -> Result<CentralityResult<N>> {
    let csr = CompactRowGraph::from_graph(graph);
    let n = csr.node_count();
    if n == 0 {
        return Ok(empty_result());
    }

    let mut x = vec![options.beta; n];
    let mut iterations = 0;
    let mut status = ConvergenceStatus::MaxIterationsReached;

    for _ in 0..options.max_iterations {
        iterations += 1;
        let mut next = scatter(&csr, &x)?;
        for value in &mut next {
            *value = options.alpha * *value + options.beta;
        }

        let delta = max_delta(&x, &next);
        x = next;
        if delta < options.tolerance {
            status = ConvergenceStatus::Converged;
            break;
        }
    }

    if options.normalize {
        min_max_rescale(&mut x);
    }
    assemble_result(&csr, x, iterations, status)
}

/// One matrix application: scatter each node's score along its out-edges.
/// Out-rows of the snapshot give `Aᵀx` on directed graphs and `Ax` on
/// undirected ones.
fn scatter<N: NodeKey>(csr: &CompactRowGraph<N>, x: &[f64]) -> Result<Vec<f64>> {
    let mut next = vec![0.0; x.len()];
    for (index, &score) in x.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let (cols, weights) = csr.neighbor_weights(index as u32)?;
        for (&target, &weight) in cols.iter().zip(weights.iter()) {
            next[target as usize] += weight * score;
        }
    }
    Ok(next)
}

fn max_delta(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Min-max rescale onto `[0, 1]`. A constant vector maps to all-ones when
/// positive and all-zeros otherwise.
fn min_max_rescale(x: &mut [f64]) {
    let min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.abs() < f64::EPSILON {
        let flat = if max > 0.0 { 1.0 } else { 0.0 };
        x.fill(flat);
    } else {
        for value in x.iter_mut() {
            *value = (*value - min) / range;
        }
    }
}

fn empty_result<N: NodeKey>() -> CentralityResult<N> {
    CentralityResult {
        scores: HashMap::new(),
        iterations: 0,
        status: ConvergenceStatus::Converged,
    }
}

fn assemble_result<N: NodeKey>(
    csr: &CompactRowGraph<N>,
    x: Vec<f64>,
    iterations: usize,
    status: ConvergenceStatus,
) -> Result<CentralityResult<N>> {
    let mut scores = HashMap::with_capacity(x.len());
    for (index, score) in x.into_iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let id = csr.index_to_node(index as u32)?;
        scores.insert(id.clone(), score);
    }
    Ok(CentralityResult {
        scores,
        iterations,
        status,
    })
}
