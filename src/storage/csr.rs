//! Compact row (CSR) snapshot of a [`Graph`]
//!
//! # Layout
//!
//! ```text
//! Graph: 0 - 1, 0 - 2 (undirected)
//!
//! row_start: [0, 2, 3, 4]   // node 0: slots [0..2), node 1: [2..3), node 2: [3..4)
//! columns:   [1, 2, 0, 0]   // sorted ascending within each row
//! weights:   [1.0, 1.0, 1.0, 1.0]
//! ```
//!
//! Every undirected edge occupies two directed slots (i→j and j→i), so
//! `edge_count()` is twice the source graph's undirected edge count. Rows
//! are sorted so `has_edge` is a binary search, O(log d).
//!
//! The snapshot owns its arrays and id table and holds no reference to the
//! originating graph; any topology change requires rebuilding (see
//! [`SnapshotCache`](crate::storage::SnapshotCache)).

use crate::error::GraphError;
use crate::graph::{Graph, NodeKey};
use anyhow::Result;
use std::collections::HashMap;

/// Immutable index-based snapshot optimized for sequential neighbor scans.
#[derive(Debug, Clone)]
pub struct CompactRowGraph<N: NodeKey> {
    /// Row offsets, length n+1.
    row_start: Vec<u32>,
    /// Edge targets, length m, ascending within each row.
    columns: Vec<u32>,
    /// Edge weights parallel to `columns`.
    weights: Vec<f64>,
    /// Reverse CSR row offsets; empty for undirected sources, where the
    /// forward arrays are already symmetric.
    rev_row_start: Vec<u32>,
    /// Reverse CSR edge sources.
    rev_columns: Vec<u32>,
    /// index -> node id.
    index_to_id: Vec<N>,
    /// node id -> index.
    id_to_index: HashMap<N, u32>,
    directed: bool,
}

impl<N: NodeKey> CompactRowGraph<N> {
    /// Build a snapshot of `graph`.
    ///
    /// Nodes are indexed in ascending id order, so the same graph always
    /// produces the same snapshot. One pass counts out-degrees into a
    /// prefix sum, a second fills columns and weights, then each row is
    /// sorted. O(n + m log d).
    #[must_use]
    pub fn from_graph(graph: &Graph<N>) -> Self {
        let mut index_to_id: Vec<N> = graph.nodes().cloned().collect();
        index_to_id.sort_unstable();

        let n = index_to_id.len();
        #[allow(clippy::cast_possible_truncation)] // >4B nodes unsupported
        let id_to_index: HashMap<N, u32> = index_to_id
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as u32))
            .collect();

        // Pass 1: out-degree prefix sum.
        let mut row_start = Vec::with_capacity(n + 1);
        let mut offset = 0_u32;
        row_start.push(offset);
        for id in &index_to_id {
            #[allow(clippy::cast_possible_truncation)]
            let degree = graph.degree(id).unwrap_or(0) as u32;
            offset += degree;
            row_start.push(offset);
        }

        // Pass 2: fill rows, then sort each row's (column, weight) slice.
        let m = offset as usize;
        let mut columns = vec![0_u32; m];
        let mut weights = vec![0.0_f64; m];
        for (i, id) in index_to_id.iter().enumerate() {
            let start = row_start[i] as usize;
            let end = row_start[i + 1] as usize;
            let mut row: Vec<(u32, f64)> = Vec::with_capacity(end - start);
            if let Ok(neighbors) = graph.neighbors(id) {
                for (nbr, w) in neighbors {
                    row.push((id_to_index[nbr], w));
                }
            }
            row.sort_unstable_by_key(|&(c, _)| c);
            for (slot, (c, w)) in row.into_iter().enumerate() {
                columns[start + slot] = c;
                weights[start + slot] = w;
            }
        }

        let (rev_row_start, rev_columns) = if graph.is_directed() {
            Self::build_reverse(n, &row_start, &columns)
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            row_start,
            columns,
            weights,
            rev_row_start,
            rev_columns,
            index_to_id,
            id_to_index,
            directed: graph.is_directed(),
        }
    }

    /// Counting-sort transpose of the forward CSR.
    fn build_reverse(n: usize, row_start: &[u32], columns: &[u32]) -> (Vec<u32>, Vec<u32>) {
        let mut rev_row_start = vec![0_u32; n + 1];
        for &target in columns {
            rev_row_start[target as usize + 1] += 1;
        }
        for i in 0..n {
            rev_row_start[i + 1] += rev_row_start[i];
        }

        let mut rev_columns = vec![0_u32; columns.len()];
        let mut cursor: Vec<u32> = rev_row_start[..n].to_vec();
        for source in 0..n {
            let start = row_start[source] as usize;
            let end = row_start[source + 1] as usize;
            for &target in &columns[start..end] {
                let slot = cursor[target as usize];
                #[allow(clippy::cast_possible_truncation)]
                {
                    rev_columns[slot as usize] = source as u32;
                }
                cursor[target as usize] += 1;
            }
        }
        // Sources are visited in ascending order, so each reverse row comes
        // out sorted.
        (rev_row_start, rev_columns)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.index_to_id.len()
    }

    /// Number of directed edge slots. For an undirected source graph every
    /// edge occupies two slots, so this is twice the edge count reported by
    /// the source [`Graph`] (self-loops occupy one).
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether the source graph was directed.
    #[must_use]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Map a node id to its index.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an id the snapshot does not hold.
    pub fn node_to_index(&self, id: &N) -> Result<u32> {
        self.id_to_index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(format!("{id:?}")).into())
    }

    /// Map an index back to its node id.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an out-of-range index.
    pub fn index_to_node(&self, index: u32) -> Result<&N> {
        self.index_to_id
            .get(index as usize)
            .ok_or_else(|| GraphError::NodeNotFound(format!("index {index}")).into())
    }

    /// Out-neighbor indices of `index`, ascending.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an out-of-range index.
    pub fn neighbors(&self, index: u32) -> Result<&[u32]> {
        self.check_index(index)?;
        let start = self.row_start[index as usize] as usize;
        let end = self.row_start[index as usize + 1] as usize;
        Ok(&self.columns[start..end])
    }

    /// Out-neighbor indices and their weights.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an out-of-range index.
    pub fn neighbor_weights(&self, index: u32) -> Result<(&[u32], &[f64])> {
        self.check_index(index)?;
        let start = self.row_start[index as usize] as usize;
        let end = self.row_start[index as usize + 1] as usize;
        Ok((&self.columns[start..end], &self.weights[start..end]))
    }

    /// In-neighbor indices of `index`. For undirected snapshots this is the
    /// same slice as [`CompactRowGraph::neighbors`].
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an out-of-range index.
    pub fn in_neighbors(&self, index: u32) -> Result<&[u32]> {
        if !self.directed {
            return self.neighbors(index);
        }
        self.check_index(index)?;
        let start = self.rev_row_start[index as usize] as usize;
        let end = self.rev_row_start[index as usize + 1] as usize;
        Ok(&self.rev_columns[start..end])
    }

    /// Out-degree of `index`.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an out-of-range index.
    pub fn out_degree(&self, index: u32) -> Result<u32> {
        self.check_index(index)?;
        Ok(self.row_start[index as usize + 1] - self.row_start[index as usize])
    }

    /// Edge membership via binary search over the sorted row. O(log d).
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an out-of-range source index.
    pub fn has_edge(&self, source: u32, target: u32) -> Result<bool> {
        Ok(self.neighbors(source)?.binary_search(&target).is_ok())
    }

    /// Weight of the edge `source → target`, if present. O(log d).
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an out-of-range source index.
    pub fn edge_weight(&self, source: u32, target: u32) -> Result<Option<f64>> {
        self.check_index(source)?;
        let start = self.row_start[source as usize] as usize;
        let end = self.row_start[source as usize + 1] as usize;
        Ok(self.columns[start..end]
            .binary_search(&target)
            .ok()
            .map(|pos| self.weights[start + pos]))
    }

    /// Raw CSR arrays `(row_start, columns, weights)` for flat iteration.
    #[must_use]
    pub fn components(&self) -> (&[u32], &[u32], &[f64]) {
        (&self.row_start, &self.columns, &self.weights)
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if (index as usize) < self.index_to_id.len() {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(format!("index {index}")).into())
        }
    }
}
