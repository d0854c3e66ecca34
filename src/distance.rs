use crate::input::{DistanceEntry, NodeId};
use ndarray::Array2;
use std::collections::HashMap;

/// Distance reported for pairs with no entry in the input.
///
/// Compares greater than every real distance, so it is never chosen as a
/// minimum, and it never turns into NaN under the sums and comparisons used
/// by the partitioner.
pub const UNKNOWN_DISTANCE: f64 = f64::INFINITY;

/// Complete, symmetric distance lookup over every node named in the input.
///
/// Nodes are mapped once to a compact rank `0..n` in ascending id order, and
/// distances live in a dense `n x n` matrix indexed by rank. Memory and build
/// time therefore grow quadratically with the node count: the oracle is meant
/// for node sets whose full matrix fits comfortably in memory (tens of
/// thousands of nodes at most), not for large-scale clustering.
#[derive(Debug, Clone)]
pub struct DistanceOracle {
    nodes: Vec<NodeId>,
    ranks: HashMap<NodeId, usize>,
    matrix: Array2<f64>,
}

impl DistanceOracle {
    /// Build the oracle from a sparse, possibly incomplete entry list.
    ///
    /// Entries are direction-independent. When the same pair appears more
    /// than once, the later entry wins. Self-pairs never override the zero
    /// diagonal.
    pub fn from_entries(entries: &[DistanceEntry]) -> Self {
        let mut nodes: Vec<NodeId> = entries.iter().flat_map(|e| [e.from, e.to]).collect();
        nodes.sort_unstable();
        nodes.dedup();

        let ranks: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(rank, &id)| (id, rank)).collect();

        let n = nodes.len();
        let mut matrix = Array2::from_elem((n, n), UNKNOWN_DISTANCE);
        matrix.diag_mut().fill(0.0);

        for entry in entries {
            let i = ranks[&entry.from];
            let j = ranks[&entry.to];
            if i == j {
                continue;
            }
            matrix[[i, j]] = entry.distance;
            matrix[[j, i]] = entry.distance;
        }

        Self {
            nodes,
            ranks,
            matrix,
        }
    }

    /// Distance between two node ids. Unknown ids and missing pairs give
    /// [`UNKNOWN_DISTANCE`]; a known id is at distance zero from itself.
    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        match (self.ranks.get(&a), self.ranks.get(&b)) {
            (Some(&i), Some(&j)) => self.matrix[[i, j]],
            _ => UNKNOWN_DISTANCE,
        }
    }

    /// Distance between two nodes addressed by rank
    #[inline]
    pub fn distance_by_rank(&self, i: usize, j: usize) -> f64 {
        self.matrix[[i, j]]
    }

    /// All node ids, ascending. Position in this slice is the node's rank.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Node id at a given rank
    #[inline]
    pub fn node_at(&self, rank: usize) -> NodeId {
        self.nodes[rank]
    }

    /// Rank of a node id, if the id is part of the node set
    pub fn rank_of(&self, id: NodeId) -> Option<usize> {
        self.ranks.get(&id).copied()
    }

    /// Number of distinct nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of unordered node pairs with no known distance
    pub fn missing_pairs(&self) -> usize {
        let n = self.len();
        (0..n)
            .map(|i| {
                (i + 1..n)
                    .filter(|&j| self.matrix[[i, j]] == UNKNOWN_DISTANCE)
                    .count()
            })
            .sum()
    }

    /// True when every pair of distinct nodes has a known distance
    pub fn is_complete(&self) -> bool {
        self.missing_pairs() == 0
    }
}
