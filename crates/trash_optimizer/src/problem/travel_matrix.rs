use fxhash::FxHashMap;

use crate::problem::node::NodeIdx;

pub type Minutes = f64;

/// Sentinel for pairs the matrix source did not cover. Any move whose
/// evaluation touches such a pair is judged infeasible by the evaluator.
pub const UNREACHABLE: Minutes = f64::INFINITY;

/// Travel time oracle between catalog nodes. Implementations must be pure
/// and cheap; directed pairs are never assumed symmetric.
pub trait CostOracle: Send + Sync {
    fn travel(&self, from: NodeIdx, to: NodeIdx) -> Minutes;
}

/// Flat row-major travel time matrix over all catalog nodes.
/// `index = from * num_nodes + to`.
pub struct TravelTimeMatrix {
    times: Vec<Minutes>,
    num_nodes: usize,
}

impl TravelTimeMatrix {
    pub fn new(num_nodes: usize) -> Self {
        TravelTimeMatrix {
            times: vec![UNREACHABLE; num_nodes * num_nodes],
            num_nodes,
        }
    }

    /// Builds a matrix from directed `(from, to) -> minutes` entries.
    /// Unlisted pairs stay unreachable; the diagonal defaults to zero.
    pub fn from_entries(num_nodes: usize, entries: &FxHashMap<(NodeIdx, NodeIdx), Minutes>) -> Self {
        let mut matrix = TravelTimeMatrix::new(num_nodes);

        for i in 0..num_nodes {
            matrix.set(NodeIdx::new(i), NodeIdx::new(i), 0.0);
        }

        for (&(from, to), &minutes) in entries {
            matrix.set(from, to, minutes);
        }

        matrix
    }

    /// Euclidean fallback over node coordinates, one coordinate unit per
    /// minute. Used by tests and generated instances.
    pub fn from_coordinates(coordinates: &[(f64, f64)]) -> Self {
        let num_nodes = coordinates.len();
        let mut matrix = TravelTimeMatrix::new(num_nodes);

        for (i, &(x1, y1)) in coordinates.iter().enumerate() {
            for (j, &(x2, y2)) in coordinates.iter().enumerate() {
                let minutes = ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt();
                matrix.set(NodeIdx::new(i), NodeIdx::new(j), minutes);
            }
        }

        matrix
    }

    pub fn set(&mut self, from: NodeIdx, to: NodeIdx, minutes: Minutes) {
        let index = self.index(from, to);
        self.times[index] = minutes;
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline(always)]
    fn index(&self, from: NodeIdx, to: NodeIdx) -> usize {
        from.get() * self.num_nodes + to.get()
    }
}

impl CostOracle for TravelTimeMatrix {
    #[inline]
    fn travel(&self, from: NodeIdx, to: NodeIdx) -> Minutes {
        self.times[self.index(from, to)]
    }
}
