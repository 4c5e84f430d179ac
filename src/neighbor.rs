use crate::error::PreconditionError;
use crate::store::{InstanceIdx, InstanceStore};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Cells visited from each cell besides itself. Together with the reverse direction that other
/// cells cover, this reaches all eight surrounding cells while visiting each pair of cells once.
const FORWARD: [(i64, i64); 4] = [(1, -1), (1, 0), (1, 1), (0, 1)];

/// Cells are made a hair wider than the threshold so that rounding in `x / side` can't put two
/// points which are exactly `threshold` apart two cells away from each other.
const CELL_SLACK: f64 = 1.0 + 1e-9;

type Cell = (i64, i64);

/// The symmetric "within distance threshold" relation over the instances of a store.
///
/// Each unordered pair is stored once, as `(i, j)` with `i < j` in rank order, and the pairs are
/// sorted. Pairs of instances of the same feature are included; only the pattern search
/// restricts itself to different features.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighborRelation {
    edges: Vec<(InstanceIdx, InstanceIdx)>,
}

impl NeighborRelation {
    /// Finds every pair of instances at Euclidean distance at most `threshold`.
    ///
    /// Comparing every pair would take quadratic time. Instead, instances are bucketed into a
    /// grid of square cells the size of the threshold, so two neighbors are always in the same
    /// or adjacent cells. For points spread over an area much larger than the threshold, that
    /// makes the work roughly linear in the number of instances plus the number of edges.
    ///
    /// A threshold of zero makes only coincident points neighbors; those are bucketed by their
    /// exact coordinates instead.
    pub fn build(store: &InstanceStore, threshold: f64) -> Result<Self, PreconditionError> {
        if !(threshold >= 0.0 && threshold.is_finite()) {
            return Err(PreconditionError::InvalidThreshold(threshold));
        }

        let mut cells: HashMap<Cell, Vec<InstanceIdx>> = HashMap::new();
        for (idx, instance) in store.instances().iter().enumerate() {
            cells
                .entry(cell_of(instance.x, instance.y, threshold))
                .or_insert_with(Vec::new)
                .push(idx as InstanceIdx);
        }

        let instances = store.instances();
        let within = |a: InstanceIdx, b: InstanceIdx| {
            instances[a as usize].distance(&instances[b as usize]) <= threshold
        };

        let mut edges: Vec<(InstanceIdx, InstanceIdx)> = cells
            .par_iter()
            .flat_map_iter(|(&(cx, cy), members)| {
                let mut local = Vec::new();

                // Members were pushed in rank order, so `a < b` for every pair taken this way.
                for (i, &a) in members.iter().enumerate() {
                    for &b in &members[i + 1..] {
                        if within(a, b) {
                            local.push((a, b));
                        }
                    }
                }

                if threshold > 0.0 {
                    for (dx, dy) in FORWARD.iter() {
                        let other = match (cx.checked_add(*dx), cy.checked_add(*dy)) {
                            (Some(x), Some(y)) => (x, y),
                            _ => continue,
                        };
                        if let Some(others) = cells.get(&other) {
                            for &a in members {
                                for &b in others {
                                    if within(a, b) {
                                        local.push((a.min(b), a.max(b)));
                                    }
                                }
                            }
                        }
                    }
                }

                local
            })
            .collect();

        edges.par_sort_unstable();
        debug!(
            cells = cells.len(),
            edges = edges.len(),
            threshold,
            "built neighbor relation"
        );
        Ok(NeighborRelation { edges })
    }

    /// Wraps edges that are already known to be sorted, unique, and `i < j`.
    pub(crate) fn from_sorted_edges(edges: Vec<(InstanceIdx, InstanceIdx)>) -> Self {
        NeighborRelation { edges }
    }

    /// The number of unordered neighbor pairs.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if no two instances are neighbors.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Each unordered pair once, as `(lower rank, higher rank)`, in ascending order.
    pub fn edges(&self) -> &[(InstanceIdx, InstanceIdx)] {
        &self.edges
    }

    /// Returns `true` if `a` and `b` are neighbors, in either order.
    pub fn contains(&self, a: InstanceIdx, b: InstanceIdx) -> bool {
        self.edges.binary_search(&(a.min(b), a.max(b))).is_ok()
    }
}

fn cell_of(x: f64, y: f64, threshold: f64) -> Cell {
    if threshold > 0.0 {
        let side = threshold * CELL_SLACK;
        // `as` saturates for huge quotients, which only makes far-away cells share a bucket.
        ((x / side).floor() as i64, (y / side).floor() as i64)
    } else {
        // Adding zero turns -0.0 into 0.0, so the two spellings of the origin share a bucket.
        ((x + 0.0).to_bits() as i64, (y + 0.0).to_bits() as i64)
    }
}
