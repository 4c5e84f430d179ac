use crate::dataset::Dataset;
use crate::star::StarNeighborhoods;
use crate::store::{InstanceIdx, InstanceStore};
use crate::FeatureSet;
use smallvec::SmallVec;

/// The table instances of one candidate: every way of picking one instance per feature such
/// that all the picked instances are pairwise neighbors.
///
/// Rows are stored back to back in one vector. Column `c` of every row holds an instance of the
/// candidate's `c`th feature, and each row is in ascending rank order.
#[derive(Clone, Debug, PartialEq)]
pub struct TableInstances {
    features: FeatureSet,
    cells: Vec<InstanceIdx>,
}

impl TableInstances {
    /// The features labelling the columns.
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.cells.len() / self.width()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The number of columns.
    pub fn width(&self) -> usize {
        self.features.len().max(1)
    }

    /// Every row, in the order the search found them: by first column, then second, and so on.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[InstanceIdx]> + '_ {
        self.cells.chunks_exact(self.width())
    }

    /// One column of every row. The same instance may show up in many rows.
    pub fn column(&self, column: usize) -> impl Iterator<Item = InstanceIdx> + '_ {
        self.rows().map(move |row| row[column])
    }
}

/// Finds every table instance of `candidate`.
///
/// The search never consults the full neighbor relation or joins tables of smaller patterns.
/// Everything it needs is in the star index. Candidates are sorted, and ranks group instances
/// by feature in the same order, so every row is increasing in rank and all of its members lie
/// in the star of its first instance. For each instance of the first feature, the search walks
/// that star one feature at a time and keeps an instance only if it's in the star of every
/// instance already picked. The first failed check rejects it.
pub(crate) fn table_instances(dataset: &Dataset, candidate: &FeatureSet) -> TableInstances {
    let mut table = TableInstances {
        features: candidate.clone(),
        cells: Vec::new(),
    };

    let first = match candidate.as_slice().first() {
        Some(&first) => first,
        None => return table,
    };

    let search = Search {
        store: dataset.instances(),
        stars: dataset.stars(),
        candidate,
    };

    let mut row = SmallVec::<[InstanceIdx; 8]>::new();
    for center in dataset.instances().feature_range(first) {
        row.push(center);
        search.extend(&mut row, &mut table.cells);
        row.pop();
    }
    table
}

struct Search<'a> {
    store: &'a InstanceStore,
    stars: &'a StarNeighborhoods,
    candidate: &'a FeatureSet,
}

impl Search<'_> {
    fn extend(&self, row: &mut SmallVec<[InstanceIdx; 8]>, out: &mut Vec<InstanceIdx>) {
        let depth = row.len();
        let features = self.candidate.as_slice();
        if depth == features.len() {
            out.extend_from_slice(row);
            return;
        }

        let range = self.store.feature_range(features[depth]);
        for &next in self.stars.star_within(row[0], range) {
            // `next` ranks above every member, so it has to be in each member's star.
            if row[1..]
                .iter()
                .all(|&member| self.stars.contains(member, next))
            {
                row.push(next);
                self.extend(row, out);
                row.pop();
            }
        }
    }
}
