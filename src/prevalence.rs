use crate::clique::TableInstances;
use crate::store::InstanceStore;
use smallvec::SmallVec;

/// Per-feature participation ratios of a pattern, in the same order as its features.
pub(crate) type Ratios = SmallVec<[f64; 4]>;

/// Computes the participation ratio of every feature of a table's pattern.
///
/// The participation ratio of a feature is the fraction of its instances that show up in at
/// least one row. An instance may appear in many rows, so each column is deduplicated before
/// counting.
pub(crate) fn participation_ratios(store: &InstanceStore, table: &TableInstances) -> Ratios {
    let mut seen = Vec::with_capacity(table.len());
    table
        .features()
        .iter()
        .enumerate()
        .map(|(column, feature)| {
            let total = store.feature_len(feature);
            if total == 0 {
                return 0.0;
            }
            seen.clear();
            seen.extend(table.column(column));
            seen.sort_unstable();
            seen.dedup();
            seen.len() as f64 / total as f64
        })
        .collect()
}

/// The participation index of a pattern: the smallest of its participation ratios.
///
/// The index of a single feature, where every instance trivially participates, is 1.0. That's
/// also what an empty list of ratios gives.
///
/// ```
/// use colocation::participation_index;
///
/// assert_eq!(participation_index(&[0.5, 1.0, 0.75]), 0.5);
/// assert_eq!(participation_index(&[1.0]), 1.0);
/// assert_eq!(participation_index(&[]), 1.0);
/// ```
pub fn participation_index(ratios: &[f64]) -> f64 {
    ratios.iter().copied().fold(1.0, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clique::table_instances;
    use crate::Dataset;

    #[test]
    fn counts_distinct_participants() {
        // b1 sits next to both a1 and a2, so it's in two rows but counts once.
        let mut builder = InstanceStore::builder();
        builder
            .add("A", 1, 0.0, 0.0, 0)
            .add("A", 2, 2.0, 0.0, 0)
            .add("A", 3, 50.0, 0.0, 0)
            .add("B", 1, 1.0, 0.0, 0)
            .add("B", 2, 90.0, 0.0, 0);
        let dataset = Dataset::build(builder.build().unwrap(), 1.0).unwrap();

        let ab = dataset.instances().feature_set(&["A", "B"]).unwrap();
        let table = table_instances(&dataset, &ab);
        assert_eq!(table.len(), 2);

        let ratios = participation_ratios(dataset.instances(), &table);
        assert_eq!(ratios.as_slice(), &[2.0 / 3.0, 0.5]);
        assert_eq!(participation_index(&ratios), 0.5);
    }

    #[test]
    fn single_feature_is_always_prevalent() {
        let mut builder = InstanceStore::builder();
        builder.add("A", 1, 0.0, 0.0, 0).add("A", 2, 9.0, 9.0, 0);
        let dataset = Dataset::build(builder.build().unwrap(), 1.0).unwrap();

        let a = dataset.instances().feature_set(&["A"]).unwrap();
        let table = table_instances(&dataset, &a);
        let ratios = participation_ratios(dataset.instances(), &table);
        assert_eq!(participation_index(&ratios), 1.0);
    }
}
