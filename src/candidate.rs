use crate::dataset::Dataset;
use crate::{FeatureId, FeatureSet};
use std::collections::{BTreeSet, HashSet};

/// Every pair of distinct features with at least one neighboring pair of instances, in
/// canonical order. Pairs with no edges at all can't have any table instances, so they never
/// enter the search.
pub(crate) fn seed(dataset: &Dataset) -> Vec<FeatureSet> {
    let store = dataset.instances();
    let mut pairs = BTreeSet::new();
    for &(a, b) in dataset.relation().edges() {
        let fa = store.get(a).feature;
        let fb = store.get(b).feature;
        if fa != fb {
            pairs.insert(FeatureSet::new(&[fa, fb]));
        }
    }
    pairs.into_iter().collect()
}

/// Generates the candidates one feature larger than the given prevalent patterns.
///
/// `prevalent` must all be the same size and sorted in canonical order, which is what the miner
/// produces.
///
/// Two patterns that agree on everything but their last feature are joined into one set that
/// has both last features. Because the participation index can only go down as a pattern grows,
/// the joined set can only be prevalent if every subset one feature smaller is prevalent too, so
/// any candidate with a missing subset is dropped without ever looking at its instances.
pub(crate) fn extend(prevalent: &[FeatureSet]) -> Vec<FeatureSet> {
    let known: HashSet<&FeatureSet> = prevalent.iter().collect();
    let mut candidates = Vec::new();

    // Sorted order puts patterns sharing a prefix next to each other, so each group of equal
    // prefixes is a contiguous run.
    let mut start = 0;
    while start < prevalent.len() {
        let shared = prefix(&prevalent[start]);
        let end = start
            + prevalent[start..]
                .iter()
                .take_while(|p| prefix(p) == shared)
                .count();

        let group = &prevalent[start..end];
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                let mut joined = a.clone();
                if let Some(&last) = b.as_slice().last() {
                    joined.0.push(last);
                }
                debug_assert_eq!(joined, FeatureSet::new(joined.as_slice()));

                // The first subset yielded drops the last feature and is `a` itself; skip it.
                if joined
                    .remove_one_feature()
                    .skip(1)
                    .all(|subset| known.contains(&subset))
                {
                    candidates.push(joined);
                }
            }
        }
        start = end;
    }

    // Groups are visited in order and `b` always sorts after `a`, so the output is already in
    // canonical order.
    debug_assert!(candidates.windows(2).all(|w| w[0] < w[1]));
    candidates
}

fn prefix(pattern: &FeatureSet) -> &[FeatureId] {
    let slice = pattern.as_slice();
    &slice[..slice.len().saturating_sub(1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(indexes: &[usize]) -> FeatureSet {
        indexes
            .iter()
            .map(|&i| FeatureId::from_index(i))
            .collect()
    }

    #[test]
    fn joins_on_shared_prefix() {
        let prevalent = vec![f(&[0, 1]), f(&[0, 2]), f(&[1, 2])];
        assert_eq!(extend(&prevalent), vec![f(&[0, 1, 2])]);
    }

    #[test]
    fn prunes_when_a_subset_is_missing() {
        // {1, 2} isn't prevalent, so {0, 1, 2} can't be either.
        let prevalent = vec![f(&[0, 1]), f(&[0, 2]), f(&[1, 3])];
        assert!(extend(&prevalent).is_empty());
    }

    #[test]
    fn larger_levels() {
        let prevalent = vec![
            f(&[0, 1, 2]),
            f(&[0, 1, 3]),
            f(&[0, 2, 3]),
            f(&[1, 2, 3]),
            f(&[1, 2, 4]),
        ];
        assert_eq!(extend(&prevalent), vec![f(&[0, 1, 2, 3])]);
    }

    #[test]
    fn nothing_from_nothing() {
        assert!(extend(&[]).is_empty());
        assert!(extend(&[f(&[0, 1])]).is_empty());
    }
}
