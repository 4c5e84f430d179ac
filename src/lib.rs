#![warn(missing_docs)]
#![doc(test(no_crate_inject))]
#![doc(test(attr(deny(unused, future_incompatible))))]

//! This crate discovers spatial co-location patterns: sets of features (categories of
//! point-located events, like kinds of venues) whose instances are found close to each other
//! more often than chance would suggest. It implements the "joinless" approach described in:
//!
//! - Yoo and Shekhar, [A Joinless Approach for Mining Spatial Colocation Patterns][joinless],
//!   2006
//!
//! [joinless]: https://doi.org/10.1109/TKDE.2006.150
//!
//! The pipeline is:
//!
//! 1. Collect instances into an [`InstanceStore`], usually with [`load::read_instances`].
//! 2. Build a [`Dataset`] for a distance threshold. That computes the [`NeighborRelation`] with
//!    a uniform grid and derives the [`StarNeighborhoods`] index from it.
//! 3. Run [`mine`] (or a configured [`Miner`]) to get every prevalent [`ColocationPattern`].
//! 4. Optionally, derive [`rules`] and check [`significance`] against spatial randomness.
//!
//! Building a dataset is the expensive part, so [`cache::load_or_build`] can persist a
//! [`snapshot::Snapshot`] of it and reuse it as long as the threshold hasn't changed.
//!
//! ```
//! use colocation::{mine, Dataset, InstanceStore};
//!
//! let mut builder = InstanceStore::builder();
//! builder
//!     .add("A", 1, 0.0, 0.0, 0)
//!     .add("B", 1, 1.0, 0.0, 0)
//!     .add("A", 2, 50.0, 50.0, 0)
//!     .add("B", 2, 90.0, 90.0, 0);
//! let dataset = Dataset::build(builder.build().unwrap(), 2.0).unwrap();
//!
//! let patterns = mine(&dataset, 0.5).unwrap();
//! assert_eq!(patterns.len(), 1);
//! assert_eq!(dataset.instances().describe(&patterns[0].features), "{A, B}");
//! assert_eq!(patterns[0].participation_index, 0.5);
//! ```

pub use sorted_iter;

use smallvec::SmallVec;
use sorted_iter::assume::AssumeSortedByItemExt;
use sorted_iter::sorted_iterator::SortedByItem;
use sorted_iter::SortedIterator;
use std::iter;

pub mod cache;
mod candidate;
mod clique;
pub mod config;
mod dataset;
pub mod error;
pub mod load;
mod mining;
mod neighbor;
mod prevalence;
pub mod rules;
pub mod significance;
pub mod snapshot;
mod star;
mod store;

pub use clique::TableInstances;
pub use dataset::Dataset;
pub use mining::{mine, ColocationPattern, Level, Miner};
pub use neighbor::NeighborRelation;
pub use prevalence::participation_index;
pub use star::StarNeighborhoods;
pub use store::{FeatureId, Instance, InstanceIdx, InstanceStore, InstanceStoreBuilder};

/// A set of features, kept sorted and free of duplicates. Candidates and patterns are both
/// represented this way, so two sets with the same members always compare equal.
///
/// This implementation avoids heap allocations for sets of up to four features, which covers
/// nearly every pattern that turns out to be prevalent in practice.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FeatureSet(SmallVec<[FeatureId; 4]>);

impl FeatureSet {
    /// Creates a feature set containing the specified features.
    ///
    /// It's okay if the provided slice contains duplicates.
    pub fn new(ids: &[FeatureId]) -> Self {
        let mut v = SmallVec::from_slice(ids);
        v.sort_unstable();
        v.dedup();
        FeatureSet(v)
    }

    /// The number of features in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no features.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The features in ascending order.
    pub fn as_slice(&self) -> &[FeatureId] {
        &self.0
    }

    /// Returns an iterator over the features which appear in this set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = FeatureId> + SortedByItem + Clone + '_ {
        self.0.iter().copied().assume_sorted_by_item()
    }

    /// Where `feature` sits within this set, if it's a member.
    pub fn position(&self, feature: FeatureId) -> Option<usize> {
        self.0.binary_search(&feature).ok()
    }

    /// Returns `true` if `other` contains every feature that `self` does.
    ///
    /// ```
    /// use colocation::InstanceStore;
    ///
    /// let mut builder = InstanceStore::builder();
    /// builder.add("A", 1, 0.0, 0.0, 0).add("B", 1, 0.0, 0.0, 0);
    /// let store = builder.build().unwrap();
    ///
    /// let a = store.feature_set(&["A"]).unwrap();
    /// let ab = store.feature_set(&["B", "A"]).unwrap();
    /// assert!(a.is_subset(&ab));
    /// assert!(ab.is_subset(&ab));
    /// assert!(!ab.is_subset(&a));
    /// assert!(ab.is_superset(&a));
    /// ```
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().intersection(other.iter()).eq(self.iter())
    }

    /// Returns `true` if `self` contains every feature that `other` does.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// The features of `self` that aren't in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        FeatureSet(self.iter().difference(other.iter()).collect())
    }

    /// Returns an iterator over every subset of this feature set that has one less feature in
    /// it.
    pub(crate) fn remove_one_feature(
        &self,
    ) -> impl DoubleEndedIterator<Item = Self> + ExactSizeIterator + iter::FusedIterator + '_ {
        // Working from the end backward produces the subsets in lexicographic order.
        (0..self.len()).rev().map(move |remove_idx| {
            let mut selected = FeatureSet(SmallVec::with_capacity(self.len() - 1));
            selected.0.extend_from_slice(&self.0[..remove_idx]);
            selected.0.extend_from_slice(&self.0[remove_idx + 1..]);
            selected
        })
    }

    /// Returns every non-empty proper subset, each paired with the positions of its features
    /// within `self`.
    pub(crate) fn proper_subsets(&self) -> impl Iterator<Item = (Self, SmallVec<[usize; 4]>)> + '_ {
        let len = self.len();
        debug_assert!(len < 64);
        let full: u64 = (1 << len) - 1;
        (1..full).map(move |mask| {
            let mut subset = FeatureSet(SmallVec::new());
            let mut columns = SmallVec::new();
            for (column, feature) in self.0.iter().enumerate() {
                if mask & (1 << column) != 0 {
                    subset.0.push(*feature);
                    columns.push(column);
                }
            }
            (subset, columns)
        })
    }
}

impl std::fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.0.iter().map(|feature| feature.index()))
            .finish()
    }
}

impl iter::FromIterator<FeatureId> for FeatureSet {
    /// Creates a feature set containing the specified features.
    ///
    /// It's okay if the provided iterator contains duplicates.
    fn from_iter<I: IntoIterator<Item = FeatureId>>(iter: I) -> Self {
        let mut v = SmallVec::from_iter(iter);
        v.sort_unstable();
        v.dedup();
        FeatureSet(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<FeatureId> {
        (0..n).map(FeatureId::from_index).collect()
    }

    #[test]
    fn new_sorts_and_dedups() {
        let f = ids(3);
        let set = FeatureSet::new(&[f[2], f[0], f[2], f[1]]);
        assert_eq!(set.as_slice(), &f[..]);
        assert_eq!(set.position(f[1]), Some(1));
    }

    #[test]
    fn remove_one_feature_visits_every_subset() {
        let f = ids(3);
        let abc = FeatureSet::new(&f);
        let subsets: Vec<_> = abc.remove_one_feature().collect();
        assert_eq!(
            subsets,
            vec![
                FeatureSet::new(&[f[0], f[1]]),
                FeatureSet::new(&[f[0], f[2]]),
                FeatureSet::new(&[f[1], f[2]]),
            ]
        );
    }

    #[test]
    fn proper_subsets_exclude_empty_and_full() {
        let f = ids(3);
        let abc = FeatureSet::new(&f);
        let subsets: Vec<_> = abc.proper_subsets().collect();
        assert_eq!(subsets.len(), 6);
        for (subset, columns) in subsets {
            assert!(!subset.is_empty() && subset.len() < 3);
            let picked: Vec<_> = columns.iter().map(|&c| f[c]).collect();
            assert_eq!(subset.as_slice(), &picked[..]);
        }
    }

    #[test]
    fn difference_keeps_order() {
        let f = ids(4);
        let all = FeatureSet::new(&f);
        let some = FeatureSet::new(&[f[1], f[3]]);
        assert_eq!(all.difference(&some), FeatureSet::new(&[f[0], f[2]]));
    }
}
