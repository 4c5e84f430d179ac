use crate::error::DataError;
use crate::FeatureSet;
use lasso::{Rodeo, RodeoReader, Spur};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Position of an instance within an [`InstanceStore`].
///
/// The store keeps instances sorted by feature label and then by instance id, so this index is
/// also the instance's rank in that total order.
pub type InstanceIdx = u32;

/// A feature, identified by the position of its label among all of a store's labels in
/// ascending order.
///
/// Comparing two `FeatureId`s from the same store gives the same answer as comparing their
/// labels.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FeatureId(u32);

impl FeatureId {
    /// Dense index of this feature, in `0..store.feature_count()`.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        FeatureId(index as u32)
    }
}

/// One located occurrence of a feature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    /// The feature this instance belongs to.
    pub feature: FeatureId,
    /// Identifier, unique among instances of the same feature.
    pub id: i64,
    /// Planar x coordinate.
    pub x: f64,
    /// Planar y coordinate.
    pub y: f64,
    /// Auxiliary attribute carried through from the input (a check-in count in the venue data
    /// this was first used on). Mining ignores it.
    pub aux: i64,
}

impl Instance {
    /// Euclidean distance to another instance. Computed with `hypot`, so it neither overflows
    /// nor underflows for coordinates that are far apart or very close together.
    pub fn distance(&self, other: &Instance) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Immutable collection of instances, grouped by feature.
pub struct InstanceStore {
    labels: RodeoReader<Spur>,
    // Key of each feature's label, in label order.
    keys: Vec<Spur>,
    instances: Vec<Instance>,
    // Instances of feature `f` occupy `offsets[f]..offsets[f + 1]`.
    offsets: Vec<usize>,
}

impl fmt::Debug for InstanceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceStore")
            .field("features", &self.feature_count())
            .field("instances", &self.instances.len())
            .finish()
    }
}

impl InstanceStore {
    /// Starts collecting instances for a new store.
    pub fn builder() -> InstanceStoreBuilder {
        InstanceStoreBuilder::new()
    }

    /// The number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if there are no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// All instances in rank order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The instance at the given rank.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    pub fn get(&self, idx: InstanceIdx) -> &Instance {
        &self.instances[idx as usize]
    }

    /// The number of distinct features.
    pub fn feature_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Every feature, in label order.
    pub fn features(&self) -> impl Iterator<Item = FeatureId> + '_ {
        (0..self.feature_count()).map(FeatureId::from_index)
    }

    /// Looks up a feature by its label.
    pub fn feature(&self, label: &str) -> Option<FeatureId> {
        self.keys
            .binary_search_by(|key| self.labels.resolve(key).cmp(label))
            .ok()
            .map(FeatureId::from_index)
    }

    /// The label of a feature.
    ///
    /// # Panics
    ///
    /// Panics if `feature` came from a different store with more features.
    pub fn label(&self, feature: FeatureId) -> &str {
        self.labels.resolve(&self.keys[feature.index()])
    }

    /// The ranks of every instance of a feature. They're contiguous.
    pub fn feature_range(&self, feature: FeatureId) -> Range<InstanceIdx> {
        let f = feature.index();
        self.offsets[f] as InstanceIdx..self.offsets[f + 1] as InstanceIdx
    }

    /// How many instances a feature has.
    pub fn feature_len(&self, feature: FeatureId) -> usize {
        let f = feature.index();
        self.offsets[f + 1] - self.offsets[f]
    }

    /// Finds the rank of the instance with the given label and id.
    pub fn position(&self, label: &str, id: i64) -> Option<InstanceIdx> {
        let feature = self.feature(label)?;
        let range = self.feature_range(feature);
        let slice = &self.instances[range.start as usize..range.end as usize];
        slice
            .binary_search_by(|instance| instance.id.cmp(&id))
            .ok()
            .map(|offset| range.start + offset as InstanceIdx)
    }

    /// Builds a [`FeatureSet`] from labels, or `None` if any label is unknown.
    pub fn feature_set(&self, labels: &[&str]) -> Option<FeatureSet> {
        labels
            .iter()
            .map(|label| self.feature(label))
            .collect::<Option<Vec<_>>>()
            .map(|ids| FeatureSet::new(&ids))
    }

    /// Formats a feature set with labels, like `{A, B, C}`.
    pub fn describe(&self, set: &FeatureSet) -> String {
        let mut out = String::from("{");
        for (i, feature) in set.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(self.label(feature));
        }
        out.push('}');
        out
    }

    /// The smallest axis-aligned rectangle containing every instance, as
    /// `(min_x, min_y, max_x, max_y)`, or `None` for an empty store.
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.instances.first()?;
        Some(self.instances.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), i| {
                (min_x.min(i.x), min_y.min(i.y), max_x.max(i.x), max_y.max(i.y))
            },
        ))
    }
}

/// Collects instance records and validates them into an [`InstanceStore`].
///
/// ```
/// use colocation::InstanceStore;
///
/// let mut builder = InstanceStore::builder();
/// builder.add("B", 1, 0.0, 0.0, 0);
/// builder.add("A", 7, 1.0, 0.0, 0);
/// builder.add("A", 2, 2.0, 0.0, 0);
/// let store = builder.build().unwrap();
///
/// // Sorted by label, then by id.
/// let ids: Vec<_> = store.instances().iter().map(|i| (store.label(i.feature), i.id)).collect();
/// assert_eq!(ids, [("A", 2), ("A", 7), ("B", 1)]);
/// ```
pub struct InstanceStoreBuilder {
    rodeo: Rodeo<Spur>,
    // Label keys in the order they first showed up, and where each one sits in that list.
    keys: Vec<Spur>,
    first_seen: HashMap<Spur, FeatureId>,
    records: Vec<Instance>,
    non_finite: Option<(String, i64)>,
}

impl InstanceStoreBuilder {
    fn new() -> Self {
        InstanceStoreBuilder {
            rodeo: Rodeo::new(),
            keys: Vec::new(),
            first_seen: HashMap::new(),
            records: Vec::new(),
            non_finite: None,
        }
    }

    /// The number of records added so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records have been added.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds one instance record.
    ///
    /// A record with a coordinate that isn't finite makes [`build`][Self::build] fail. The CSV
    /// loader checks this itself so it can report which line was at fault.
    pub fn add(&mut self, label: &str, id: i64, x: f64, y: f64, aux: i64) -> &mut Self {
        if !(x.is_finite() && y.is_finite()) {
            if self.non_finite.is_none() {
                self.non_finite = Some((label.to_string(), id));
            }
            return self;
        }

        let key = self.rodeo.get_or_intern(label);
        let feature = match self.first_seen.get(&key) {
            Some(&feature) => feature,
            None => {
                let feature = FeatureId::from_index(self.keys.len());
                self.keys.push(key);
                self.first_seen.insert(key, feature);
                feature
            }
        };
        self.records.push(Instance {
            feature,
            id,
            x,
            y,
            aux,
        });
        self
    }

    /// Sorts and validates the collected records.
    pub fn build(self) -> Result<InstanceStore, DataError> {
        let InstanceStoreBuilder {
            rodeo,
            keys,
            mut records,
            non_finite,
            ..
        } = self;

        if let Some((feature, id)) = non_finite {
            return Err(DataError::NonFiniteCoordinate { feature, id });
        }
        if records.len() >= InstanceIdx::MAX as usize {
            return Err(DataError::TooManyInstances {
                count: records.len(),
            });
        }

        // Features were numbered in the order their labels showed up. Renumber them in label
        // order so that comparing ids is the same as comparing labels; the rank order of
        // instances depends on that.
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_unstable_by(|&a, &b| rodeo.resolve(&keys[a]).cmp(rodeo.resolve(&keys[b])));

        let mut remap = vec![FeatureId::from_index(0); keys.len()];
        let mut sorted_keys = Vec::with_capacity(keys.len());
        for (new, &old) in order.iter().enumerate() {
            remap[old] = FeatureId::from_index(new);
            sorted_keys.push(keys[old]);
        }

        for record in records.iter_mut() {
            record.feature = remap[record.feature.index()];
        }

        records.sort_unstable_by(|a, b| match a.feature.cmp(&b.feature) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        });

        if let Some(pair) = records
            .windows(2)
            .find(|pair| pair[0].feature == pair[1].feature && pair[0].id == pair[1].id)
        {
            return Err(DataError::DuplicateInstance {
                feature: rodeo.resolve(&sorted_keys[pair[0].feature.index()]).to_string(),
                id: pair[0].id,
            });
        }

        let mut offsets = vec![0; sorted_keys.len() + 1];
        for record in records.iter() {
            offsets[record.feature.index() + 1] += 1;
        }
        for f in 1..offsets.len() {
            offsets[f] += offsets[f - 1];
        }

        records.shrink_to_fit();
        Ok(InstanceStore {
            labels: rodeo.into_reader(),
            keys: sorted_keys,
            instances: records,
            offsets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InstanceStore {
        let mut builder = InstanceStore::builder();
        builder
            .add("C", 1, 5.0, 5.0, 3)
            .add("A", 2, 0.0, 1.0, 1)
            .add("B", 1, 1.0, 1.0, 0)
            .add("A", 1, 0.0, 0.0, 2);
        builder.build().unwrap()
    }

    #[test]
    fn features_follow_label_order() {
        let store = store();
        let labels: Vec<_> = store.features().map(|f| store.label(f)).collect();
        assert_eq!(labels, ["A", "B", "C"]);
        assert!(store.feature("A").unwrap() < store.feature("B").unwrap());
        assert_eq!(store.feature("Z"), None);
    }

    #[test]
    fn ranks_group_by_feature() {
        let store = store();
        let a = store.feature("A").unwrap();
        assert_eq!(store.feature_range(a), 0..2);
        assert_eq!(store.feature_len(a), 2);
        assert_eq!(store.position("A", 2), Some(1));
        assert_eq!(store.position("C", 1), Some(3));
        assert_eq!(store.position("C", 2), None);
        assert_eq!(store.get(1).aux, 1);
    }

    #[test]
    fn duplicate_ids_within_a_feature_are_rejected() {
        let mut builder = InstanceStore::builder();
        builder.add("A", 1, 0.0, 0.0, 0).add("B", 1, 0.0, 0.0, 0);
        builder.add("A", 1, 3.0, 3.0, 0);
        match builder.build() {
            Err(DataError::DuplicateInstance { feature, id }) => {
                assert_eq!(feature, "A");
                assert_eq!(id, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_store() {
        let store = InstanceStore::builder().build().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.feature_count(), 0);
        assert_eq!(store.bounding_box(), None);
    }

    #[test]
    fn describe_uses_labels() {
        let store = store();
        let set = store.feature_set(&["C", "A"]).unwrap();
        assert_eq!(store.describe(&set), "{A, C}");
        assert_eq!(store.bounding_box(), Some((0.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn non_finite_coordinates_fail_the_build() {
        let mut builder = InstanceStore::builder();
        builder
            .add("A", 1, 0.0, 0.0, 0)
            .add("B", 4, f64::NAN, 0.0, 0)
            .add("C", 1, 0.0, f64::INFINITY, 0);
        match builder.build() {
            Err(DataError::NonFiniteCoordinate { feature, id }) => {
                assert_eq!(feature, "B");
                assert_eq!(id, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn feature_ids_follow_label_order_not_arrival_order() {
        let mut builder = InstanceStore::builder();
        builder
            .add("Zoo", 1, 0.0, 0.0, 0)
            .add("Bank", 1, 0.0, 0.0, 0)
            .add("Mall", 1, 0.0, 0.0, 0)
            .add("Bank", 2, 0.0, 0.0, 0);
        let store = builder.build().unwrap();
        let indexes: Vec<_> = ["Bank", "Mall", "Zoo"]
            .iter()
            .map(|label| store.feature(label).unwrap().index())
            .collect();
        assert_eq!(indexes, [0, 1, 2]);
        assert_eq!(store.label(FeatureId::from_index(2)), "Zoo");
        assert_eq!(store.feature_len(FeatureId::from_index(0)), 2);
    }

    #[test]
    fn distance_survives_extreme_magnitudes() {
        let mut builder = InstanceStore::builder();
        builder
            .add("A", 1, 0.0, 0.0, 0)
            .add("B", 1, 1.9e200, 0.0, 0)
            .add("C", 1, 0.0, 1.9e-200, 0);
        let store = builder.build().unwrap();
        assert_eq!(store.get(0).distance(store.get(1)), 1.9e200);
        assert_eq!(store.get(0).distance(store.get(2)), 1.9e-200);
    }
}
