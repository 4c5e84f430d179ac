use crate::neighbor::NeighborRelation;
use crate::store::InstanceIdx;
use std::ops::Range;

/// For every instance, the neighbors that rank above it.
///
/// Rank is position in the [`InstanceStore`][crate::InstanceStore], which sorts by feature label
/// and then instance id, so each edge of the [`NeighborRelation`] lands in exactly one star: the
/// star of its lower-ranked endpoint. Asking whether two instances are neighbors only needs to
/// look in that one star.
///
/// Stars are stored back to back in one vector, each sorted in ascending rank order. Since ranks
/// group instances by feature, the part of a star belonging to one feature is a contiguous slice,
/// which is what the table-instance search iterates over.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StarNeighborhoods {
    // Star of instance `i` is `neighbors[offsets[i]..offsets[i + 1]]`.
    offsets: Vec<usize>,
    neighbors: Vec<InstanceIdx>,
}

impl StarNeighborhoods {
    /// Derives star neighborhoods for `instance_count` instances from a neighbor relation.
    pub fn from_relation(relation: &NeighborRelation, instance_count: usize) -> Self {
        let mut offsets = vec![0; instance_count + 1];
        for &(center, _) in relation.edges() {
            offsets[center as usize + 1] += 1;
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        // The relation is sorted by lower endpoint and then by higher endpoint, which is exactly
        // the order the stars are laid out in.
        let neighbors = relation.edges().iter().map(|&(_, other)| other).collect();
        StarNeighborhoods { offsets, neighbors }
    }

    pub(crate) fn from_parts(offsets: Vec<usize>, neighbors: Vec<InstanceIdx>) -> Self {
        StarNeighborhoods { offsets, neighbors }
    }

    pub(crate) fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub(crate) fn neighbors(&self) -> &[InstanceIdx] {
        &self.neighbors
    }

    /// The number of instances covered by this index.
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Returns `true` if this index covers no instances.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of edges across all stars.
    pub fn edge_count(&self) -> usize {
        self.neighbors.len()
    }

    /// The higher-ranked neighbors of `center`, in ascending order.
    pub fn star(&self, center: InstanceIdx) -> &[InstanceIdx] {
        let c = center as usize;
        &self.neighbors[self.offsets[c]..self.offsets[c + 1]]
    }

    /// The part of `center`'s star that falls within a range of ranks, typically the
    /// [`feature_range`][crate::InstanceStore::feature_range] of one feature.
    pub fn star_within(&self, center: InstanceIdx, ranks: Range<InstanceIdx>) -> &[InstanceIdx] {
        let star = self.star(center);
        let start = star.partition_point(|&n| n < ranks.start);
        let end = start + star[start..].partition_point(|&n| n < ranks.end);
        &star[start..end]
    }

    /// Returns `true` if `other` is in `center`'s star. This only finds neighbors ranked above
    /// `center`; use [`are_neighbors`][Self::are_neighbors] when the order isn't known.
    pub fn contains(&self, center: InstanceIdx, other: InstanceIdx) -> bool {
        self.star(center).binary_search(&other).is_ok()
    }

    /// Returns `true` if `a` and `b` are neighbors, in either order.
    pub fn are_neighbors(&self, a: InstanceIdx, b: InstanceIdx) -> bool {
        a != b && self.contains(a.min(b), a.max(b))
    }

    /// Every star with its center, in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (InstanceIdx, &[InstanceIdx])> + '_ {
        (0..self.len()).map(move |c| (c as InstanceIdx, self.star(c as InstanceIdx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation() -> NeighborRelation {
        NeighborRelation::from_sorted_edges(vec![(0, 2), (0, 3), (1, 2), (2, 3), (2, 4)])
    }

    #[test]
    fn every_edge_lands_in_one_star() {
        let stars = StarNeighborhoods::from_relation(&relation(), 5);
        assert_eq!(stars.len(), 5);
        assert_eq!(stars.edge_count(), 5);
        assert_eq!(stars.star(0), &[2, 3]);
        assert_eq!(stars.star(1), &[2]);
        assert_eq!(stars.star(2), &[3, 4]);
        assert!(stars.star(3).is_empty());
        assert!(stars.star(4).is_empty());
    }

    #[test]
    fn lookups_are_symmetric() {
        let stars = StarNeighborhoods::from_relation(&relation(), 5);
        for &(a, b) in relation().edges() {
            assert!(stars.are_neighbors(a, b));
            assert!(stars.are_neighbors(b, a));
            assert!(!stars.contains(b, a));
        }
        assert!(!stars.are_neighbors(0, 1));
        assert!(!stars.are_neighbors(3, 3));
    }

    #[test]
    fn star_within_narrows_to_a_range() {
        let stars = StarNeighborhoods::from_relation(&relation(), 5);
        assert_eq!(stars.star_within(2, 0..4), &[3]);
        assert_eq!(stars.star_within(2, 4..5), &[4]);
        assert!(stars.star_within(0, 4..5).is_empty());
    }
}
