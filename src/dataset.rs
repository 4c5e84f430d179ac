use crate::error::PreconditionError;
use crate::neighbor::NeighborRelation;
use crate::star::StarNeighborhoods;
use crate::store::{InstanceIdx, InstanceStore};
use tracing::info;

/// A threshold together with everything computed from it. Keeping these in one value means a
/// rebuild replaces all of them at once.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Proximity {
    pub(crate) threshold: f64,
    pub(crate) relation: NeighborRelation,
    pub(crate) stars: StarNeighborhoods,
}

impl Proximity {
    fn build(instances: &InstanceStore, threshold: f64) -> Result<Self, PreconditionError> {
        let relation = NeighborRelation::build(instances, threshold)?;
        let stars = StarNeighborhoods::from_relation(&relation, instances.len());
        Ok(Proximity {
            threshold,
            relation,
            stars,
        })
    }
}

/// An instance store plus its neighbor relation and star index for one distance threshold.
///
/// This is everything the miner needs, and it's immutable once built, so any number of mining
/// runs (or threads) can share one `Dataset`.
#[derive(Debug)]
pub struct Dataset {
    instances: InstanceStore,
    proximity: Proximity,
}

impl Dataset {
    /// Builds the neighbor relation and star index for `threshold`.
    ///
    /// Fails if `threshold` is negative or not finite.
    pub fn build(instances: InstanceStore, threshold: f64) -> Result<Self, PreconditionError> {
        let proximity = Proximity::build(&instances, threshold)?;
        info!(
            instances = instances.len(),
            features = instances.feature_count(),
            edges = proximity.relation.len(),
            threshold,
            "built dataset"
        );
        Ok(Dataset {
            instances,
            proximity,
        })
    }

    pub(crate) fn from_parts(instances: InstanceStore, proximity: Proximity) -> Self {
        Dataset {
            instances,
            proximity,
        }
    }

    /// Replaces the neighbor relation and star index with ones built for a new threshold.
    ///
    /// The new index is fully built before anything is replaced, so on error the dataset is
    /// left exactly as it was.
    pub fn rebuild(&mut self, threshold: f64) -> Result<(), PreconditionError> {
        self.proximity = Proximity::build(&self.instances, threshold)?;
        info!(
            edges = self.proximity.relation.len(),
            threshold, "rebuilt dataset"
        );
        Ok(())
    }

    /// The instances this dataset was built from.
    pub fn instances(&self) -> &InstanceStore {
        &self.instances
    }

    /// The distance threshold the relation and star index were built with.
    pub fn threshold(&self) -> f64 {
        self.proximity.threshold
    }

    /// The neighbor relation.
    pub fn relation(&self) -> &NeighborRelation {
        &self.proximity.relation
    }

    /// The star neighborhood index.
    pub fn stars(&self) -> &StarNeighborhoods {
        &self.proximity.stars
    }

    /// Returns `true` if two instances are within the threshold of each other.
    pub fn are_neighbors(&self, a: InstanceIdx, b: InstanceIdx) -> bool {
        self.proximity.stars.are_neighbors(a, b)
    }

    /// Gives back the instance store, dropping the computed index.
    pub fn into_instances(self) -> InstanceStore {
        self.instances
    }
}
