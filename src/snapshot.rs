//! A serializable copy of a [`Dataset`], so the neighbor relation and star index don't have to
//! be recomputed every run.
//!
//! Nothing in a snapshot is trusted when it's read back. Instances are revalidated by the same
//! builder the loader uses, and every edge and star entry is checked against them. That proves
//! each stored edge is real, not that none are missing; [`Dataset::verify_relation`] checks
//! completeness by rebuilding the relation.

use crate::dataset::{Dataset, Proximity};
use crate::error::{PreconditionError, SnapshotError};
use crate::neighbor::NeighborRelation;
use crate::star::StarNeighborhoods;
use crate::store::{InstanceIdx, InstanceStore};
use serde::{Deserialize, Serialize};
use std::io;

/// The snapshot layout version written by this crate.
pub const VERSION: u32 = 1;

/// Everything needed to reconstruct a [`Dataset`] without recomputing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    version: u32,
    threshold: f64,
    features: Vec<String>,
    instances: Vec<StoredInstance>,
    edges: Vec<(InstanceIdx, InstanceIdx)>,
    star_offsets: Vec<usize>,
    star_neighbors: Vec<InstanceIdx>,
}

/// One instance, in rank order, with its feature given as an index into the label list.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct StoredInstance {
    feature: usize,
    id: i64,
    x: f64,
    y: f64,
    aux: i64,
}

impl Snapshot {
    /// The layout version this snapshot claims.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The distance threshold the stored relation was built with.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Writes the snapshot as JSON.
    pub fn write<W: io::Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }

    /// Reads a snapshot written by [`write`][Self::write]. This only checks that the JSON has
    /// the right shape; [`Dataset::from_snapshot`] does the rest.
    pub fn read<R: io::Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}

impl Dataset {
    /// Captures this dataset so it can be stored and restored later.
    pub fn snapshot(&self) -> Snapshot {
        let store = self.instances();
        Snapshot {
            version: VERSION,
            threshold: self.threshold(),
            features: store.features().map(|f| store.label(f).to_string()).collect(),
            instances: store
                .instances()
                .iter()
                .map(|i| StoredInstance {
                    feature: i.feature.index(),
                    id: i.id,
                    x: i.x,
                    y: i.y,
                    aux: i.aux,
                })
                .collect(),
            edges: self.relation().edges().to_vec(),
            star_offsets: self.stars().offsets().to_vec(),
            star_neighbors: self.stars().neighbors().to_vec(),
        }
    }

    /// Rebuilds a dataset from a snapshot, checking that every part of it is consistent.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Dataset, SnapshotError> {
        if snapshot.version != VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
                expected: VERSION,
            });
        }

        let threshold = snapshot.threshold;
        if !(threshold >= 0.0 && threshold.is_finite()) {
            return Err(PreconditionError::InvalidThreshold(threshold).into());
        }

        let store = restore_instances(&snapshot)?;
        check_edges(&store, &snapshot.edges, threshold)?;

        let relation = NeighborRelation::from_sorted_edges(snapshot.edges);
        let stars = StarNeighborhoods::from_parts(snapshot.star_offsets, snapshot.star_neighbors);
        if stars != StarNeighborhoods::from_relation(&relation, store.len()) {
            return Err(inconsistent("star index doesn't match the neighbor relation"));
        }

        Ok(Dataset::from_parts(
            store,
            Proximity {
                threshold,
                relation,
                stars,
            },
        ))
    }
}

impl Dataset {
    /// Rebuilds the neighbor relation from the instances and checks it matches the one held.
    ///
    /// [`from_snapshot`][Dataset::from_snapshot] only rejects edges that are wrong, so a
    /// snapshot with missing edges passes it. This catches those, at the cost of a full build.
    pub fn verify_relation(&self) -> Result<(), SnapshotError> {
        let rebuilt = NeighborRelation::build(self.instances(), self.threshold())?;
        if &rebuilt != self.relation() {
            return Err(inconsistent(format!(
                "neighbor relation has {} edges but the instances give {}",
                self.relation().len(),
                rebuilt.len()
            )));
        }
        Ok(())
    }
}

fn inconsistent(what: impl Into<String>) -> SnapshotError {
    SnapshotError::Inconsistent(what.into())
}

fn restore_instances(snapshot: &Snapshot) -> Result<InstanceStore, SnapshotError> {
    let mut builder = InstanceStore::builder();
    for stored in &snapshot.instances {
        let label = snapshot
            .features
            .get(stored.feature)
            .ok_or_else(|| inconsistent(format!("feature index {} is unknown", stored.feature)))?;
        if !(stored.x.is_finite() && stored.y.is_finite()) {
            return Err(inconsistent(format!(
                "instance {} of '{}' has a non-finite coordinate",
                stored.id, label
            )));
        }
        builder.add(label, stored.id, stored.x, stored.y, stored.aux);
    }
    let store = builder.build()?;

    // Ranks index the edges, so the rebuilt store must put every instance exactly where it was.
    if store.feature_count() != snapshot.features.len() {
        return Err(inconsistent("feature list doesn't match the instances"));
    }
    let in_order = store
        .instances()
        .iter()
        .zip(&snapshot.instances)
        .all(|(restored, stored)| {
            store.label(restored.feature) == snapshot.features[stored.feature]
                && restored.id == stored.id
        });
    if !in_order {
        return Err(inconsistent("instances aren't in rank order"));
    }
    Ok(store)
}

fn check_edges(
    store: &InstanceStore,
    edges: &[(InstanceIdx, InstanceIdx)],
    threshold: f64,
) -> Result<(), SnapshotError> {
    let n = store.len();
    for &(a, b) in edges {
        if a >= b || b as usize >= n {
            return Err(inconsistent(format!("edge ({}, {}) is out of range", a, b)));
        }
        if store.get(a).distance(store.get(b)) > threshold {
            return Err(inconsistent(format!(
                "edge ({}, {}) is longer than the threshold",
                a, b
            )));
        }
    }
    if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(inconsistent("edges aren't sorted and unique"));
    }
    Ok(())
}
