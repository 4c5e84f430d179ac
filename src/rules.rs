//! Co-location rules derived from prevalent patterns.
//!
//! A rule `X → Y` says that wherever the features of `X` are found together, the features of
//! `Y` tend to be nearby as well. For a pattern `P = X ∪ Y`, its conditional probability is the
//! fraction of `X`'s table instances that extend to a table instance of `P`.

use crate::error::PreconditionError;
use crate::mining::ColocationPattern;
use crate::store::{InstanceIdx, InstanceStore};
use crate::{FeatureSet, TableInstances};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// A co-location rule.
#[derive(Clone, Debug, PartialEq)]
pub struct ColocationRule {
    /// The features on the left of the arrow.
    pub antecedent: FeatureSet,
    /// The features on the right of the arrow.
    pub consequent: FeatureSet,
    /// Fraction of the antecedent's table instances that are part of a table instance of the
    /// whole pattern.
    pub conditional_probability: f64,
    /// Participation index of the pattern the rule came from.
    pub participation_index: f64,
}

/// Derives every rule with conditional probability of at least `min_conditional_probability`
/// from the output of a miner that kept table instances.
///
/// For each pattern, every non-empty proper subset of its features is tried as an antecedent.
/// The antecedent's own table instances come from the pattern for that subset, which is
/// guaranteed to be present because every subset of a prevalent pattern is prevalent. A single
/// feature's table instances are just its instances.
///
/// Rules come out in the same order as their patterns, and within a pattern ordered by their
/// antecedents.
pub fn derive(
    store: &InstanceStore,
    patterns: &[ColocationPattern],
    min_conditional_probability: f64,
) -> Result<Vec<ColocationRule>, PreconditionError> {
    if !(0.0..=1.0).contains(&min_conditional_probability) {
        return Err(PreconditionError::InvalidConditionalProbability(
            min_conditional_probability,
        ));
    }

    let mut tables: HashMap<&FeatureSet, &TableInstances> = HashMap::new();
    for pattern in patterns {
        match &pattern.table_instances {
            Some(table) => {
                tables.insert(&pattern.features, table);
            }
            None => {
                return Err(PreconditionError::MissingTableInstances {
                    pattern: store.describe(&pattern.features),
                })
            }
        }
    }

    let mut rules = Vec::new();
    let mut projected: HashSet<SmallVec<[InstanceIdx; 4]>> = HashSet::new();
    for pattern in patterns {
        let table = tables[&pattern.features];
        let mut antecedents: Vec<_> = pattern.features.proper_subsets().collect();
        antecedents.sort();

        for (antecedent, columns) in antecedents {
            let denominator = if antecedent.len() == 1 {
                store.feature_len(antecedent.as_slice()[0])
            } else {
                match tables.get(&antecedent) {
                    Some(table) => table.len(),
                    // Only possible if the caller filtered the miner's output.
                    None => continue,
                }
            };
            if denominator == 0 {
                continue;
            }

            projected.clear();
            projected.extend(
                table
                    .rows()
                    .map(|row| columns.iter().map(|&c| row[c]).collect()),
            );

            let conditional_probability = projected.len() as f64 / denominator as f64;
            if conditional_probability >= min_conditional_probability {
                rules.push(ColocationRule {
                    consequent: pattern.features.difference(&antecedent),
                    antecedent,
                    conditional_probability,
                    participation_index: pattern.participation_index,
                });
            }
        }
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dataset, Miner};

    fn dataset() -> Dataset {
        // a1, b1, c1 are mutually close; a2 and b2 are close to each other only.
        let mut builder = InstanceStore::builder();
        builder
            .add("A", 1, 0.0, 0.0, 0)
            .add("B", 1, 1.0, 0.0, 0)
            .add("C", 1, 0.0, 1.0, 0)
            .add("A", 2, 100.0, 0.0, 0)
            .add("B", 2, 101.0, 0.0, 0);
        Dataset::build(builder.build().unwrap(), 1.5).unwrap()
    }

    fn find<'r>(
        store: &InstanceStore,
        rules: &'r [ColocationRule],
        antecedent: &[&str],
        consequent: &[&str],
    ) -> Option<&'r ColocationRule> {
        let antecedent = store.feature_set(antecedent)?;
        let consequent = store.feature_set(consequent)?;
        rules
            .iter()
            .find(|r| r.antecedent == antecedent && r.consequent == consequent)
    }

    #[test]
    fn conditional_probabilities() {
        let dataset = dataset();
        let store = dataset.instances();
        let patterns = Miner::new(&dataset, 0.5)
            .unwrap()
            .retain_table_instances(true)
            .run();
        let rules = derive(store, &patterns, 0.0).unwrap();

        // Both A instances have a B neighbor, but only one of the two A-B pairs has a C.
        assert_eq!(find(store, &rules, &["A"], &["B"]).unwrap().conditional_probability, 1.0);
        assert_eq!(
            find(store, &rules, &["A", "B"], &["C"]).unwrap().conditional_probability,
            0.5
        );
        assert_eq!(find(store, &rules, &["C"], &["A", "B"]).unwrap().conditional_probability, 1.0);
        assert_eq!(find(store, &rules, &["A"], &["B", "C"]).unwrap().conditional_probability, 0.5);

        let strict = derive(store, &patterns, 0.75).unwrap();
        assert!(strict.iter().all(|r| r.conditional_probability >= 0.75));
        assert!(find(store, &strict, &["A", "B"], &["C"]).is_none());
    }

    #[test]
    fn needs_table_instances() {
        let dataset = dataset();
        let patterns = Miner::new(&dataset, 0.5).unwrap().run();
        assert!(matches!(
            derive(dataset.instances(), &patterns, 0.5),
            Err(PreconditionError::MissingTableInstances { .. })
        ));
    }

    #[test]
    fn rejects_bad_threshold() {
        let dataset = dataset();
        assert_eq!(
            derive(dataset.instances(), &[], 1.5),
            Err(PreconditionError::InvalidConditionalProbability(1.5))
        );
    }
}
