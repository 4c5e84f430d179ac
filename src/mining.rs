use crate::candidate;
use crate::clique::{table_instances, TableInstances};
use crate::dataset::Dataset;
use crate::error::PreconditionError;
use crate::prevalence::{participation_index, participation_ratios};
use crate::FeatureSet;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// A prevalent co-location pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct ColocationPattern {
    /// The features in the pattern, at least two.
    pub features: FeatureSet,
    /// Participation ratio of each feature, in the same order as `features`.
    pub participation_ratios: SmallVec<[f64; 4]>,
    /// The smallest participation ratio.
    pub participation_index: f64,
    /// The pattern's table instances, if the miner was asked to keep them.
    pub table_instances: Option<TableInstances>,
}

impl ColocationPattern {
    /// The number of features in the pattern.
    pub fn size(&self) -> usize {
        self.features.len()
    }

    /// The number of table instances found for this pattern, if they were kept.
    pub fn row_count(&self) -> Option<usize> {
        self.table_instances.as_ref().map(TableInstances::len)
    }
}

/// All the prevalent patterns of one size.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    /// The number of features in every pattern of this level.
    pub size: usize,
    /// How many candidates were evaluated to find these patterns.
    pub candidates: usize,
    /// The prevalent patterns, in canonical order.
    pub patterns: Vec<ColocationPattern>,
}

/// Mines every prevalent co-location pattern of `dataset`.
///
/// Patterns come out ordered by size and then by their features' labels. An empty dataset, or
/// one where nothing is prevalent, gives an empty list.
///
/// Fails if `min_prevalence` isn't within `[0, 1]`.
pub fn mine(
    dataset: &Dataset,
    min_prevalence: f64,
) -> Result<Vec<ColocationPattern>, PreconditionError> {
    Ok(Miner::new(dataset, min_prevalence)?.run())
}

/// A configured mining run over one dataset.
#[derive(Clone, Debug)]
pub struct Miner<'a> {
    dataset: &'a Dataset,
    min_prevalence: f64,
    retain_table_instances: bool,
}

impl<'a> Miner<'a> {
    /// Prepares to mine `dataset` for patterns with participation index of at least
    /// `min_prevalence`.
    pub fn new(dataset: &'a Dataset, min_prevalence: f64) -> Result<Self, PreconditionError> {
        if !(0.0..=1.0).contains(&min_prevalence) {
            return Err(PreconditionError::InvalidPrevalence(min_prevalence));
        }
        Ok(Miner {
            dataset,
            min_prevalence,
            retain_table_instances: false,
        })
    }

    /// Whether to keep each pattern's table instances. They're needed for
    /// [`rules::derive`][crate::rules::derive] but can take a lot of memory, so by default
    /// they're dropped as soon as the participation index is known.
    pub fn retain_table_instances(mut self, retain: bool) -> Self {
        self.retain_table_instances = retain;
        self
    }

    /// Runs every level and returns all prevalent patterns.
    pub fn run(&self) -> Vec<ColocationPattern> {
        self.levels().flat_map(|level| level.patterns).collect()
    }

    /// Like [`run`][Self::run], but checks `cancel` before starting each level and stops early
    /// if it's set. The patterns from completed levels are returned either way; since every
    /// level is finished before it's reported, they're exactly the prevalent patterns up to the
    /// last size reached.
    pub fn run_until(&self, cancel: &AtomicBool) -> Vec<ColocationPattern> {
        self.run_while(|| !cancel.load(Ordering::Relaxed))
    }

    /// Like [`run_until`][Self::run_until], but asks `keep_going` before each level instead of
    /// reading a flag.
    pub fn run_while(&self, mut keep_going: impl FnMut() -> bool) -> Vec<ColocationPattern> {
        let mut patterns = Vec::new();
        let mut levels = self.levels();
        while keep_going() {
            match levels.next() {
                Some(level) => patterns.extend(level.patterns),
                None => return patterns,
            }
        }
        info!(found = patterns.len(), "mining cancelled");
        patterns
    }

    /// An iterator producing the prevalent patterns one size at a time, starting with pairs.
    ///
    /// Each level is computed only when it's asked for, so dropping the iterator stops the
    /// search between levels.
    pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
        let mut candidates = candidate::seed(self.dataset);
        let mut size = 2;
        iter::from_fn(move || {
            if candidates.is_empty() {
                return None;
            }

            let evaluated = candidates.len();
            let patterns = self.evaluate(&candidates);
            info!(
                size,
                candidates = evaluated,
                prevalent = patterns.len(),
                "mined level"
            );

            if patterns.is_empty() {
                candidates.clear();
                return None;
            }

            let prevalent: Vec<FeatureSet> =
                patterns.iter().map(|p| p.features.clone()).collect();
            candidates = candidate::extend(&prevalent);

            let level = Level {
                size,
                candidates: evaluated,
                patterns,
            };
            size += 1;
            Some(level)
        })
    }

    /// Computes table instances and prevalence for every candidate of one level.
    ///
    /// Candidates are independent of each other and the dataset is read-only, so they're
    /// evaluated in parallel. Collecting preserves the canonical order of `candidates`.
    fn evaluate(&self, candidates: &[FeatureSet]) -> Vec<ColocationPattern> {
        let store = self.dataset.instances();
        candidates
            .par_iter()
            .filter_map(|candidate| {
                // An empty table gives every ratio zero, which only a zero minimum prevalence admits.
                let table = table_instances(self.dataset, candidate);
                let ratios = participation_ratios(store, &table);
                let index = participation_index(&ratios);
                debug!(
                    pattern = %store.describe(candidate),
                    rows = table.len(),
                    participation_index = index,
                );
                if index < self.min_prevalence {
                    return None;
                }

                Some(ColocationPattern {
                    features: candidate.clone(),
                    participation_ratios: ratios,
                    participation_index: index,
                    table_instances: if self.retain_table_instances {
                        Some(table)
                    } else {
                        None
                    },
                })
            })
            .collect()
    }
}
