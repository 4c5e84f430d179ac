//! How a pattern's prevalence compares with what spatial randomness would produce.
//!
//! Under complete spatial randomness, each feature's instances are an independent Poisson
//! process over the study area. If feature `g` has intensity `λ_g` (instances per unit area),
//! the chance that a disk of radius `d` around some point holds at least one instance of `g` is
//! `1 - exp(-λ_g π d²)`. Requiring a neighbor of every other feature in the pattern multiplies
//! those chances together, which gives the expected participation ratio of each feature.
//!
//! That expectation ignores the requirement that the other features' instances also be close to
//! each other, so it overestimates the participation a random arrangement would achieve. The
//! resulting lift and p-values are therefore on the conservative side.
//!
//! The study area is taken to be the bounding box of all instances.

use crate::dataset::Dataset;
use crate::mining::ColocationPattern;
use statrs::distribution::{ChiSquared, Univariate};
use std::f64::consts::PI;

/// Comparison of one pattern against spatial randomness.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Significance {
    /// The participation index a random arrangement would be expected to have.
    pub expected_index: f64,
    /// Observed participation index divided by `expected_index`. Values above 1 mean the
    /// features are found together more often than chance would suggest.
    pub lift: f64,
    /// Probability of seeing participation at least this high by chance, for the feature where
    /// that's most likely. Small values mean the pattern is unlikely to be an accident.
    pub p_value: f64,
}

/// Precomputed per-feature intensities for one dataset.
#[derive(Clone, Debug)]
pub struct ChanceModel {
    // Chance that a neighborhood disk holds at least one instance of each feature.
    coverage: Vec<f64>,
    counts: Vec<usize>,
    chi2: ChiSquared,
}

impl ChanceModel {
    /// Builds the model, or returns `None` if the instances don't span a region with positive
    /// area (in which case density isn't meaningful).
    pub fn new(dataset: &Dataset) -> Option<Self> {
        let store = dataset.instances();
        let (min_x, min_y, max_x, max_y) = store.bounding_box()?;
        let area = (max_x - min_x) * (max_y - min_y);
        if !(area > 0.0 && area.is_finite()) {
            return None;
        }

        let disk = PI * dataset.threshold() * dataset.threshold();
        let counts: Vec<usize> = store.features().map(|f| store.feature_len(f)).collect();
        let coverage = counts
            .iter()
            .map(|&n| 1.0 - (-(n as f64 / area) * disk).exp())
            .collect();

        Some(ChanceModel {
            coverage,
            counts,
            chi2: ChiSquared::new(1.0).ok()?,
        })
    }

    /// Expected participation ratio of each feature of `pattern`, in the pattern's order.
    pub fn expected_ratios(&self, pattern: &ColocationPattern) -> Vec<f64> {
        let features = pattern.features.as_slice();
        features
            .iter()
            .map(|f| {
                features
                    .iter()
                    .filter(|g| *g != f)
                    .map(|g| self.coverage[g.index()])
                    .product()
            })
            .collect()
    }

    /// Compares a mined pattern against spatial randomness.
    ///
    /// For each feature, the number of participating instances is compared with its
    /// expectation using a one-degree-of-freedom chi-squared test, counted only when
    /// participation is higher than expected. The pattern's p-value is the largest across its
    /// features, since the pattern is only as surprising as its least surprising feature.
    pub fn assess(&self, pattern: &ColocationPattern) -> Significance {
        let expected = self.expected_ratios(pattern);
        let expected_index = expected.iter().copied().fold(1.0, f64::min);
        let lift = if expected_index > 0.0 {
            pattern.participation_index / expected_index
        } else {
            f64::INFINITY
        };

        let p_value = pattern
            .features
            .iter()
            .zip(pattern.participation_ratios.iter())
            .zip(expected.iter())
            .map(|((feature, &observed_ratio), &p)| {
                let n = self.counts[feature.index()] as f64;
                let observed = observed_ratio * n;
                let wanted = n * p;
                if observed <= wanted {
                    1.0
                } else if p <= 0.0 {
                    0.0
                } else if p >= 1.0 {
                    1.0
                } else {
                    let statistic = (observed - wanted).powi(2) / (wanted * (1.0 - p));
                    1.0 - self.chi2.cdf(statistic)
                }
            })
            .fold(0.0, f64::max);

        Significance {
            expected_index,
            lift,
            p_value,
        }
    }
}
