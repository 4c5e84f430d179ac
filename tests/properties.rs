use colocation::{mine, participation_index, Dataset, FeatureSet, InstanceStore};
use proptest::prelude::*;
use std::collections::BTreeSet;

const LABELS: [&str; 4] = ["A", "B", "C", "D"];

fn points() -> impl Strategy<Value = Vec<(usize, f64, f64)>> {
    // Coarse coordinates make exact-distance ties common.
    let coordinate = prop_oneof![(-20i32..20).prop_map(|c| c as f64 * 0.5), -10.0..10.0f64];
    prop::collection::vec((0..LABELS.len(), coordinate.clone(), coordinate), 0..60)
}

fn dataset(points: &[(usize, f64, f64)], threshold: f64) -> Dataset {
    let mut builder = InstanceStore::builder();
    for (id, &(label, x, y)) in points.iter().enumerate() {
        builder.add(LABELS[label], id as i64, x, y, 0);
    }
    Dataset::build(builder.build().unwrap(), threshold).unwrap()
}

proptest! {
    #[test]
    fn relation_matches_brute_force(points in points(), threshold in prop_oneof![Just(0.0), 0.0..6.0f64]) {
        let dataset = dataset(&points, threshold);
        let instances = dataset.instances().instances();

        let mut expected = Vec::new();
        for i in 0..instances.len() {
            for j in i + 1..instances.len() {
                if instances[i].distance(&instances[j]) <= threshold {
                    expected.push((i as u32, j as u32));
                }
            }
        }
        prop_assert_eq!(dataset.relation().edges(), &expected[..]);

        for &(i, j) in &expected {
            prop_assert!(dataset.are_neighbors(i, j));
            prop_assert!(dataset.are_neighbors(j, i));
        }
    }

    #[test]
    fn every_edge_is_in_exactly_one_star(points in points(), threshold in 0.0..6.0f64) {
        let dataset = dataset(&points, threshold);
        let stars = dataset.stars();
        prop_assert_eq!(stars.edge_count(), dataset.relation().len());

        for &(i, j) in dataset.relation().edges() {
            prop_assert!(stars.contains(i, j));
            prop_assert!(!stars.contains(j, i));
        }
        for (center, star) in stars.iter() {
            prop_assert!(star.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(star.iter().all(|&other| other > center));
        }
    }

    #[test]
    fn patterns_are_closed_under_subsets(
        points in points(),
        threshold in 0.5..4.0f64,
        min_prevalence in 0.0..=1.0f64,
    ) {
        let dataset = dataset(&points, threshold);
        let patterns = mine(&dataset, min_prevalence).unwrap();
        let reported: BTreeSet<_> = patterns.iter().map(|p| p.features.clone()).collect();

        for pattern in &patterns {
            prop_assert!(pattern.size() >= 2);
            prop_assert!(pattern.participation_index >= min_prevalence);
            prop_assert!(pattern.participation_index <= 1.0);
            prop_assert_eq!(
                pattern.participation_index,
                participation_index(&pattern.participation_ratios)
            );

            if pattern.size() > 2 {
                let features = pattern.features.as_slice();
                for skip in 0..features.len() {
                    let subset: FeatureSet = features
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| i != skip)
                        .map(|(_, &f)| f)
                        .collect();
                    prop_assert!(reported.contains(&subset));
                }
            }
        }
    }

    #[test]
    fn snapshot_restores_the_same_dataset(points in points(), threshold in 0.0..6.0f64) {
        let original = dataset(&points, threshold);
        let restored = Dataset::from_snapshot(original.snapshot()).unwrap();
        prop_assert_eq!(restored.relation(), original.relation());
        prop_assert_eq!(restored.stars(), original.stars());
        prop_assert_eq!(restored.instances().instances(), original.instances().instances());
    }
}
