use colocation::cache::{load_or_build, Origin, Paths};
use colocation::error::{CacheError, PreconditionError};
use colocation::mine;
use std::fs;
use std::path::Path;

const RECORDS: &str = "\
Feature,Instance,LocX,LocY,Checkin
A,1,0,0,4
A,2,100,0,0
B,1,1,0,2
B,2,0,100,0
C,1,0.5,0.5,9
";

fn paths(dir: &Path) -> Paths {
    let dataset = dir.join("instances.csv");
    fs::write(&dataset, RECORDS).unwrap();
    Paths {
        dataset,
        delimiter: b',',
        snapshot: dir.join("cache").join("instances.json"),
    }
}

#[test]
fn second_load_uses_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());

    let first = load_or_build(&paths, 1.5, false).unwrap();
    assert_eq!(first.origin, Origin::Missing);
    assert!(paths.snapshot.exists());

    let second = load_or_build(&paths, 1.5, false).unwrap();
    assert_eq!(second.origin, Origin::Snapshot);
    assert_eq!(second.dataset.relation(), first.dataset.relation());
    assert_eq!(
        mine(&second.dataset, 0.5).unwrap(),
        mine(&first.dataset, 0.5).unwrap()
    );
}

#[test]
fn threshold_mismatch_rebuilds_everything() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());

    let wide = load_or_build(&paths, 1.5, false).unwrap();
    assert_eq!(wide.dataset.relation().len(), 3);

    let narrow = load_or_build(&paths, 0.8, false).unwrap();
    assert_eq!(narrow.origin, Origin::ThresholdMismatch(1.5));
    assert_eq!(narrow.dataset.threshold(), 0.8);
    // Only the two pairs involving c1 are within 0.8.
    assert_eq!(narrow.dataset.relation().len(), 2);
    assert_eq!(narrow.dataset.stars().edge_count(), 2);

    // The snapshot was replaced, so the narrow threshold now loads directly.
    let again = load_or_build(&paths, 0.8, false).unwrap();
    assert_eq!(again.origin, Origin::Snapshot);
    assert_eq!(again.dataset.relation(), narrow.dataset.relation());
}

#[test]
fn forced_rebuild_ignores_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    load_or_build(&paths, 1.5, false).unwrap();

    // Source changes aren't noticed unless a rebuild is forced.
    fs::write(&paths.dataset, RECORDS.replace("C,1,0.5,0.5,9\n", "")).unwrap();
    let stale = load_or_build(&paths, 1.5, false).unwrap();
    assert_eq!(stale.dataset.instances().len(), 5);

    let fresh = load_or_build(&paths, 1.5, true).unwrap();
    assert_eq!(fresh.origin, Origin::Forced);
    assert_eq!(fresh.dataset.instances().len(), 4);
}

#[test]
fn corrupt_snapshot_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    load_or_build(&paths, 1.5, false).unwrap();

    fs::write(&paths.snapshot, "{\"version\": 1, \"thresh").unwrap();
    let loaded = load_or_build(&paths, 1.5, false).unwrap();
    assert_eq!(loaded.origin, Origin::Unusable);
    assert_eq!(loaded.dataset.relation().len(), 3);

    let again = load_or_build(&paths, 1.5, false).unwrap();
    assert_eq!(again.origin, Origin::Snapshot);
}

#[test]
fn invalid_threshold_is_rejected_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths {
        dataset: dir.path().join("absent.csv"),
        delimiter: b',',
        snapshot: dir.path().join("absent.json"),
    };
    assert!(matches!(
        load_or_build(&paths, f64::NAN, false),
        Err(CacheError::Precondition(PreconditionError::InvalidThreshold(_)))
    ));
    assert!(!paths.snapshot.exists());
}

#[test]
fn bad_source_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    fs::write(&paths.dataset, "Feature,Instance\nA,1\n").unwrap();

    match load_or_build(&paths, 1.0, false) {
        Err(CacheError::Data { path, .. }) => assert_eq!(path, paths.dataset),
        other => panic!("unexpected {:?}", other.map(|loaded| loaded.origin)),
    }
    assert!(!paths.snapshot.exists());
}
