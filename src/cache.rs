//! Reusing a built [`Dataset`] across runs.
//!
//! This is the only part of the crate that touches the filesystem on its own. It keeps one JSON
//! [`Snapshot`] per dataset file and hands it back as long as it was built with the threshold
//! being asked for. Anything else (a different threshold, a missing or unreadable snapshot, or
//! an explicit request) rebuilds from the source records and replaces the snapshot.

use crate::dataset::Dataset;
use crate::error::{CacheError, PreconditionError};
use crate::load::read_instances_from_path;
use crate::snapshot::Snapshot;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the dataset came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Origin {
    /// Restored from the snapshot.
    Snapshot,
    /// Rebuilt because the caller asked for it.
    Forced,
    /// Rebuilt because there was no snapshot.
    Missing,
    /// Rebuilt because the snapshot used a different threshold, given here.
    ThresholdMismatch(f64),
    /// Rebuilt because the snapshot couldn't be read or failed validation.
    Unusable,
}

/// A dataset plus how it was obtained.
#[derive(Debug)]
pub struct Loaded {
    /// The dataset, built for exactly the requested threshold.
    pub dataset: Dataset,
    /// Whether it came from the snapshot, and if not, why.
    pub origin: Origin,
}

/// Where to find the source records and the snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Paths {
    /// Delimited text file of instance records.
    pub dataset: PathBuf,
    /// Field separator in `dataset`.
    pub delimiter: u8,
    /// The snapshot file. Its directory is created if needed.
    pub snapshot: PathBuf,
}

/// Returns a dataset for `threshold`, from the snapshot if it matches and otherwise by
/// rebuilding from the source records and saving a fresh snapshot.
///
/// The threshold is checked before anything is read. A snapshot is only used when its stored
/// threshold is exactly equal to the requested one, and then only after it passes every
/// consistency check in [`Dataset::from_snapshot`].
pub fn load_or_build(
    paths: &Paths,
    threshold: f64,
    force_rebuild: bool,
) -> Result<Loaded, CacheError> {
    if !(threshold >= 0.0 && threshold.is_finite()) {
        return Err(PreconditionError::InvalidThreshold(threshold).into());
    }

    let origin = if force_rebuild {
        info!(path = %paths.snapshot.display(), "rebuild requested, ignoring snapshot");
        Origin::Forced
    } else {
        match restore(&paths.snapshot, threshold) {
            Ok(dataset) => {
                info!(
                    path = %paths.snapshot.display(),
                    instances = dataset.instances().len(),
                    stars = dataset.stars().len(),
                    "loaded dataset from snapshot"
                );
                return Ok(Loaded {
                    dataset,
                    origin: Origin::Snapshot,
                });
            }
            Err(origin) => origin,
        }
    };

    info!(path = %paths.dataset.display(), threshold, "building dataset from source records");
    let store =
        read_instances_from_path(&paths.dataset, paths.delimiter).map_err(|source| {
            CacheError::Data {
                path: paths.dataset.clone(),
                source,
            }
        })?;
    let dataset = Dataset::build(store, threshold)?;
    save(&paths.snapshot, &dataset.snapshot())?;
    info!(path = %paths.snapshot.display(), "saved dataset snapshot");

    Ok(Loaded { dataset, origin })
}

/// Reads the snapshot, giving the reason to rebuild instead if it can't be used.
fn restore(path: &Path, threshold: f64) -> Result<Dataset, Origin> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no snapshot found");
            return Err(Origin::Missing);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "can't open snapshot");
            return Err(Origin::Unusable);
        }
    };

    let snapshot = Snapshot::read(BufReader::new(file)).map_err(|e| {
        warn!(path = %path.display(), error = %e, "can't parse snapshot");
        Origin::Unusable
    })?;

    if snapshot.threshold() != threshold {
        info!(
            cached = snapshot.threshold(),
            requested = threshold,
            "snapshot threshold mismatch"
        );
        return Err(Origin::ThresholdMismatch(snapshot.threshold()));
    }

    Dataset::from_snapshot(snapshot).map_err(|e| {
        warn!(path = %path.display(), error = %e, "snapshot failed validation");
        Origin::Unusable
    })
}

/// Writes the snapshot next to its final location and then renames it into place, so a reader
/// never sees a half-written file.
fn save(path: &Path, snapshot: &Snapshot) -> Result<(), CacheError> {
    let io_error = |source: io::Error| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_error)?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    let mut writer = BufWriter::new(File::create(&staging).map_err(io_error)?);
    snapshot.write(&mut writer).map_err(|source| CacheError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_error)?;
    drop(writer);

    fs::rename(&staging, path).map_err(io_error)
}
