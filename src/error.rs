//! Error types for every fallible operation in this crate.
//!
//! The mining core itself can only fail on [`PreconditionError`]s: everything else here belongs
//! to the boundary that gets data into a [`Dataset`][crate::Dataset] and back out again.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Problems found while admitting instance records. Any one of these rejects the whole input, so
/// no partially-loaded dataset is ever produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataError {
    /// The header row doesn't name one of the required columns.
    #[error("missing required column '{column}' (accepted names: {accepted})")]
    MissingColumn {
        /// The column's canonical name.
        column: &'static str,
        /// Every header spelling that would have been accepted.
        accepted: String,
    },

    /// The input had no header row at all.
    #[error("input is empty; expected a header row")]
    MissingHeader,

    /// A record has a different number of fields than the header.
    #[error("line {line}: expected {expected} fields but found {found}")]
    FieldCount {
        /// 1-based line number, counting the header as line 1.
        line: u64,
        /// Number of fields in the header.
        expected: usize,
        /// Number of fields in this record.
        found: usize,
    },

    /// A field couldn't be parsed as the type its column requires.
    #[error("line {line}: column '{column}' has malformed value {value:?}")]
    Malformed {
        /// 1-based line number, counting the header as line 1.
        line: u64,
        /// The column's canonical name.
        column: &'static str,
        /// The offending text.
        value: String,
    },

    /// A coordinate parsed as NaN or infinity.
    #[error("line {line}: coordinate '{column}' is not finite")]
    NonFinite {
        /// 1-based line number, counting the header as line 1.
        line: u64,
        /// The column's canonical name.
        column: &'static str,
    },

    /// A record handed to the store builder had a coordinate that isn't finite.
    #[error("instance {id} of feature '{feature}' has a coordinate that is not finite")]
    NonFiniteCoordinate {
        /// The feature label.
        feature: String,
        /// The instance id.
        id: i64,
    },

    /// The same feature label and instance id appeared twice.
    #[error("instance {id} of feature '{feature}' appears more than once")]
    DuplicateInstance {
        /// The feature label.
        feature: String,
        /// The repeated instance id.
        id: i64,
    },

    /// A field was longer than the reader's field buffer.
    #[error("line {line}: field too long")]
    FieldTooLong {
        /// 1-based line number, counting the header as line 1.
        line: u64,
    },

    /// A field wasn't valid UTF-8.
    #[error("line {line}: field is not valid UTF-8")]
    Utf8 {
        /// 1-based line number, counting the header as line 1.
        line: u64,
    },

    /// Instances are addressed with 32-bit indexes.
    #[error("too many instances: {count} exceeds the supported maximum")]
    TooManyInstances {
        /// How many records were offered.
        count: usize,
    },

    /// Reading the underlying input failed.
    #[error("failed to read instance records: {0}")]
    Io(#[from] io::Error),
}

/// Invalid arguments, rejected before any computation starts.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum PreconditionError {
    /// Distance thresholds must be finite and non-negative.
    #[error("distance threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),

    /// Minimum prevalence must lie in `[0, 1]`.
    #[error("minimum prevalence must be within [0, 1], got {0}")]
    InvalidPrevalence(f64),

    /// Minimum conditional probability must lie in `[0, 1]`.
    #[error("minimum conditional probability must be within [0, 1], got {0}")]
    InvalidConditionalProbability(f64),

    /// Rule derivation needs the table instances of every pattern, which are only kept when
    /// mining with [`Miner::retain_table_instances`][crate::Miner::retain_table_instances].
    #[error("pattern {pattern} has no table instances; mine with table instances retained")]
    MissingTableInstances {
        /// Labels of the offending pattern.
        pattern: String,
    },
}

/// A snapshot that can't be turned back into a [`Dataset`][crate::Dataset].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// The snapshot was written by an incompatible version of this crate.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    Version {
        /// Version recorded in the snapshot.
        found: u32,
        /// Version this crate writes.
        expected: u32,
    },

    /// The stored instances don't form a valid instance store.
    #[error("snapshot instances are invalid: {0}")]
    Instances(#[from] DataError),

    /// The stored threshold is invalid.
    #[error("snapshot threshold is invalid: {0}")]
    Threshold(#[from] PreconditionError),

    /// The stored relation or star index disagrees with the rest of the snapshot.
    #[error("snapshot is inconsistent: {0}")]
    Inconsistent(String),
}

/// Failures at the load-or-build boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// Reading or writing a file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The source records were rejected.
    #[error("failed to load '{path}': {source}")]
    Data {
        /// The source file.
        path: PathBuf,
        /// The underlying error.
        source: DataError,
    },

    /// A fresh snapshot couldn't be encoded.
    #[error("failed to encode snapshot for '{path}': {source}")]
    Encode {
        /// The cache file.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// The requested threshold was rejected.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

/// Failures while reading the configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file exists but couldn't be read.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The file isn't valid TOML for [`Config`][crate::config::Config].
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        source: toml::de::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for '{key}': {reason}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
