//! Settings for the `colocation` binary, read from a TOML file.
//!
//! ```toml
//! dataset_path = "data/venues.csv"
//! cache_path = "data/venues.snapshot.json"
//! neighbor_distance = 160.0
//! min_prevalence = 0.5
//! ```
//!
//! Every key is optional.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Configuration for one mining run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Delimited text file holding the instance records.
    pub dataset_path: PathBuf,
    /// Where to keep the dataset snapshot between runs.
    pub cache_path: PathBuf,
    /// Distance threshold for two instances to be neighbors. Default: 10.0.
    pub neighbor_distance: f64,
    /// Minimum participation index for a pattern to be reported. Default: 0.3.
    pub min_prevalence: f64,
    /// Minimum conditional probability for a rule to be reported. Default: 0.5.
    pub min_conditional_probability: f64,
    /// Field separator in the dataset file; must be a single ASCII character. Default: `,`.
    pub delimiter: char,
    /// Rebuild the snapshot even if a usable one exists.
    pub force_rebuild: bool,
    /// Log at debug level unless `RUST_LOG` says otherwise.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset_path: PathBuf::from("data/instances.csv"),
            cache_path: PathBuf::from("data/instances.snapshot.json"),
            neighbor_distance: 10.0,
            min_prevalence: 0.3,
            min_conditional_probability: 0.5,
            delimiter: ',',
            force_rebuild: false,
            debug: false,
        }
    }
}

impl Config {
    /// Reads and validates the configuration at `path`. A missing file isn't an error: the
    /// defaults are used and a warning is logged.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.neighbor_distance >= 0.0 && self.neighbor_distance.is_finite()) {
            return Err(invalid(
                "neighbor_distance",
                format!("must be finite and non-negative, got {}", self.neighbor_distance),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_prevalence) {
            return Err(invalid(
                "min_prevalence",
                format!("must be within [0, 1], got {}", self.min_prevalence),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_conditional_probability) {
            return Err(invalid(
                "min_conditional_probability",
                format!("must be within [0, 1], got {}", self.min_conditional_probability),
            ));
        }
        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(invalid(
                "delimiter",
                format!("{:?} can't separate fields", self.delimiter),
            ));
        }
        Ok(())
    }

    /// The delimiter as the byte the CSV reader wants.
    pub fn delimiter_byte(&self) -> u8 {
        // `validate` only admits ASCII, which always fits.
        self.delimiter as u8
    }
}

fn invalid(key: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { key, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.neighbor_distance, 10.0);
        assert_eq!(config.min_prevalence, 0.3);
        assert_eq!(config.min_conditional_probability, 0.5);
        assert_eq!(config.delimiter_byte(), b',');
        assert!(!config.debug);
    }

    #[test]
    fn partial_override() {
        let config: Config = toml::from_str(
            r#"
            dataset_path = "venues.tsv"
            neighbor_distance = 160
            delimiter = "\t"
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("venues.tsv"));
        assert_eq!(config.neighbor_distance, 160.0);
        assert_eq!(config.delimiter_byte(), b'\t');
        assert_eq!(config.min_prevalence, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("minPrev = 0.4").is_err());
    }

    #[test]
    fn out_of_range_values() {
        let config = Config {
            min_prevalence: 1.5,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "min_prevalence",
                ..
            })
        ));

        let config = Config {
            neighbor_distance: -1.0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "neighbor_distance",
                ..
            })
        ));

        let config = Config {
            delimiter: 'é',
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colocation.toml");
        fs::write(&path, "min_prevalence = \"high\"").unwrap();
        match Config::load(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected {:?}", other),
        }
    }
}
