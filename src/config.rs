use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use fnv::FnvHashMap;

use crate::error::{Error, Result};

pub const NUM_FACTORS: &str = "rec.factor.number";
pub const NUM_ITERATIONS: &str = "rec.iterator.maximum";
pub const LEARN_RATE: &str = "rec.iterator.learnrate";
pub const MAX_LEARN_RATE: &str = "rec.iterator.learnrate.maximum";
pub const BOLD_DRIVER: &str = "rec.learnrate.bolddriver";
pub const DECAY: &str = "rec.learnrate.decay";
pub const REG_USER: &str = "rec.user.regularization";
pub const REG_ITEM: &str = "rec.item.regularization";
pub const REG_RATE_SOCIAL: &str = "rec.rate.social.regularization";
pub const REG_USER_SOCIAL: &str = "rec.user.social.regularization";
pub const REG_PHOTO: &str = "rec.photo.svpoi.regularization";
pub const REG_ITEM_PHOTO: &str = "rec.itemPhoto.svpoi.regularization";
pub const EARLY_STOP: &str = "rec.recommender.earlystop";
pub const CONVERGENCE_THRESHOLD: &str = "rec.convergence.threshold";
pub const RANDOM_SEED: &str = "rec.random.seed";
pub const INIT_RANGE: &str = "rec.init.range";
pub const FEATURE_DIMENSION: &str = "rec.photo.feature.dimension";
pub const DATA_DIR: &str = "dfs.data.dir";
pub const PHOTO_PATH: &str = "data.appender.photo.path";

/// Dimensionality of the photo feature vectors, unless configured otherwise.
pub const DEFAULT_FEATURE_DIMENSION: usize = 1000;

/// Flat string key/value options, as found in `.properties` files.
#[derive(Clone, Debug, Default)]
pub struct Properties {
    entries: FnvHashMap<String, String>,
}

impl Properties {

    pub fn new() -> Self {
        Properties::default()
    }

    /// Loads `key=value` (or `key: value`) lines, skipping blank lines and lines starting with
    /// `#` or `!`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut properties = Properties::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            properties.set_pair(line)?;
        }

        Ok(properties)
    }

    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.entries.insert(key.trim().to_string(), value.trim().to_string());
        self
    }

    /// Sets an option from a single `key=value` string.
    pub fn set_pair(&mut self, pair: &str) -> Result<&mut Self> {
        match pair.find(|c: char| c == '=' || c == ':') {
            Some(position) => Ok(self.set(&pair[..position], &pair[position + 1..])),
            None => Err(Error::Configuration(format!("Expected key=value, found '{}'", pair))),
        }
    }

    /// Returns the value for a key, blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key)
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Some(_) => self.require(key),
            None => Ok(default),
        }
    }

    pub fn require<T: FromStr>(&self, key: &str) -> Result<T> {
        let value = self.get(key)
            .ok_or_else(|| Error::Configuration(format!("Missing required option '{}'", key)))?;

        value.parse::<T>()
            .map_err(|_| Error::Configuration(format!("Invalid value '{}' for '{}'", value, key)))
    }
}

/// Immutable training options, validated once on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainerConfig {
    pub num_factors: usize,
    pub num_iterations: usize,
    pub learn_rate: f64,
    /// Upper bound for the adapted learning rate, `None` if unbounded.
    pub max_learn_rate: Option<f64>,
    pub bold_driver: bool,
    pub decay: f64,
    pub reg_user: f64,
    pub reg_item: f64,
    pub reg_rate_social: f64,
    pub reg_user_social: f64,
    pub reg_photo: f64,
    pub reg_item_photo: f64,
    pub early_stop: bool,
    pub convergence_threshold: f64,
    pub seed: u64,
    pub init_range: f64,
    pub feature_dimension: usize,
}

impl TrainerConfig {

    pub fn from_properties(properties: &Properties) -> Result<Self> {

        let max_learn_rate: f64 = properties.get_or(MAX_LEARN_RATE, -1.0)?;

        let config = TrainerConfig {
            num_factors: properties.get_or(NUM_FACTORS, 10)?,
            num_iterations: properties.get_or(NUM_ITERATIONS, 100)?,
            learn_rate: properties.get_or(LEARN_RATE, 0.01)?,
            max_learn_rate: if max_learn_rate > 0.0 { Some(max_learn_rate) } else { None },
            bold_driver: properties.get_or(BOLD_DRIVER, false)?,
            decay: properties.get_or(DECAY, 1.0)?,
            reg_user: properties.require(REG_USER)?,
            reg_item: properties.require(REG_ITEM)?,
            reg_rate_social: properties.require(REG_RATE_SOCIAL)?,
            reg_user_social: properties.require(REG_USER_SOCIAL)?,
            reg_photo: properties.require(REG_PHOTO)?,
            reg_item_photo: properties.require(REG_ITEM_PHOTO)?,
            early_stop: properties.get_or(EARLY_STOP, false)?,
            convergence_threshold: properties.get_or(CONVERGENCE_THRESHOLD, 1e-5)?,
            seed: properties.get_or(RANDOM_SEED, 1)?,
            init_range: properties.get_or(INIT_RANGE, 1.0)?,
            feature_dimension: properties.get_or(FEATURE_DIMENSION, DEFAULT_FEATURE_DIMENSION)?,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.num_factors == 0 {
            return invalid(NUM_FACTORS, "must be positive");
        }
        if self.feature_dimension == 0 {
            return invalid(FEATURE_DIMENSION, "must be positive");
        }
        if !(self.learn_rate.is_finite() && self.learn_rate > 0.0) {
            return invalid(LEARN_RATE, "must be a positive number");
        }
        if !(self.init_range.is_finite() && self.init_range > 0.0) {
            return invalid(INIT_RANGE, "must be a positive number");
        }
        if !(self.decay.is_finite() && self.decay > 0.0) {
            return invalid(DECAY, "must be a positive number");
        }
        if !(self.convergence_threshold.is_finite() && self.convergence_threshold >= 0.0) {
            return invalid(CONVERGENCE_THRESHOLD, "must be a non-negative number");
        }

        let regularization = [
            (REG_USER, self.reg_user),
            (REG_ITEM, self.reg_item),
            (REG_RATE_SOCIAL, self.reg_rate_social),
            (REG_USER_SOCIAL, self.reg_user_social),
            (REG_PHOTO, self.reg_photo),
            (REG_ITEM_PHOTO, self.reg_item_photo),
        ];

        for &(key, value) in regularization.iter() {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(key, "must be a non-negative number");
            }
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> Result<()> {
    Err(Error::Configuration(format!("Option '{}' {}", key, reason)))
}


#[cfg(test)]
mod tests {

    use std::io::Write;

    use tempfile::NamedTempFile;

    use crate::config::{self, Properties, TrainerConfig};
    use crate::error::Error;

    fn regularized() -> Properties {
        let mut properties = Properties::new();
        properties
            .set(config::REG_USER, "0.01")
            .set(config::REG_ITEM, "0.01")
            .set(config::REG_RATE_SOCIAL, "0.01")
            .set(config::REG_USER_SOCIAL, "0.01")
            .set(config::REG_PHOTO, "0.01")
            .set(config::REG_ITEM_PHOTO, "0.01");
        properties
    }

    #[test]
    fn defaults() {
        let config = TrainerConfig::from_properties(&regularized()).unwrap();

        assert_eq!(config.num_factors, 10);
        assert_eq!(config.num_iterations, 100);
        assert_eq!(config.feature_dimension, 1000);
        assert_eq!(config.max_learn_rate, None);
        assert!(!config.early_stop);
        assert!(!config.bold_driver);
    }

    #[test]
    fn missing_regularization_fails_fast() {
        let mut properties = regularized();
        properties.set(config::REG_PHOTO, "  ");

        match TrainerConfig::from_properties(&properties) {
            Err(Error::Configuration(message)) => assert!(message.contains(config::REG_PHOTO)),
            other => panic!("Expected a configuration error, got {:?}", other),
        };
    }

    #[test]
    fn invalid_values() {
        let mut properties = regularized();
        properties.set(config::NUM_FACTORS, "ten");
        assert!(TrainerConfig::from_properties(&properties).is_err());

        let mut properties = regularized();
        properties.set(config::LEARN_RATE, "-0.1");
        assert!(TrainerConfig::from_properties(&properties).is_err());

        let mut properties = regularized();
        properties.set(config::REG_ITEM, "NaN");
        assert!(TrainerConfig::from_properties(&properties).is_err());
    }

    #[test]
    fn load_properties_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# svpoi test configuration").unwrap();
        writeln!(file, "rec.factor.number=5").unwrap();
        writeln!(file, "").unwrap();
        writeln!(file, "! another comment").unwrap();
        writeln!(file, "rec.recommender.earlystop = true").unwrap();
        writeln!(file, "data.appender.photo.path: photos/").unwrap();

        let properties = Properties::load(file.path()).unwrap();

        assert_eq!(properties.get(config::NUM_FACTORS), Some("5"));
        assert_eq!(properties.get(config::EARLY_STOP), Some("true"));
        assert_eq!(properties.get(config::PHOTO_PATH), Some("photos/"));
        assert_eq!(properties.get(config::DATA_DIR), None);
    }

    #[test]
    fn max_learn_rate() {
        let mut properties = regularized();
        properties.set(config::MAX_LEARN_RATE, "0.5");

        let config = TrainerConfig::from_properties(&properties).unwrap();
        assert_eq!(config.max_learn_rate, Some(0.5));
    }
}
