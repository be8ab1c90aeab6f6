//! Run configuration: hyperparameters plus preprocessing settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::optim::OptimizerConfig;

/// Hyperparameters for one training run. Built once, validated, then only
/// read.
///
/// Every key is optional in a config file:
///
/// ```toml
/// layer_dim = 80
/// output_dim = 22
/// num_epochs = 10
/// middle_size = 50
/// batch_size = 32
///
/// [optimizer]
/// kind = "adam"
/// learning_rate = 0.001
///
/// [data]
/// time_steps = 100
/// test_fraction = 0.2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Hidden width of the LSTM cell.
    pub layer_dim: usize,
    /// Number of output classes.
    pub output_dim: usize,
    pub num_epochs: usize,
    /// Width of the tanh bottleneck between the LSTM and the logits.
    pub middle_size: usize,
    pub batch_size: usize,
    pub optimizer: OptimizerConfig,
    pub forget_bias: f64,
    pub seed: u64,
    pub keep_checkpoint_max: usize,
    pub log_step_count_steps: u64,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Length every recording is median-downsampled to.
    pub time_steps: usize,
    /// Share of recordings held out for validation.
    pub test_fraction: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            layer_dim: 80,
            output_dim: 22,
            num_epochs: 10,
            middle_size: 50,
            batch_size: 32,
            optimizer: OptimizerConfig::default(),
            forget_bias: 1.0,
            seed: 42,
            keep_checkpoint_max: 5,
            log_step_count_steps: 100,
            data: DataConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig { time_steps: 100, test_fraction: 0.2 }
    }
}

impl Config {
    /// Parses a TOML config. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(p) => Config::from_toml_str(&std::fs::read_to_string(p)?),
            None => Ok(Config::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("layer_dim", self.layer_dim),
            ("output_dim", self.output_dim),
            ("num_epochs", self.num_epochs),
            ("middle_size", self.middle_size),
            ("batch_size", self.batch_size),
            ("keep_checkpoint_max", self.keep_checkpoint_max),
            ("data.time_steps", self.data.time_steps),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::config(format!("{} must be at least 1", name)));
            }
        }
        if self.log_step_count_steps == 0 {
            return Err(Error::config("log_step_count_steps must be at least 1"));
        }
        if !(self.data.test_fraction > 0.0 && self.data.test_fraction < 1.0) {
            return Err(Error::config(format!(
                "data.test_fraction must be in (0, 1), got {}", self.data.test_fraction
            )));
        }
        let lr = self.optimizer.learning_rate();
        if !(lr.is_finite() && lr > 0.0) {
            return Err(Error::config(format!("learning_rate must be positive, got {}", lr)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let c = Config::default();
        assert_eq!((c.layer_dim, c.output_dim, c.num_epochs, c.middle_size, c.batch_size), (80, 22, 10, 50, 32));
        assert!(matches!(c.optimizer, OptimizerConfig::Adam { .. }));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let c = Config::from_toml_str(
            "num_epochs = 3\n[optimizer]\nkind = \"sgd\"\nlearning_rate = 0.05\n[data]\ntime_steps = 20\n",
        ).unwrap();
        assert_eq!(c.num_epochs, 3);
        assert_eq!(c.layer_dim, 80);
        assert_eq!(c.optimizer, OptimizerConfig::Sgd { learning_rate: 0.05 });
        assert_eq!(c.data.time_steps, 20);
        assert_eq!(c.data.test_fraction, 0.2);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(Config::from_toml_str("batch_size = 0"), Err(Error::Config(_))));
        assert!(matches!(
            Config::from_toml_str("[data]\ntest_fraction = 1.0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[optimizer]\nkind = \"sgd\"\nlearning_rate = -1.0"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn unknown_keys_are_errors() {
        assert!(matches!(Config::from_toml_str("hidden = 3"), Err(Error::Toml(_))));
    }
}
