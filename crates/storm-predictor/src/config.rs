//! Predictor configuration

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use storm_lib::pipeline::TrainerConfig;
use storm_lib::{LoadOptions, StormRecord};

/// Optional config file, resolved as storm.toml / storm.json / storm.yaml
const CONFIG_FILE: &str = "storm";

/// Prefix for environment overrides, e.g. STORM_TRAINER__ITERATIONS=50
const ENV_PREFIX: &str = "STORM";

/// Predictor configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name attached to every structured log event
    pub run_name: String,

    /// Tab-separated storm observations
    pub data_path: PathBuf,

    /// Single ASCII column separator
    pub delimiter: String,

    pub has_header: bool,

    pub latitude_model_path: PathBuf,

    pub longitude_model_path: PathBuf,

    /// Booster hyperparameters shared by both models
    pub trainer: TrainerConfig,

    /// Observation the next position is predicted from
    pub last_observation: StormRecord,

    /// Where to write Prometheus text metrics after the run
    pub metrics_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            run_name: "storm-predictor".to_string(),
            data_path: PathBuf::from("SampleData/fakestorm.tsv"),
            delimiter: "\t".to_string(),
            has_header: true,
            latitude_model_path: PathBuf::from("SampleData/latmodel.bin"),
            longitude_model_path: PathBuf::from("SampleData/lonmodel.bin"),
            trainer: TrainerConfig::default(),
            // Last coordinate for Andrew in the sample data
            last_observation: StormRecord::new(25.0, -80.0, 150.0, 922.0),
            metrics_path: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an optional config file and the environment
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to read predictor configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid predictor configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.load_options()?;
        self.trainer
            .validate()
            .context("Invalid trainer configuration")?;
        if self.latitude_model_path == self.longitude_model_path {
            bail!(
                "latitude and longitude models share the path {}",
                self.latitude_model_path.display()
            );
        }
        Ok(())
    }

    /// Loader settings derived from `delimiter` and `has_header`
    pub fn load_options(&self) -> Result<LoadOptions> {
        let delimiter = match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => *byte,
            _ => bail!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ),
        };
        Ok(LoadOptions {
            delimiter,
            has_header: self.has_header,
        })
    }
}
