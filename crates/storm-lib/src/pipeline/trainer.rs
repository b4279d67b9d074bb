//! Gradient-boosted regression trainer
//!
//! Wraps the `gbdt` crate. The booster is a black box: feature vectors go
//! in, a single score comes out.

use super::spec::PipelineSpec;
use crate::dataset::Dataset;
use crate::error::{Result, StormError};
use crate::models::{StormField, StormRecord};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, ValueType};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

const LOSS: &str = "SquaredError";

/// Booster hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Number of boosting rounds (trees)
    pub iterations: usize,
    /// Maximum depth of each tree
    pub max_depth: u32,
    /// Learning rate applied to each tree's output
    pub shrinkage: f32,
    /// Minimum number of rows in a leaf
    pub min_leaf_size: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            max_depth: 5,
            shrinkage: 0.2,
            min_leaf_size: 10,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(StormError::Training("iterations must be positive".into()));
        }
        if self.max_depth == 0 {
            return Err(StormError::Training("max_depth must be positive".into()));
        }
        if !(self.shrinkage.is_finite() && self.shrinkage > 0.0) {
            return Err(StormError::Training(format!(
                "shrinkage must be a positive number, got {}",
                self.shrinkage
            )));
        }
        if self.min_leaf_size == 0 {
            return Err(StormError::Training("min_leaf_size must be positive".into()));
        }
        Ok(())
    }

    fn booster_config(&self, feature_size: usize) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(feature_size);
        cfg.set_max_depth(self.max_depth);
        cfg.set_iterations(self.iterations);
        cfg.set_shrinkage(ValueType::from(self.shrinkage));
        cfg.set_min_leaf_size(self.min_leaf_size);
        cfg.set_loss(LOSS);
        // Full rows and features every round keeps fitting deterministic
        cfg.set_data_sample_ratio(1.0);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_training_optimization_level(2);
        cfg.set_debug(false);
        cfg
    }
}

/// Fits pipeline specs with a gradient-boosted tree ensemble
#[derive(Debug, Clone, Default)]
pub struct GbdtTrainer {
    config: TrainerConfig,
}

impl GbdtTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit `spec` on every row of `dataset`
    pub fn fit(&self, spec: &PipelineSpec, dataset: &Dataset) -> Result<TrainedModel> {
        self.config.validate()?;

        if dataset.is_empty() {
            return Err(StormError::Training(format!(
                "cannot fit {} model on an empty dataset",
                spec.target()
            )));
        }

        let mut training: DataVec = Vec::with_capacity(dataset.len());
        for (row, record) in dataset.iter().enumerate() {
            let label = spec.label(record);
            let features = spec.features(record);
            if !label.is_finite() || features.iter().any(|v| !v.is_finite()) {
                return Err(StormError::Training(format!(
                    "row {} has a non-finite value",
                    row + 1
                )));
            }
            training.push(Data::new_training_data(
                to_values(&features),
                1.0,
                ValueType::from(label),
                None,
            ));
        }

        let start = Instant::now();
        let mut booster = GBDT::new(&self.config.booster_config(spec.feature_count()));
        booster.fit(&mut training);
        let elapsed = start.elapsed();

        info!(
            label_column = %spec.target(),
            rows = dataset.len(),
            iterations = self.config.iterations,
            elapsed_ms = elapsed.as_millis() as u64,
            "Fitted regression model"
        );

        Ok(TrainedModel {
            target: spec.target(),
            pipeline: spec.clone(),
            trainer: self.config.clone(),
            training_rows: dataset.len(),
            trained_at: chrono::Utc::now().timestamp(),
            booster,
        })
    }
}

/// Fitted booster plus the pipeline it was trained with
#[derive(Serialize, Deserialize)]
pub struct TrainedModel {
    target: StormField,
    pipeline: PipelineSpec,
    trainer: TrainerConfig,
    training_rows: usize,
    trained_at: i64,
    booster: GBDT,
}

impl TrainedModel {
    pub fn target(&self) -> StormField {
        self.target
    }

    pub fn pipeline(&self) -> &PipelineSpec {
        &self.pipeline
    }

    pub fn trainer_config(&self) -> &TrainerConfig {
        &self.trainer
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Unix timestamp of the fit
    pub fn trained_at(&self) -> i64 {
        self.trained_at
    }

    /// Score one record
    pub fn predict(&self, record: &StormRecord) -> f32 {
        self.predict_many(std::slice::from_ref(record))
            .first()
            .copied()
            .unwrap_or(f32::NAN)
    }

    /// Score records in order
    pub fn predict_many(&self, records: &[StormRecord]) -> Vec<f32> {
        let batch: DataVec = records
            .iter()
            .map(|r| Data::new_test_data(to_values(&self.pipeline.features(r)), None))
            .collect();
        let scores = self.booster.predict(&batch);
        debug!(label_column = %self.target, rows = batch.len(), "Scored batch");
        scores.into_iter().map(|v| v as f32).collect()
    }
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("target", &self.target)
            .field("pipeline", &self.pipeline)
            .field("trainer", &self.trainer)
            .field("training_rows", &self.training_rows)
            .field("trained_at", &self.trained_at)
            .finish_non_exhaustive()
    }
}

fn to_values(features: &[f32]) -> Vec<ValueType> {
    features.iter().map(|v| ValueType::from(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(count: usize) -> Dataset {
        // Storm drifting north-west while intensifying
        Dataset::from_records(
            (0..count)
                .map(|i| {
                    let t = i as f32;
                    StormRecord::new(
                        12.0 + 0.4 * t,
                        -40.0 - 1.1 * t,
                        35.0 + 3.0 * t,
                        1010.0 - 2.5 * t,
                    )
                })
                .collect(),
        )
    }

    fn fast_config() -> TrainerConfig {
        TrainerConfig {
            iterations: 40,
            max_depth: 4,
            shrinkage: 0.3,
            min_leaf_size: 1,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = TrainerConfig {
            iterations: 0,
            ..Default::default()
        };
        let trainer = GbdtTrainer::new(cfg);
        let err = trainer
            .fit(&PipelineSpec::for_target(StormField::Latitude), &track(5))
            .unwrap_err();
        assert!(matches!(err, StormError::Training(_)));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let trainer = GbdtTrainer::default();
        let err = trainer
            .fit(
                &PipelineSpec::for_target(StormField::Latitude),
                &Dataset::from_records(vec![]),
            )
            .unwrap_err();
        assert!(matches!(err, StormError::Training(_)));
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let mut records = track(4).records().to_vec();
        records[2].pressure = f32::NAN;
        let err = GbdtTrainer::default()
            .fit(
                &PipelineSpec::for_target(StormField::Longitude),
                &Dataset::from_records(records),
            )
            .unwrap_err();
        assert!(matches!(err, StormError::Training(_)));
    }

    #[test]
    fn test_single_row_fit() {
        let ds = Dataset::from_records(vec![StormRecord::new(25.0, -80.0, 150.0, 922.0)]);
        let model = GbdtTrainer::default()
            .fit(&PipelineSpec::for_target(StormField::Latitude), &ds)
            .unwrap();
        assert_eq!(model.training_rows(), 1);
        assert!(model.predict(&ds.records()[0]).is_finite());
    }

    #[test]
    fn test_fit_tracks_training_data() {
        let ds = track(40);
        let model = GbdtTrainer::new(fast_config())
            .fit(&PipelineSpec::for_target(StormField::Latitude), &ds)
            .unwrap();

        let labels: Vec<f32> = ds.iter().map(|r| r.latitude).collect();
        let mean = labels.iter().sum::<f32>() / labels.len() as f32;
        let spread = (labels.iter().map(|v| (v - mean).powi(2)).sum::<f32>()
            / labels.len() as f32)
            .sqrt();

        let predictions = model.predict_many(ds.records());
        let rmse = (predictions
            .iter()
            .zip(&labels)
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f32>()
            / labels.len() as f32)
            .sqrt();
        assert!(rmse < spread * 0.5, "rmse {} vs spread {}", rmse, spread);
    }

    #[test]
    fn test_predict_matches_predict_many() {
        let ds = track(12);
        let model = GbdtTrainer::new(fast_config())
            .fit(&PipelineSpec::for_target(StormField::Longitude), &ds)
            .unwrap();
        let batch = model.predict_many(ds.records());
        for (record, expected) in ds.iter().zip(batch) {
            assert_eq!(model.predict(record), expected);
        }
    }
}
