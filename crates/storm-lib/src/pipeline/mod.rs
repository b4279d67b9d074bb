//! Feature pipelines, training and prediction

mod engine;
mod evaluation;
mod spec;
mod trainer;

pub use engine::{InferenceStats, PredictionEngine, MAX_INFERENCE_MS};
pub use evaluation::{evaluate, RegressionMetrics};
pub use spec::{ColumnTransform, PipelineSpec, FEATURES_COLUMN, LABEL_COLUMN};
pub use trainer::{GbdtTrainer, TrainedModel, TrainerConfig};

use crate::error::Result;
use crate::models::{PredictionResult, StormField, StormRecord};

/// Trait for single-record scoring
pub trait Predictor {
    /// Column this predictor estimates
    fn target(&self) -> StormField;

    /// Score one record
    fn predict(&self, record: &StormRecord) -> Result<PredictionResult>;
}
