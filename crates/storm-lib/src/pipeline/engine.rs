//! Single-record prediction engine

use super::trainer::TrainedModel;
use super::Predictor;
use crate::error::Result;
use crate::models::{PredictionResult, StormField, StormRecord};
use crate::observability::PipelineMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
pub const MAX_INFERENCE_MS: u128 = 5;

/// Scores one record at a time against a trained model
pub struct PredictionEngine {
    model: TrainedModel,
    metrics: Option<PipelineMetrics>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl PredictionEngine {
    pub fn new(model: TrainedModel) -> Self {
        Self {
            model,
            metrics: None,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    /// Record prediction latency and counts into `metrics`
    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn into_model(self) -> TrainedModel {
        self.model
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

impl Predictor for PredictionEngine {
    fn target(&self) -> StormField {
        self.model.target()
    }

    fn predict(&self, record: &StormRecord) -> Result<PredictionResult> {
        let start = Instant::now();
        let predicted_value = self.model.predict(record);
        let elapsed = start.elapsed();

        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                label_column = %self.target(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros() as u64, "Inference completed");
        }

        if let Some(metrics) = &self.metrics {
            metrics.observe_prediction(self.target(), elapsed.as_secs_f64());
        }

        Ok(PredictionResult {
            target: self.target(),
            predicted_value,
        })
    }
}

/// Inference statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}
