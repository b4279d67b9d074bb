//! Observability infrastructure for the storm pipeline
//!
//! Provides:
//! - Prometheus metrics (fit duration, prediction latency, rows loaded, artifact size)
//! - Structured JSON logging with tracing

use crate::error::Result;
use crate::models::StormField;
use crate::pipeline::RegressionMetrics;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::path::Path;
use tracing::info;

/// Histogram buckets for model fitting (in seconds)
const FIT_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Histogram buckets for single-record inference (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05,
];

/// Metrics for one pipeline run
///
/// Each instance owns its registry, so clones share counters and separate
/// instances never collide.
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    fit_duration_seconds: HistogramVec,
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    records_loaded: IntGauge,
    artifact_size_bytes: IntGaugeVec,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let fit_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "storm_model_fit_duration_seconds",
                "Time spent fitting a regression model",
            )
            .buckets(FIT_BUCKETS.to_vec()),
            &["target"],
        )?;
        let prediction_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "storm_prediction_latency_seconds",
                "Time spent scoring a single record",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["target"],
        )?;
        let predictions_total = IntCounterVec::new(
            Opts::new("storm_predictions_total", "Total number of records scored"),
            &["target"],
        )?;
        let records_loaded = IntGauge::new(
            "storm_records_loaded",
            "Number of observations in the loaded dataset",
        )?;
        let artifact_size_bytes = IntGaugeVec::new(
            Opts::new("storm_artifact_size_bytes", "Size of the persisted model artifact"),
            &["target"],
        )?;

        registry.register(Box::new(fit_duration_seconds.clone()))?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;
        registry.register(Box::new(records_loaded.clone()))?;
        registry.register(Box::new(artifact_size_bytes.clone()))?;

        Ok(Self {
            registry,
            fit_duration_seconds,
            prediction_latency_seconds,
            predictions_total,
            records_loaded,
            artifact_size_bytes,
        })
    }

    pub fn observe_fit(&self, target: StormField, duration_secs: f64) {
        self.fit_duration_seconds
            .with_label_values(&[target.column_name()])
            .observe(duration_secs);
    }

    pub fn observe_prediction(&self, target: StormField, duration_secs: f64) {
        self.prediction_latency_seconds
            .with_label_values(&[target.column_name()])
            .observe(duration_secs);
        self.predictions_total
            .with_label_values(&[target.column_name()])
            .inc();
    }

    pub fn set_records_loaded(&self, rows: usize) {
        self.records_loaded.set(rows as i64);
    }

    pub fn set_artifact_size(&self, target: StormField, bytes: u64) {
        self.artifact_size_bytes
            .with_label_values(&[target.column_name()])
            .set(bytes as i64);
    }

    pub fn predictions_total(&self, target: StormField) -> u64 {
        self.predictions_total
            .with_label_values(&[target.column_name()])
            .get()
    }

    /// Prometheus text exposition of every metric
    pub fn export_text(&self) -> Result<String> {
        let mut buffer: Vec<u8> = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the text exposition to `path` for a textfile collector
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let text = self.export_text()?;
        std::fs::write(path, text).map_err(|e| crate::error::StormError::from_io(path, e))
    }
}

/// Structured logger for pipeline events
///
/// Provides consistent JSON-formatted logging for loading, training,
/// persistence and inference.
#[derive(Clone)]
pub struct StructuredLogger {
    run_name: String,
}

impl StructuredLogger {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, data_path: &Path) {
        info!(
            event = "run_started",
            run = %self.run_name,
            version = %version,
            data_path = %data_path.display(),
            "Storm predictor started"
        );
    }

    pub fn log_dataset_loaded(&self, path: &Path, rows: usize) {
        info!(
            event = "dataset_loaded",
            run = %self.run_name,
            path = %path.display(),
            rows = rows,
            "Loaded storm observations"
        );
    }

    pub fn log_model_trained(&self, target: StormField, rows: usize, elapsed_secs: f64) {
        info!(
            event = "model_trained",
            run = %self.run_name,
            label_column = %target,
            rows = rows,
            elapsed_secs = elapsed_secs,
            "Trained regression model"
        );
    }

    pub fn log_evaluation(&self, target: StormField, metrics: &RegressionMetrics) {
        info!(
            event = "model_evaluated",
            run = %self.run_name,
            label_column = %target,
            rows = metrics.rows,
            mae = metrics.mean_absolute_error,
            rmse = metrics.root_mean_squared_error,
            r_squared = metrics.r_squared,
            "Evaluated model on training data"
        );
    }

    pub fn log_model_saved(&self, target: StormField, path: &Path, checksum: &str, size_bytes: u64) {
        info!(
            event = "model_saved",
            run = %self.run_name,
            label_column = %target,
            path = %path.display(),
            checksum = %checksum,
            size_bytes = size_bytes,
            "Persisted model artifact"
        );
    }

    pub fn log_model_loaded(&self, target: StormField, path: &Path, trained_at: i64) {
        info!(
            event = "model_loaded",
            run = %self.run_name,
            label_column = %target,
            path = %path.display(),
            trained_at = trained_at,
            "Reloaded model artifact"
        );
    }

    pub fn log_completed(&self, predictions: u64) {
        info!(
            event = "run_completed",
            run = %self.run_name,
            predictions = predictions,
            "Storm predictor finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_export() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.set_records_loaded(42);
        metrics.observe_fit(StormField::Latitude, 0.3);
        metrics.observe_prediction(StormField::Longitude, 0.0002);
        metrics.set_artifact_size(StormField::Latitude, 2048);

        let text = metrics.export_text().unwrap();
        assert!(text.contains("storm_records_loaded 42"));
        assert!(text.contains("storm_model_fit_duration_seconds_count{target=\"Latitude\"} 1"));
        assert!(text.contains("storm_predictions_total{target=\"Longitude\"} 1"));
        assert!(text.contains("storm_artifact_size_bytes{target=\"Latitude\"} 2048"));
    }

    #[test]
    fn test_separate_instances_do_not_collide() {
        let first = PipelineMetrics::new().unwrap();
        let second = PipelineMetrics::new().unwrap();
        first.observe_prediction(StormField::Latitude, 0.001);
        assert_eq!(first.predictions_total(StormField::Latitude), 1);
        assert_eq!(second.predictions_total(StormField::Latitude), 0);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-run");
        assert_eq!(logger.run_name, "test-run");
    }
}
