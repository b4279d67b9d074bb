//! Load → train → batch predict → persist → infer
//!
//! Each stage runs only if the previous one succeeded. Console output goes
//! to the writer handed to `run`; logs go through tracing.

use crate::config::PipelineConfig;
use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use storm_lib::pipeline::{
    evaluate, GbdtTrainer, PipelineSpec, PredictionEngine, Predictor, RegressionMetrics,
    TrainedModel,
};
use storm_lib::{
    Dataset, LoadOptions, ModelStore, PipelineMetrics, PredictionResult, Schema, StormField,
    StructuredLogger,
};
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Train,
    BatchPredict,
    Persist,
    Infer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "LOAD",
            Stage::Train => "TRAIN",
            Stage::BatchPredict => "BATCH-PREDICT",
            Stage::Persist => "PERSIST",
            Stage::Infer => "INFER",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub latitude_quality: RegressionMetrics,
    pub longitude_quality: RegressionMetrics,
    pub next_latitude: PredictionResult,
    pub next_longitude: PredictionResult,
}

struct TrainedPair {
    latitude: TrainedModel,
    longitude: TrainedModel,
    latitude_quality: RegressionMetrics,
    longitude_quality: RegressionMetrics,
}

/// Sequences the five pipeline stages
pub struct PipelineRunner<'a> {
    config: &'a PipelineConfig,
    load_options: LoadOptions,
    store: ModelStore,
    metrics: PipelineMetrics,
    logger: StructuredLogger,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        Ok(Self {
            config,
            load_options: config.load_options()?,
            store: ModelStore::new(),
            metrics: PipelineMetrics::new()?,
            logger: StructuredLogger::new(&config.run_name),
        })
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn run<W: Write>(&self, out: &mut W) -> Result<RunSummary> {
        self.logger.log_startup(VERSION, &self.config.data_path);

        enter(Stage::Load);
        let dataset = self.load().with_context(|| stage_failed(Stage::Load))?;

        enter(Stage::Train);
        let trained = self.train(&dataset).with_context(|| stage_failed(Stage::Train))?;

        enter(Stage::BatchPredict);
        let (latitude, longitude) = self
            .batch_predict(&dataset, trained.latitude, trained.longitude, out)
            .with_context(|| stage_failed(Stage::BatchPredict))?;

        enter(Stage::Persist);
        self.persist(latitude.model(), longitude.model(), dataset.schema())
            .with_context(|| stage_failed(Stage::Persist))?;

        enter(Stage::Infer);
        let (next_latitude, next_longitude) =
            self.infer(out).with_context(|| stage_failed(Stage::Infer))?;

        if let Some(path) = &self.config.metrics_path {
            self.metrics
                .write_textfile(path)
                .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        }

        let predictions = self.metrics.predictions_total(StormField::Latitude)
            + self.metrics.predictions_total(StormField::Longitude);
        self.logger.log_completed(predictions);

        Ok(RunSummary {
            rows: dataset.len(),
            latitude_quality: trained.latitude_quality,
            longitude_quality: trained.longitude_quality,
            next_latitude,
            next_longitude,
        })
    }

    fn load(&self) -> Result<Dataset> {
        let dataset = Dataset::load(&self.config.data_path, &self.load_options)?;
        self.metrics.set_records_loaded(dataset.len());
        self.logger
            .log_dataset_loaded(&self.config.data_path, dataset.len());
        Ok(dataset)
    }

    fn train(&self, dataset: &Dataset) -> Result<TrainedPair> {
        let trainer = GbdtTrainer::new(self.config.trainer.clone());
        let (latitude, latitude_quality) = self.fit(&trainer, StormField::Latitude, dataset)?;
        let (longitude, longitude_quality) = self.fit(&trainer, StormField::Longitude, dataset)?;
        Ok(TrainedPair {
            latitude,
            longitude,
            latitude_quality,
            longitude_quality,
        })
    }

    /// Fit one target on the full dataset and score it on the same rows
    fn fit(
        &self,
        trainer: &GbdtTrainer,
        target: StormField,
        dataset: &Dataset,
    ) -> Result<(TrainedModel, RegressionMetrics)> {
        let spec = PipelineSpec::for_target(target);
        let start = Instant::now();
        let model = trainer
            .fit(&spec, dataset)
            .with_context(|| format!("Failed to fit {} model", target))?;
        let elapsed = start.elapsed().as_secs_f64();

        self.metrics.observe_fit(target, elapsed);
        self.logger.log_model_trained(target, dataset.len(), elapsed);

        let quality = evaluate(&model, dataset);
        self.logger.log_evaluation(target, &quality);
        Ok((model, quality))
    }

    fn batch_predict<W: Write>(
        &self,
        dataset: &Dataset,
        latitude: TrainedModel,
        longitude: TrainedModel,
        out: &mut W,
    ) -> Result<(PredictionEngine, PredictionEngine)> {
        let latitude = self.engine(latitude);
        let longitude = self.engine(longitude);

        writeln!(out, "Predicted Coordinates:")?;
        for record in dataset.iter() {
            let lat = latitude.predict(record)?;
            let lon = longitude.predict(record)?;
            writeln!(
                out,
                "Latitude: {}, Longitude: {}",
                lat.predicted_value, lon.predicted_value
            )?;
        }
        out.flush()?;
        Ok((latitude, longitude))
    }

    fn persist(
        &self,
        latitude: &TrainedModel,
        longitude: &TrainedModel,
        schema: &Schema,
    ) -> Result<()> {
        for (model, path) in [
            (latitude, &self.config.latitude_model_path),
            (longitude, &self.config.longitude_model_path),
        ] {
            let info = self
                .store
                .save(model, schema, path)
                .with_context(|| format!("Failed to save {} model", model.target()))?;
            self.metrics.set_artifact_size(model.target(), info.size_bytes);
            self.logger
                .log_model_saved(model.target(), &info.path, &info.checksum, info.size_bytes);
        }
        Ok(())
    }

    /// Reload both artifacts and predict from the configured last observation
    fn infer<W: Write>(&self, out: &mut W) -> Result<(PredictionResult, PredictionResult)> {
        let latitude = self.reload(StormField::Latitude, &self.config.latitude_model_path)?;
        let longitude = self.reload(StormField::Longitude, &self.config.longitude_model_path)?;

        let last = &self.config.last_observation;
        let next_latitude = latitude.predict(last)?;
        let next_longitude = longitude.predict(last)?;

        writeln!(out, "Next Predicted Latitude: {}", next_latitude.predicted_value)?;
        writeln!(out, "Next Predicted Longitude: {}", next_longitude.predicted_value)?;
        out.flush()?;

        Ok((next_latitude, next_longitude))
    }

    fn reload(&self, expected: StormField, path: &Path) -> Result<PredictionEngine> {
        let (model, _schema) = self
            .store
            .load(path)
            .with_context(|| format!("Failed to load {} model", expected))?;
        if model.target() != expected {
            anyhow::bail!(
                "{} holds a {} model, expected {}",
                path.display(),
                model.target(),
                expected
            );
        }
        self.logger
            .log_model_loaded(expected, path, model.trained_at());
        Ok(self.engine(model))
    }

    fn engine(&self, model: TrainedModel) -> PredictionEngine {
        PredictionEngine::new(model).with_metrics(self.metrics.clone())
    }
}

fn enter(stage: Stage) {
    info!(stage = %stage, "Entering stage");
}

fn stage_failed(stage: Stage) -> String {
    format!("{} stage failed", stage)
}
