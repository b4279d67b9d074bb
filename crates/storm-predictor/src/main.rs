//! Storm Predictor - storm track regression demo
//!
//! Trains latitude and longitude regressors on recorded storm
//! observations, persists them, then predicts the next position from
//! the last known observation.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod runner;

fn main() -> Result<()> {
    // Initialize tracing with JSON output on stderr; stdout carries the predictions
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    info!("Starting storm-predictor");

    // Load configuration
    let config = config::PipelineConfig::load()?;
    info!(
        data_path = %config.data_path.display(),
        latitude_model = %config.latitude_model_path.display(),
        longitude_model = %config.longitude_model_path.display(),
        "Predictor configured"
    );

    let runner = runner::PipelineRunner::new(&config)?;
    let stdout = std::io::stdout();
    let summary = runner.run(&mut stdout.lock())?;

    info!(
        rows = summary.rows,
        latitude_r_squared = summary.latitude_quality.r_squared,
        longitude_r_squared = summary.longitude_quality.r_squared,
        next_latitude = summary.next_latitude.predicted_value,
        next_longitude = summary.next_longitude.predicted_value,
        latitude_predictions = runner
            .metrics()
            .predictions_total(summary.next_latitude.target),
        "Run complete"
    );
    Ok(())
}
