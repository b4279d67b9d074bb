//! Regression quality over a dataset

use super::trainer::TrainedModel;
use crate::dataset::Dataset;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub rows: usize,
    pub mean_absolute_error: f64,
    pub root_mean_squared_error: f64,
    /// Coefficient of determination
    pub r_squared: f64,
}

impl RegressionMetrics {
    /// Metrics from (predicted, actual) pairs
    pub fn from_pairs(pairs: &[(f32, f32)]) -> Self {
        if pairs.is_empty() {
            return Self {
                rows: 0,
                mean_absolute_error: 0.0,
                root_mean_squared_error: 0.0,
                r_squared: 0.0,
            };
        }

        let n = pairs.len() as f64;
        let mean_actual = pairs.iter().map(|(_, a)| *a as f64).sum::<f64>() / n;

        let mut abs_sum = 0.0;
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (predicted, actual) in pairs {
            let err = *predicted as f64 - *actual as f64;
            abs_sum += err.abs();
            ss_res += err * err;
            ss_tot += (*actual as f64 - mean_actual).powi(2);
        }

        // Constant labels: perfect fit scores 1, anything else 0
        let r_squared = if ss_tot.abs() < f64::EPSILON {
            if ss_res.abs() < f64::EPSILON {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        Self {
            rows: pairs.len(),
            mean_absolute_error: abs_sum / n,
            root_mean_squared_error: (ss_res / n).sqrt(),
            r_squared,
        }
    }
}

/// Score every row of `dataset` and compare against its label column
pub fn evaluate(model: &TrainedModel, dataset: &Dataset) -> RegressionMetrics {
    let predictions = model.predict_many(dataset.records());
    let pairs: Vec<(f32, f32)> = predictions
        .into_iter()
        .zip(dataset.iter())
        .map(|(p, r)| (p, model.pipeline().label(r)))
        .collect();
    RegressionMetrics::from_pairs(&pairs)
}
