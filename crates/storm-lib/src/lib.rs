//! Storm track regression library
//!
//! This crate provides the core functionality for:
//! - Loading storm observations from delimited text
//! - Building per-target feature pipelines
//! - Training gradient-boosted regressors and scoring records
//! - Persisting trained models as checksummed artifacts
//! - Metrics and structured logging

pub mod dataset;
pub mod error;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod store;

pub use dataset::{Dataset, LoadOptions};
pub use error::{Result, StormError};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use store::{ArtifactInfo, ModelStore};
