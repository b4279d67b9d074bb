//! Declarative column transforms feeding the regression trainer

use crate::error::{Result, StormError};
use crate::models::{StormField, StormRecord};
use serde::{Deserialize, Serialize};

/// Name of the label slot the trainer reads
pub const LABEL_COLUMN: &str = "Label";

/// Name of the feature vector slot the trainer reads
pub const FEATURES_COLUMN: &str = "Features";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnTransform {
    /// Copy a column into a named slot
    CopyColumn { source: StormField, output: String },
    /// Concatenate columns into a named vector, in order
    Concatenate { inputs: Vec<StormField>, output: String },
}

/// Ordered transforms for one target column
///
/// Nothing is computed until a trainer fits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    target: StormField,
    features: Vec<StormField>,
    transforms: Vec<ColumnTransform>,
}

impl PipelineSpec {
    /// Build a pipeline predicting `target` from `features`
    pub fn new(target: StormField, features: Vec<StormField>) -> Result<Self> {
        if features.is_empty() {
            return Err(StormError::InvalidPipeline(format!(
                "no feature columns for target {}",
                target
            )));
        }
        if features.contains(&target) {
            return Err(StormError::InvalidPipeline(format!(
                "target {} cannot also be a feature",
                target
            )));
        }
        for (i, field) in features.iter().enumerate() {
            if features[..i].contains(field) {
                return Err(StormError::InvalidPipeline(format!(
                    "feature {} listed more than once",
                    field
                )));
            }
        }

        Ok(Self::assemble(target, features))
    }

    /// Pipeline predicting `target` from the other three columns in file order
    pub fn for_target(target: StormField) -> Self {
        Self::assemble(target, target.others())
    }

    fn assemble(target: StormField, features: Vec<StormField>) -> Self {
        let transforms = vec![
            ColumnTransform::CopyColumn {
                source: target,
                output: LABEL_COLUMN.to_string(),
            },
            ColumnTransform::Concatenate {
                inputs: features.clone(),
                output: FEATURES_COLUMN.to_string(),
            },
        ];
        Self {
            target,
            features,
            transforms,
        }
    }

    pub fn target(&self) -> StormField {
        self.target
    }

    pub fn feature_fields(&self) -> &[StormField] {
        &self.features
    }

    pub fn transforms(&self) -> &[ColumnTransform] {
        &self.transforms
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Label slot value for a record
    pub fn label(&self, record: &StormRecord) -> f32 {
        record.get(self.target)
    }

    /// Feature vector for a record, in declared order
    pub fn features(&self, record: &StormRecord) -> Vec<f32> {
        self.features.iter().map(|f| record.get(*f)).collect()
    }
}
