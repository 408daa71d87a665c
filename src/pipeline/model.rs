//! Fitted pipeline: transform states plus learned trainer parameters

use super::{apply_steps, feature_cell};
use crate::data::{Row, Schema, TextFormat};
use crate::error::{KolosalError, Result};
use crate::feature_engineering::FittedStep;
use crate::training::{Prediction, TrainedPredictor, TrainerKind};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Where a model came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    /// Produced by `Pipeline::fit` in this process
    Fit,
    /// Read back from an artifact
    #[default]
    Loaded,
}

/// Immutable trained model. Safe to share across threads behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    schema: Schema,
    format: TextFormat,
    steps: Vec<FittedStep>,
    feature_steps: Vec<usize>,
    feature_inputs: Vec<String>,
    label_column: String,
    feature_column: String,
    predictor: TrainedPredictor,
    #[serde(skip)]
    state: ModelState,
}

impl TrainedModel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        schema: Schema,
        format: TextFormat,
        steps: Vec<FittedStep>,
        feature_steps: Vec<usize>,
        feature_inputs: Vec<String>,
        label_column: String,
        feature_column: String,
        predictor: TrainedPredictor,
    ) -> Self {
        Self {
            schema,
            format,
            steps,
            feature_steps,
            feature_inputs,
            label_column,
            feature_column,
            predictor,
            state: ModelState::Fit,
        }
    }

    /// Check internal references after decoding an artifact
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(&bad) = self.feature_steps.iter().find(|&&i| i >= self.steps.len()) {
            return Err(KolosalError::SerializationError(format!(
                "feature step {} out of range ({} steps)",
                bad,
                self.steps.len()
            )));
        }
        let ensemble = self.predictor.ensemble();
        if let Some(max) = ensemble.trees().iter().filter_map(|t| t.max_feature()).max() {
            if max >= ensemble.num_features() {
                return Err(KolosalError::SerializationError(format!(
                    "tree reads feature {} of {}",
                    max,
                    ensemble.num_features()
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn into_loaded(mut self) -> Self {
        self.state = ModelState::Loaded;
        self
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn format(&self) -> TextFormat {
        self.format
    }

    pub fn trainer_kind(&self) -> TrainerKind {
        self.predictor.kind()
    }

    pub fn predictor(&self) -> &TrainedPredictor {
        &self.predictor
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn feature_column(&self) -> &str {
        &self.feature_column
    }

    /// Raw columns a record needs for prediction
    pub fn feature_inputs(&self) -> &[String] {
        &self.feature_inputs
    }

    /// Width of the feature vector
    pub fn num_features(&self) -> usize {
        self.predictor.num_features()
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Feature vector for one record. Only the steps feeding the feature column run.
    pub fn transform(&self, record: &Row) -> Result<Vec<f64>> {
        self.transform_at(record, 0)
    }

    pub(crate) fn transform_at(&self, record: &Row, index: usize) -> Result<Vec<f64>> {
        for column in &self.feature_inputs {
            self.schema.check_column(record, column, index)?;
        }
        let mut row = record.clone();
        apply_steps(&self.steps, &self.feature_steps, &mut row)?;
        Ok(feature_cell(&row, &self.feature_column, index)?.to_vec())
    }

    /// Run every fitted step, label steps included
    pub(crate) fn transform_full(&self, record: &Row) -> Result<Row> {
        let mut row = record.clone();
        for step in &self.steps {
            step.apply(&mut row)?;
        }
        Ok(row)
    }

    pub fn predict(&self, record: &Row) -> Result<Prediction> {
        self.predict_at(record, 0)
    }

    pub(crate) fn predict_at(&self, record: &Row, index: usize) -> Result<Prediction> {
        let features = self.transform_at(record, index)?;
        self.predict_features(&features)
    }

    pub(crate) fn predict_features(&self, features: &[f64]) -> Result<Prediction> {
        self.predictor.predict(ArrayView1::from(features))
    }
}
