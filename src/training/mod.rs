//! Model training module
//!
//! Gradient-boosted regression trees, grown leaf-wise:
//! - `BinaryClassifier` minimizes log-loss and calibrates probabilities with Platt scaling
//! - `Regressor` minimizes squared error

mod boosting;
mod calibration;
mod tree;

pub use boosting::{
    BinaryClassifier, BinaryClassifierModel, BoostingConfig, Regressor, RegressorModel,
    TreeEnsemble,
};
pub use calibration::PlattCalibrator;
pub use tree::{RegressionTree, TreeNode};

use crate::data::{ColumnKind, Value};
use crate::error::{KolosalError, Result};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Which learner to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerKind {
    BinaryClassifier,
    Regressor,
}

impl TrainerKind {
    /// Label column kind this learner accepts
    pub fn label_kind(&self) -> ColumnKind {
        match self {
            TrainerKind::BinaryClassifier => ColumnKind::Boolean,
            TrainerKind::Regressor => ColumnKind::Numeric,
        }
    }
}

fn default_label_column() -> String {
    "Label".to_string()
}

fn default_feature_column() -> String {
    "Features".to_string()
}

/// Trainer declaration: learner, where to read label and features, and hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub kind: TrainerKind,
    #[serde(default = "default_label_column")]
    pub label_column: String,
    #[serde(default = "default_feature_column")]
    pub feature_column: String,
    #[serde(default)]
    pub params: BoostingConfig,
}

impl TrainerConfig {
    pub fn new(kind: TrainerKind) -> Self {
        Self {
            kind,
            label_column: default_label_column(),
            feature_column: default_feature_column(),
            params: BoostingConfig::default(),
        }
    }

    pub fn binary_classifier() -> Self {
        Self::new(TrainerKind::BinaryClassifier)
    }

    pub fn regressor() -> Self {
        Self::new(TrainerKind::Regressor)
    }

    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    pub fn with_feature_column(mut self, name: impl Into<String>) -> Self {
        self.feature_column = name.into();
        self
    }

    pub fn with_params(mut self, params: BoostingConfig) -> Self {
        self.params = params;
        self
    }

    /// Fit on a dense feature matrix and the label cells of the same rows
    pub fn train(&self, x: &Array2<f64>, labels: &[Value]) -> Result<TrainedPredictor> {
        match self.kind {
            TrainerKind::BinaryClassifier => {
                let y = labels
                    .iter()
                    .map(|v| v.as_bool().ok_or_else(|| self.label_error(v)))
                    .collect::<Result<Vec<bool>>>()?;
                let model = BinaryClassifier::new(self.params.clone())?.fit(x, &y)?;
                Ok(TrainedPredictor::BinaryClassifier(model))
            }
            TrainerKind::Regressor => {
                let y = labels
                    .iter()
                    .map(|v| v.as_number().ok_or_else(|| self.label_error(v)))
                    .collect::<Result<Vec<f64>>>()?;
                let model = Regressor::new(self.params.clone())?.fit(x, &y)?;
                Ok(TrainedPredictor::Regressor(model))
            }
        }
    }

    fn label_error(&self, value: &Value) -> KolosalError {
        KolosalError::LabelTypeMismatch {
            column: self.label_column.clone(),
            expected: self.kind.label_kind().to_string(),
            actual: format!("{:?}", value),
        }
    }
}

/// One model output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Prediction {
    Binary {
        label: bool,
        probability: f64,
        score: f64,
    },
    Regression {
        value: f64,
        score: f64,
    },
}

impl Prediction {
    pub fn score(&self) -> f64 {
        match self {
            Prediction::Binary { score, .. } | Prediction::Regression { score, .. } => *score,
        }
    }
}

/// Learned parameters of either learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainedPredictor {
    BinaryClassifier(BinaryClassifierModel),
    Regressor(RegressorModel),
}

impl TrainedPredictor {
    pub fn kind(&self) -> TrainerKind {
        match self {
            TrainedPredictor::BinaryClassifier(_) => TrainerKind::BinaryClassifier,
            TrainedPredictor::Regressor(_) => TrainerKind::Regressor,
        }
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        match self {
            TrainedPredictor::BinaryClassifier(m) => m.ensemble(),
            TrainedPredictor::Regressor(m) => m.ensemble(),
        }
    }

    pub fn num_features(&self) -> usize {
        self.ensemble().num_features()
    }

    pub fn predict(&self, features: ArrayView1<f64>) -> Result<Prediction> {
        self.ensemble().check_width(features.len())?;
        Ok(match self {
            TrainedPredictor::BinaryClassifier(m) => {
                let (label, probability, score) = m.predict(features);
                Prediction::Binary {
                    label,
                    probability,
                    score,
                }
            }
            TrainedPredictor::Regressor(m) => {
                let value = m.predict(features);
                Prediction::Regression { value, score: value }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_trainer_config_json_defaults() {
        let config: TrainerConfig = serde_json::from_str(r#"{"kind":"Regressor"}"#).unwrap();
        assert_eq!(config.label_column, "Label");
        assert_eq!(config.feature_column, "Features");
        assert_eq!(config.params, BoostingConfig::default());
    }

    #[test]
    fn test_train_rejects_wrong_label_values() {
        let x = Array2::<f64>::zeros((2, 1));
        let err = TrainerConfig::binary_classifier()
            .train(&x, &[Value::Number(1.0), Value::Number(0.0)])
            .unwrap_err();
        assert!(matches!(err, KolosalError::LabelTypeMismatch { .. }));
    }

    #[test]
    fn test_predict_checks_width() {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| (i + j) as f64);
        let labels: Vec<Value> = (0..20).map(|i| Value::Number(i as f64)).collect();
        let params = BoostingConfig::default()
            .with_num_trees(3)
            .with_min_datapoints_in_leaf(2);
        let model = TrainerConfig::regressor()
            .with_params(params)
            .train(&x, &labels)
            .unwrap();
        assert_eq!(model.kind(), TrainerKind::Regressor);
        assert!(model.predict(array![1.0, 2.0].view()).is_ok());
        assert!(matches!(
            model.predict(array![1.0].view()),
            Err(KolosalError::ShapeError { .. })
        ));
    }
}
