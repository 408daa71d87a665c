//! Held-out evaluation of trained models

mod metrics;

pub use metrics::{auc, binary_metrics, log_loss, regression_metrics, Metrics};

use crate::data::{Dataset, Value};
use crate::error::{KolosalError, Result};
use crate::pipeline::{feature_cell, TrainedModel};
use crate::training::{Prediction, TrainerKind};
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

/// Score every row of `dataset` and compute metrics for the model's task.
/// The model is only read.
pub fn evaluate(model: &TrainedModel, dataset: &Dataset) -> Result<Metrics> {
    if dataset.schema() != model.schema() {
        return Err(KolosalError::SchemaMismatch(
            "evaluation dataset schema differs from the model schema".to_string(),
        ));
    }
    if dataset.is_empty() {
        return Err(KolosalError::EmptyDataset(
            "cannot evaluate on zero rows".to_string(),
        ));
    }

    let start = Instant::now();
    let scored: Vec<(Value, Prediction)> = dataset
        .rows()
        .par_iter()
        .enumerate()
        .map(|(i, row)| {
            let full = model.transform_full(row)?;
            let label = full.get(model.label_column()).cloned().ok_or_else(|| {
                KolosalError::SchemaMismatch(format!(
                    "row {} is missing label column '{}'",
                    i,
                    model.label_column()
                ))
            })?;
            let features = feature_cell(&full, model.feature_column(), i)?;
            Ok((label, model.predict_features(features)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let label_error = |i: usize| KolosalError::LabelTypeMismatch {
        column: model.label_column().to_string(),
        expected: model.trainer_kind().label_kind().to_string(),
        actual: format!("{:?}", scored[i].0),
    };

    let metrics = match model.trainer_kind() {
        TrainerKind::BinaryClassifier => {
            let n = scored.len();
            let mut actual = Vec::with_capacity(n);
            let mut predicted = Vec::with_capacity(n);
            let mut probabilities = Vec::with_capacity(n);
            let mut scores = Vec::with_capacity(n);
            for (i, (label, prediction)) in scored.iter().enumerate() {
                let y = label.as_bool().ok_or_else(|| label_error(i))?;
                if let Prediction::Binary {
                    label,
                    probability,
                    score,
                } = prediction
                {
                    actual.push(y);
                    predicted.push(*label);
                    probabilities.push(*probability);
                    scores.push(*score);
                }
            }
            binary_metrics(&actual, &predicted, &probabilities, &scores)
        }
        TrainerKind::Regressor => {
            let mut actual = Vec::with_capacity(scored.len());
            let mut predicted = Vec::with_capacity(scored.len());
            for (i, (label, prediction)) in scored.iter().enumerate() {
                actual.push(label.as_number().ok_or_else(|| label_error(i))?);
                predicted.push(prediction.score());
            }
            regression_metrics(&actual, &predicted)
        }
    };

    info!(
        rows = dataset.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        metrics = ?metrics,
        "evaluated model"
    );
    Ok(metrics)
}
