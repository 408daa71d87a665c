//! Pipeline composition
//!
//! A [`Pipeline`] is an unfit, reusable declaration: schema, ordered transforms
//! and a trainer. All wiring is checked when it is built. [`Pipeline::fit`]
//! produces an independent, immutable [`TrainedModel`]; only the trained model
//! can transform or predict.

mod config;
mod model;

pub use config::PipelineConfig;
pub use model::{ModelState, TrainedModel};

use crate::data::{ColumnKind, Dataset, Row, Schema, TextFormat, Value};
use crate::error::{KolosalError, Result};
use crate::feature_engineering::{validate_steps, FittedStep, TransformStep};
use crate::training::TrainerConfig;
use ndarray::Array2;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info};

/// Unfit pipeline definition
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    schema: Schema,
    format: TextFormat,
    transforms: Vec<TransformStep>,
    trainer: TrainerConfig,
    /// Indices of the steps the feature column depends on
    feature_steps: Vec<usize>,
    /// Raw schema columns the feature column depends on
    feature_inputs: Vec<String>,
}

impl Pipeline {
    /// Validate transform wiring and the label type, then build the definition
    pub fn new(
        schema: Schema,
        transforms: Vec<TransformStep>,
        trainer: TrainerConfig,
    ) -> Result<Self> {
        trainer.params.validate()?;
        let layout = validate_steps(&schema, &transforms)?;

        let label_kind = layout.get(&trainer.label_column).copied().ok_or_else(|| {
            KolosalError::SchemaMismatch(format!(
                "label column '{}' is neither a schema column nor produced by a transform",
                trainer.label_column
            ))
        })?;
        let expected = trainer.kind.label_kind();
        if label_kind != expected {
            return Err(KolosalError::LabelTypeMismatch {
                column: trainer.label_column.clone(),
                expected: expected.to_string(),
                actual: label_kind.to_string(),
            });
        }

        match layout.get(&trainer.feature_column) {
            Some(ColumnKind::Vector) | Some(ColumnKind::Numeric) => {}
            Some(other) => {
                return Err(KolosalError::SchemaMismatch(format!(
                    "feature column '{}' is {}, trainer needs a numeric vector",
                    trainer.feature_column, other
                )))
            }
            None => {
                return Err(KolosalError::SchemaMismatch(format!(
                    "feature column '{}' is neither a schema column nor produced by a transform",
                    trainer.feature_column
                )))
            }
        }

        let (feature_steps, feature_inputs) =
            dependencies(&transforms, &trainer.feature_column);
        if feature_inputs.contains(&trainer.label_column) {
            return Err(KolosalError::SchemaMismatch(format!(
                "feature column '{}' depends on the label column '{}'",
                trainer.feature_column, trainer.label_column
            )));
        }

        Ok(Self {
            schema,
            format: TextFormat::default(),
            transforms,
            trainer,
            feature_steps,
            feature_inputs,
        })
    }

    /// Record the text layout the model will carry into its artifact
    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn format(&self) -> TextFormat {
        self.format
    }

    pub fn transforms(&self) -> &[TransformStep] {
        &self.transforms
    }

    pub fn trainer(&self) -> &TrainerConfig {
        &self.trainer
    }

    /// Raw columns a record must carry at prediction time
    pub fn feature_inputs(&self) -> &[String] {
        &self.feature_inputs
    }

    /// Fit every transform in order, then the trainer. The definition is left untouched.
    pub fn fit(&self, dataset: &Dataset) -> Result<TrainedModel> {
        if dataset.schema() != &self.schema {
            return Err(KolosalError::SchemaMismatch(
                "dataset schema differs from the pipeline schema".to_string(),
            ));
        }
        if dataset.is_empty() {
            return Err(KolosalError::EmptyDataset(
                "cannot fit a pipeline on zero rows".to_string(),
            ));
        }

        let start = Instant::now();
        info!(
            rows = dataset.len(),
            transforms = self.transforms.len(),
            trainer = ?self.trainer.kind,
            "fitting pipeline"
        );

        let mut rows: Vec<Row> = dataset.rows().to_vec();
        let mut fitted = Vec::with_capacity(self.transforms.len());
        for (i, step) in self.transforms.iter().enumerate() {
            let step_start = Instant::now();
            let state = step.fit(&rows)?;
            rows.par_iter_mut().try_for_each(|row| state.apply(row))?;
            debug!(
                step = i,
                name = step.name(),
                output = step.output(),
                elapsed_ms = step_start.elapsed().as_millis() as u64,
                "fitted transform"
            );
            fitted.push(state);
        }

        let x = feature_matrix(&rows, &self.trainer.feature_column)?;
        let labels = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.get(&self.trainer.label_column).cloned().ok_or_else(|| {
                    KolosalError::SchemaMismatch(format!(
                        "row {} is missing label column '{}'",
                        i, self.trainer.label_column
                    ))
                })
            })
            .collect::<Result<Vec<Value>>>()?;

        let predictor = self.trainer.train(&x, &labels)?;

        info!(
            rows = x.nrows(),
            features = x.ncols(),
            trees = predictor.ensemble().num_trees(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pipeline fitted"
        );

        Ok(TrainedModel::new(
            self.schema.clone(),
            self.format,
            fitted,
            self.feature_steps.clone(),
            self.feature_inputs.clone(),
            self.trainer.label_column.clone(),
            self.trainer.feature_column.clone(),
            predictor,
        ))
    }
}

/// Walk the steps backwards from `target`, collecting the steps it needs and the
/// raw columns left over once every produced column is accounted for.
fn dependencies(steps: &[TransformStep], target: &str) -> (Vec<usize>, Vec<String>) {
    let mut needed: BTreeSet<String> = BTreeSet::new();
    needed.insert(target.to_string());
    let mut used = Vec::new();

    for (i, step) in steps.iter().enumerate().rev() {
        if needed.remove(step.output()) {
            used.push(i);
            needed.extend(step.inputs().into_iter().map(str::to_string));
        }
    }
    used.reverse();
    (used, needed.into_iter().collect())
}

/// Dense matrix from the feature cells of transformed rows
pub(crate) fn feature_matrix(rows: &[Row], column: &str) -> Result<Array2<f64>> {
    let mut width = None;
    let mut flat = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let features = feature_cell(row, column, i)?;
        match width {
            None => width = Some(features.len()),
            Some(w) if w != features.len() => {
                return Err(KolosalError::ShapeError {
                    expected: format!("{} features", w),
                    actual: format!("{} features at row {}", features.len(), i),
                })
            }
            Some(_) => {}
        }
        flat.extend_from_slice(features);
    }
    let width = width.unwrap_or(0);
    Ok(Array2::from_shape_vec((rows.len(), width), flat)?)
}

pub(crate) fn feature_cell<'a>(row: &'a Row, column: &str, index: usize) -> Result<&'a [f64]> {
    match row.get(column) {
        Some(Value::Vector(v)) => Ok(v),
        Some(Value::Number(n)) => Ok(std::slice::from_ref(n)),
        Some(other) => Err(KolosalError::SchemaMismatch(format!(
            "row {}: feature column '{}' holds {:?}",
            index, column, other
        ))),
        None => Err(KolosalError::SchemaMismatch(format!(
            "row {} is missing feature column '{}'",
            index, column
        ))),
    }
}

pub(crate) fn apply_steps(steps: &[FittedStep], order: &[usize], row: &mut Row) -> Result<()> {
    for &i in order {
        steps[i].apply(row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::feature_engineering::{CategoricalEncoder, ColumnConcatenator, ColumnCopier};
    use crate::training::BoostingConfig;

    fn taxi_schema() -> Schema {
        Schema::new(vec![
            Column::categorical("VendorId", 0),
            Column::numeric("TripDistance", 1),
            Column::numeric("FareAmount", 2),
        ])
        .unwrap()
    }

    fn taxi_steps() -> Vec<TransformStep> {
        vec![
            ColumnCopier::new("FareAmount", "Label").into(),
            CategoricalEncoder::new("VendorId", "VendorIdEncoded").into(),
            ColumnConcatenator::new(&["VendorIdEncoded", "TripDistance"], "Features").into(),
        ]
    }

    fn taxi_rows(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                let distance = 0.5 + i as f64 * 0.25;
                let vendor = if i % 2 == 0 { "VTS" } else { "CMT" };
                Row::new()
                    .with("VendorId", vendor)
                    .with("TripDistance", distance)
                    .with("FareAmount", 2.5 + 2.5 * distance)
            })
            .collect();
        Dataset::new(taxi_schema(), rows).unwrap()
    }

    fn small_regressor() -> TrainerConfig {
        TrainerConfig::regressor().with_params(
            BoostingConfig::default()
                .with_num_trees(20)
                .with_num_leaves(4)
                .with_min_datapoints_in_leaf(2),
        )
    }

    #[test]
    fn test_label_only_steps_skipped_for_features() {
        let pipeline = Pipeline::new(taxi_schema(), taxi_steps(), small_regressor()).unwrap();
        assert_eq!(pipeline.feature_steps, vec![1, 2]);
        assert_eq!(pipeline.feature_inputs(), &["TripDistance", "VendorId"]);
    }

    #[test]
    fn test_label_type_mismatch_at_construction() {
        let err = Pipeline::new(
            taxi_schema(),
            taxi_steps(),
            TrainerConfig::binary_classifier(),
        )
        .unwrap_err();
        assert!(matches!(err, KolosalError::LabelTypeMismatch { .. }));
    }

    #[test]
    fn test_missing_feature_column() {
        let steps = vec![ColumnCopier::new("FareAmount", "Label").into()];
        let err = Pipeline::new(taxi_schema(), steps, small_regressor()).unwrap_err();
        assert!(matches!(err, KolosalError::SchemaMismatch(_)));
    }

    #[test]
    fn test_invalid_hyperparameter_at_construction() {
        let trainer = TrainerConfig::regressor()
            .with_params(BoostingConfig::default().with_num_trees(0));
        let err = Pipeline::new(taxi_schema(), taxi_steps(), trainer).unwrap_err();
        assert!(matches!(err, KolosalError::InvalidParameter { .. }));
    }

    #[test]
    fn test_fit_returns_independent_models() {
        let pipeline = Pipeline::new(taxi_schema(), taxi_steps(), small_regressor()).unwrap();
        let before = pipeline.clone();
        let data = taxi_rows(40);

        let a = pipeline.fit(&data).unwrap();
        let b = pipeline.fit(&data).unwrap();
        assert_eq!(pipeline, before);
        assert_eq!(a.state(), ModelState::Fit);
        assert_eq!(a.num_features(), 3);

        let record = Row::new().with("VendorId", "VTS").with("TripDistance", 4.0);
        assert_eq!(a.predict(&record).unwrap(), b.predict(&record).unwrap());
    }

    #[test]
    fn test_fit_rejects_empty_and_foreign_datasets() {
        let pipeline = Pipeline::new(taxi_schema(), taxi_steps(), small_regressor()).unwrap();
        let empty = Dataset::new(taxi_schema(), Vec::new()).unwrap();
        assert!(matches!(
            pipeline.fit(&empty),
            Err(KolosalError::EmptyDataset(_))
        ));

        let other = Schema::new(vec![Column::numeric("x", 0)]).unwrap();
        let foreign = Dataset::new(other, vec![Row::new().with("x", 1.0)]).unwrap();
        assert!(matches!(
            pipeline.fit(&foreign),
            Err(KolosalError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_feature_matrix_width_mismatch() {
        let rows = vec![
            Row::new().with("Features", vec![1.0, 2.0]),
            Row::new().with("Features", vec![1.0]),
        ];
        assert!(matches!(
            feature_matrix(&rows, "Features"),
            Err(KolosalError::ShapeError { .. })
        ));
    }
}
