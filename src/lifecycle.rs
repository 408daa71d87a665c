//! Public model lifecycle: train, evaluate, save, load, predict

use crate::data::{DatasetLoader, Row};
use crate::error::Result;
use crate::evaluation::{self, Metrics};
use crate::export;
use crate::inference::PredictionRecord;
use crate::pipeline::{PipelineConfig, TrainedModel};
use rayon::prelude::*;
use std::path::Path;

/// Load the dataset at `path` with the config's schema and layout, then fit
pub fn train(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<TrainedModel> {
    let pipeline = config.build()?;
    let dataset = config.loader().load(path)?;
    pipeline.fit(&dataset)
}

/// Load held-out data using the schema embedded in the model and score it
pub fn evaluate(model: &TrainedModel, test_path: impl AsRef<Path>) -> Result<Metrics> {
    let dataset = DatasetLoader::new(model.schema().clone())
        .with_format(model.format())
        .load(test_path)?;
    evaluation::evaluate(model, &dataset)
}

pub fn save(model: &TrainedModel, path: impl AsRef<Path>) -> Result<()> {
    export::save(model, path)
}

pub fn load(path: impl AsRef<Path>) -> Result<TrainedModel> {
    export::load(path)
}

pub fn predict_one(model: &TrainedModel, record: &Row) -> Result<PredictionRecord> {
    Ok(PredictionRecord {
        input: record.clone(),
        output: model.predict(record)?,
    })
}

/// Order-preserving batch prediction; empty in, empty out
pub fn predict_batch(model: &TrainedModel, records: &[Row]) -> Result<Vec<PredictionRecord>> {
    records
        .par_iter()
        .enumerate()
        .map(|(i, record)| {
            Ok(PredictionRecord {
                input: record.clone(),
                output: model.predict_at(record, i)?,
            })
        })
        .collect()
}
