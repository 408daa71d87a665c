//! Kolosal Pipeline - supervised-learning pipelines in Rust
//!
//! Load a labeled delimited dataset against a declared schema, run it through
//! an ordered list of feature transforms, fit a gradient-boosted tree model,
//! evaluate it, persist it as one portable artifact and serve predictions.
//!
//! # Modules
//!
//! - [`data`] - Schemas, typed rows and the delimited-text loader
//! - [`feature_engineering`] - Text featurization, one-hot encoding, column plumbing
//! - [`training`] - Leaf-wise boosted trees, binary classifier and regressor
//! - [`pipeline`] - Pipeline definitions, JSON configs and trained models
//! - [`evaluation`] - Classification and regression metrics
//! - [`export`] - Versioned, checksummed model artifacts
//! - [`inference`] - Single and batch prediction
//! - [`lifecycle`] - Train / evaluate / save / load / predict entry points
//! - [`cli`] - Command-line interface and built-in tasks
//!
//! # Example
//!
//! ```no_run
//! use kolosal_pipeline::prelude::*;
//!
//! # fn main() -> kolosal_pipeline::error::Result<()> {
//! let schema = Schema::new(vec![
//!     Column::boolean("Label", 0),
//!     Column::text("SentimentText", 1),
//! ])?;
//! let config = PipelineConfig::new(schema, TrainerConfig::binary_classifier())
//!     .with_format(TextFormat::tsv())
//!     .with_transform(TextFeaturizer::new("SentimentText", "Features"));
//!
//! let model = lifecycle::train("wikipedia-detox-train.tsv", &config)?;
//! lifecycle::save(&model, "sentiment.kplm")?;
//!
//! let model = lifecycle::load("sentiment.kplm")?;
//! let record = Row::new().with("SentimentText", "This is a very rude movie");
//! println!("{:?}", lifecycle::predict_one(&model, &record)?.output);
//! # Ok(())
//! # }
//! ```

pub mod error;

pub mod data;
pub mod feature_engineering;
pub mod training;
pub mod pipeline;
pub mod evaluation;
pub mod export;
pub mod inference;
pub mod lifecycle;

pub mod cli;

pub use error::{KolosalError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::data::{Column, ColumnKind, Dataset, DatasetLoader, Row, Schema, TextFormat, Value};
    pub use crate::error::{KolosalError, Result};
    pub use crate::evaluation::{evaluate, Metrics};
    pub use crate::feature_engineering::{
        CategoricalEncoder, ColumnConcatenator, ColumnCopier, OovPolicy, TextFeaturizer,
        TransformStep,
    };
    pub use crate::inference::{Prediction, PredictionConfig, PredictionEngine, PredictionRecord};
    pub use crate::lifecycle;
    pub use crate::pipeline::{ModelState, Pipeline, PipelineConfig, TrainedModel};
    pub use crate::training::{BoostingConfig, TrainerConfig, TrainerKind};
}
