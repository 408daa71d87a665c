//! Inference module
//!
//! Single-record and order-preserving batch prediction over a trained model
//! shared through `Arc`.

mod config;
mod engine;

pub use crate::training::Prediction;
pub use config::PredictionConfig;
pub use engine::{PredictionEngine, PredictionRecord, PredictionStats};
