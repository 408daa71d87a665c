//! Prediction engine over a shared trained model

use super::config::PredictionConfig;
use crate::data::Row;
use crate::error::Result;
use crate::pipeline::TrainedModel;
use crate::training::Prediction;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// An input record paired with the model output for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub input: Row,
    pub output: Prediction,
}

/// Snapshot of engine counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionStats {
    pub total_predictions: u64,
    pub total_requests: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
}

/// Scores records against one immutable model. Cheap to share: the model sits
/// behind an `Arc` and the counters are atomics.
#[derive(Debug)]
pub struct PredictionEngine {
    model: Arc<TrainedModel>,
    config: PredictionConfig,
    total_predictions: AtomicU64,
    total_requests: AtomicU64,
    error_count: AtomicU64,
    total_latency_ns: AtomicU64,
}

impl PredictionEngine {
    pub fn new(model: Arc<TrainedModel>) -> Self {
        Self::with_config(model, PredictionConfig::default())
    }

    pub fn with_config(model: Arc<TrainedModel>, config: PredictionConfig) -> Self {
        Self {
            model,
            config,
            total_predictions: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            total_latency_ns: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &Arc<TrainedModel> {
        &self.model
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    pub fn predict_one(&self, record: &Row) -> Result<PredictionRecord> {
        let start = Instant::now();
        let result = self.model.predict(record).map(|output| PredictionRecord {
            input: record.clone(),
            output,
        });
        self.record(start, 1, result.is_err());
        result
    }

    /// Score `records` in order. The output has one entry per input, same positions.
    pub fn predict_batch(&self, records: &[Row]) -> Result<Vec<PredictionRecord>> {
        let start = Instant::now();
        let score = |(i, record): (usize, &Row)| {
            self.model
                .predict_at(record, i)
                .map(|output| PredictionRecord {
                    input: record.clone(),
                    output,
                })
        };

        let parallel = self.config.parallel && records.len() >= self.config.min_parallel_batch;
        let result: Result<Vec<PredictionRecord>> = if parallel {
            records.par_iter().enumerate().map(score).collect()
        } else {
            records.iter().enumerate().map(score).collect()
        };

        debug!(
            rows = records.len(),
            parallel,
            elapsed_us = start.elapsed().as_micros() as u64,
            "scored batch"
        );
        self.record(start, records.len() as u64, result.is_err());
        result
    }

    pub fn stats(&self) -> PredictionStats {
        let total_predictions = self.total_predictions.load(Ordering::Relaxed);
        let total_latency_ns = self.total_latency_ns.load(Ordering::Relaxed);
        PredictionStats {
            total_predictions,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            avg_latency_ms: if total_predictions > 0 {
                total_latency_ns as f64 / total_predictions as f64 / 1e6
            } else {
                0.0
            },
        }
    }

    fn record(&self, start: Instant, items: u64, failed: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.total_predictions.fetch_add(items, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }
}
