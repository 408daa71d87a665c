//! Prediction configuration

use serde::{Deserialize, Serialize};

/// Configuration for batch prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Score batches on the rayon pool
    pub parallel: bool,

    /// Batches smaller than this run on the calling thread
    pub min_parallel_batch: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_parallel_batch: 64,
        }
    }
}

impl PredictionConfig {
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_min_parallel_batch(mut self, n: usize) -> Self {
        self.min_parallel_batch = n;
        self
    }

    /// Single-threaded scoring
    pub fn sequential() -> Self {
        Self::default().with_parallel(false)
    }
}
