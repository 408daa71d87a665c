//! Gradient-boosted tree trainers

use super::calibration::{sigmoid, PlattCalibrator};
use super::tree::{grow_tree, RegressionTree, TreeParams};
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Hyperparameters shared by both trainers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub num_trees: usize,
    pub num_leaves: usize,
    pub min_datapoints_in_leaf: usize,
    pub learning_rate: f64,
    pub l2_regularization: f64,
    /// Fraction of features considered per tree, in (0, 1]
    pub feature_fraction: f64,
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            num_leaves: 20,
            min_datapoints_in_leaf: 10,
            learning_rate: 0.2,
            l2_regularization: 1.0,
            feature_fraction: 1.0,
            seed: 0,
        }
    }
}

impl BoostingConfig {
    pub fn with_num_trees(mut self, n: usize) -> Self {
        self.num_trees = n;
        self
    }

    pub fn with_num_leaves(mut self, n: usize) -> Self {
        self.num_leaves = n;
        self
    }

    pub fn with_min_datapoints_in_leaf(mut self, n: usize) -> Self {
        self.min_datapoints_in_leaf = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_l2_regularization(mut self, lambda: f64) -> Self {
        self.l2_regularization = lambda;
        self
    }

    pub fn with_feature_fraction(mut self, fraction: f64) -> Self {
        self.feature_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(KolosalError::invalid_parameter(
                "num_trees",
                self.num_trees,
                "must be at least 1",
            ));
        }
        if self.num_leaves < 2 {
            return Err(KolosalError::invalid_parameter(
                "num_leaves",
                self.num_leaves,
                "must be at least 2",
            ));
        }
        if self.min_datapoints_in_leaf == 0 {
            return Err(KolosalError::invalid_parameter(
                "min_datapoints_in_leaf",
                self.min_datapoints_in_leaf,
                "must be at least 1",
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(KolosalError::invalid_parameter(
                "learning_rate",
                self.learning_rate,
                "must be a positive finite number",
            ));
        }
        if !(self.l2_regularization >= 0.0 && self.l2_regularization.is_finite()) {
            return Err(KolosalError::invalid_parameter(
                "l2_regularization",
                self.l2_regularization,
                "must be non-negative",
            ));
        }
        if !(self.feature_fraction > 0.0 && self.feature_fraction <= 1.0) {
            return Err(KolosalError::invalid_parameter(
                "feature_fraction",
                self.feature_fraction,
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            num_leaves: self.num_leaves,
            min_datapoints_in_leaf: self.min_datapoints_in_leaf,
            l2_regularization: self.l2_regularization,
            min_sum_hessian: 1e-3,
            shrinkage: self.learning_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Objective {
    SquaredError,
    LogLoss,
}

/// Additive ensemble: `base_score + sum(tree(x))`, leaf values already shrunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    base_score: f64,
    num_features: usize,
    trees: Vec<RegressionTree>,
}

impl TreeEnsemble {
    pub fn score(&self, sample: ArrayView1<f64>) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(sample)).sum::<f64>()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn check_width(&self, width: usize) -> Result<()> {
        if width != self.num_features {
            return Err(KolosalError::ShapeError {
                expected: format!("{} features", self.num_features),
                actual: format!("{} features", width),
            });
        }
        Ok(())
    }
}

fn check_inputs(x: &Array2<f64>, labels: usize) -> Result<()> {
    if x.nrows() == 0 {
        return Err(KolosalError::EmptyDataset(
            "cannot train on zero rows".to_string(),
        ));
    }
    if x.nrows() != labels {
        return Err(KolosalError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", labels),
        });
    }
    if x.ncols() == 0 {
        return Err(KolosalError::ShapeError {
            expected: "at least one feature".to_string(),
            actual: "0 features".to_string(),
        });
    }
    if let Some(((row, col), _)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(KolosalError::NonFiniteValue {
            row,
            column: format!("feature {}", col),
        });
    }
    Ok(())
}

fn boost(
    x: &Array2<f64>,
    y: &[f64],
    config: &BoostingConfig,
    objective: Objective,
) -> TreeEnsemble {
    let n = x.nrows();
    let n_features = x.ncols();
    let params = config.tree_params();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

    let base_score = match objective {
        Objective::SquaredError => y.iter().sum::<f64>() / n as f64,
        Objective::LogLoss => {
            let pos = y.iter().filter(|&&v| v > 0.5).count() as f64;
            let p = (pos / n as f64).clamp(1e-6, 1.0 - 1e-6);
            (p / (1.0 - p)).ln()
        }
    };

    let mut raw = Array1::from_elem(n, base_score);
    let mut trees = Vec::with_capacity(config.num_trees);
    let n_selected = ((n_features as f64 * config.feature_fraction).ceil() as usize).clamp(1, n_features);

    for iteration in 0..config.num_trees {
        let (gradients, hessians): (Vec<f64>, Vec<f64>) = match objective {
            Objective::SquaredError => raw
                .iter()
                .zip(y)
                .map(|(&p, &yi)| (p - yi, 1.0))
                .unzip(),
            Objective::LogLoss => raw
                .iter()
                .zip(y)
                .map(|(&r, &yi)| {
                    let p = sigmoid(r);
                    (p - yi, (p * (1.0 - p)).max(1e-16))
                })
                .unzip(),
        };

        let features: Vec<usize> = if n_selected < n_features {
            let mut all: Vec<usize> = (0..n_features).collect();
            all.shuffle(&mut rng);
            all.truncate(n_selected);
            all.sort_unstable();
            all
        } else {
            (0..n_features).collect()
        };

        let tree = grow_tree(x, &gradients, &hessians, &features, &params);
        for (i, row) in x.rows().into_iter().enumerate() {
            raw[i] += tree.predict(row);
        }
        debug!(iteration, leaves = tree.num_leaves(), "grew tree");
        trees.push(tree);
    }

    TreeEnsemble {
        base_score,
        num_features: n_features,
        trees,
    }
}

/// Boosted trees minimizing log-loss, with Platt-calibrated probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryClassifier {
    config: BoostingConfig,
}

impl BinaryClassifier {
    pub fn new(config: BoostingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    pub fn fit(&self, x: &Array2<f64>, labels: &[bool]) -> Result<BinaryClassifierModel> {
        check_inputs(x, labels.len())?;
        let positives = labels.iter().filter(|&&l| l).count();
        if positives == 0 || positives == labels.len() {
            return Err(KolosalError::ConstantLabel(format!(
                "all {} labels are {}",
                labels.len(),
                positives > 0
            )));
        }

        let start = Instant::now();
        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let ensemble = boost(x, &y, &self.config, Objective::LogLoss);

        let scores: Array1<f64> = x.rows().into_iter().map(|r| ensemble.score(r)).collect();
        let calibrator = PlattCalibrator::fit(scores.view(), labels);

        info!(
            rows = x.nrows(),
            features = x.ncols(),
            trees = ensemble.num_trees(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "trained binary classifier"
        );
        Ok(BinaryClassifierModel {
            ensemble,
            calibrator,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryClassifierModel {
    ensemble: TreeEnsemble,
    calibrator: PlattCalibrator,
}

impl BinaryClassifierModel {
    /// Returns `(label, probability, score)`
    pub fn predict(&self, features: ArrayView1<f64>) -> (bool, f64, f64) {
        let score = self.ensemble.score(features);
        let probability = self.calibrator.probability(score);
        (probability >= 0.5, probability, score)
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }

    pub fn calibrator(&self) -> &PlattCalibrator {
        &self.calibrator
    }
}

/// Boosted trees minimizing squared error
#[derive(Debug, Clone, PartialEq)]
pub struct Regressor {
    config: BoostingConfig,
}

impl Regressor {
    pub fn new(config: BoostingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    pub fn fit(&self, x: &Array2<f64>, y: &[f64]) -> Result<RegressorModel> {
        check_inputs(x, y.len())?;
        if let Some(row) = y.iter().position(|v| !v.is_finite()) {
            return Err(KolosalError::NonFiniteValue {
                row,
                column: "label".to_string(),
            });
        }
        let first = y[0];
        if y.iter().all(|&v| v == first) {
            return Err(KolosalError::ConstantLabel(format!(
                "all {} labels equal {}",
                y.len(),
                first
            )));
        }

        let start = Instant::now();
        let ensemble = boost(x, y, &self.config, Objective::SquaredError);
        info!(
            rows = x.nrows(),
            features = x.ncols(),
            trees = ensemble.num_trees(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "trained regressor"
        );
        Ok(RegressorModel { ensemble })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressorModel {
    ensemble: TreeEnsemble,
}

impl RegressorModel {
    pub fn predict(&self, features: ArrayView1<f64>) -> f64 {
        self.ensemble.score(features)
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }
}
