//! Metric computation over scored predictions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Evaluation result for one held-out dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metrics {
    Binary {
        accuracy: f64,
        auc: f64,
        f1_score: f64,
        precision: f64,
        recall: f64,
        log_loss: f64,
    },
    Regression {
        r_squared: f64,
        rms: f64,
        mean_absolute_error: f64,
        mean_squared_error: f64,
    },
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metrics::Binary {
                accuracy,
                auc,
                f1_score,
                precision,
                recall,
                log_loss,
            } => {
                writeln!(f, "Accuracy:  {:.4}", accuracy)?;
                writeln!(f, "AUC:       {:.4}", auc)?;
                writeln!(f, "F1 score:  {:.4}", f1_score)?;
                writeln!(f, "Precision: {:.4}", precision)?;
                writeln!(f, "Recall:    {:.4}", recall)?;
                write!(f, "Log-loss:  {:.4}", log_loss)
            }
            Metrics::Regression {
                r_squared,
                rms,
                mean_absolute_error,
                mean_squared_error,
            } => {
                writeln!(f, "R-squared: {:.4}", r_squared)?;
                writeln!(f, "RMS loss:  {:.4}", rms)?;
                writeln!(f, "L1 loss:   {:.4}", mean_absolute_error)?;
                write!(f, "L2 loss:   {:.4}", mean_squared_error)
            }
        }
    }
}

/// Area under the ROC curve from the rank-sum statistic.
/// Tied scores share their average rank, so each tied pair counts one half.
/// Returns 0.5 when one class is absent.
pub fn auc(labels: &[bool], scores: &[f64]) -> f64 {
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group covers start+1..=end
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| labels[i]).count();
        positive_rank_sum += avg_rank * positives as f64;
        start = end;
    }

    let p = n_pos as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n_neg as f64)
}

pub fn log_loss(labels: &[bool], probabilities: &[f64]) -> f64 {
    const EPS: f64 = 1e-15;
    let total: f64 = labels
        .iter()
        .zip(probabilities)
        .map(|(&y, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            if y {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / labels.len().max(1) as f64
}

/// Classification metrics from parallel slices: actual labels, predicted labels,
/// probabilities and raw scores
pub fn binary_metrics(actual: &[bool], predicted: &[bool], probabilities: &[f64], scores: &[f64]) -> Metrics {
    let n = actual.len();
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    let mut correct = 0usize;
    for (&a, &p) in actual.iter().zip(predicted) {
        match (a, p) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
        if a == p {
            correct += 1;
        }
    }

    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };
    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        0.0
    };
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Metrics::Binary {
        accuracy: correct as f64 / n.max(1) as f64,
        auc: auc(actual, scores),
        f1_score,
        precision,
        recall,
        log_loss: log_loss(actual, probabilities),
    }
}

/// Regression metrics. With zero label variance R² is 1 for a perfect fit, else 0.
pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> Metrics {
    let n = actual.len().max(1) as f64;
    let mean = actual.iter().sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut abs_err = 0.0;
    for (&y, &y_hat) in actual.iter().zip(predicted) {
        let residual = y - y_hat;
        ss_res += residual * residual;
        ss_tot += (y - mean) * (y - mean);
        abs_err += residual.abs();
    }

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };
    let mse = ss_res / n;

    Metrics::Regression {
        r_squared,
        rms: mse.sqrt(),
        mean_absolute_error: abs_err / n,
        mean_squared_error: mse,
    }
}
