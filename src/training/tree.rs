//! Regression trees grown leaf-wise (best-first) on gradient statistics

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub num_leaves: usize,
    pub min_datapoints_in_leaf: usize,
    pub l2_regularization: f64,
    pub min_sum_hessian: f64,
    /// Multiplied into every leaf value
    pub shrinkage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Flat arena of nodes; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Largest feature index any split reads
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf { .. } => None,
            })
            .max()
    }
}

fn leaf_weight(g: f64, h: f64, lambda: f64) -> f64 {
    -g / (h + lambda)
}

fn score(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn best_split_for_feature(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    feature: usize,
    params: &TreeParams,
) -> Option<Candidate> {
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature]])).collect();
    // Stable sort on (value, row) keeps ties in a fixed order
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let total_g: f64 = sorted.iter().map(|&(i, _)| gradients[i]).sum();
    let total_h: f64 = sorted.iter().map(|&(i, _)| hessians[i]).sum();
    let parent = score(total_g, total_h, params.l2_regularization);

    let min_leaf = params.min_datapoints_in_leaf;
    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best: Option<(f64, f64, usize)> = None;

    for pos in 0..sorted.len().saturating_sub(1) {
        let (row, value) = sorted[pos];
        left_g += gradients[row];
        left_h += hessians[row];

        let left_count = pos + 1;
        let right_count = sorted.len() - left_count;
        if left_count < min_leaf {
            continue;
        }
        if right_count < min_leaf {
            break;
        }
        let next_value = sorted[pos + 1].1;
        if value == next_value {
            continue;
        }

        let right_g = total_g - left_g;
        let right_h = total_h - left_h;
        if left_h < params.min_sum_hessian || right_h < params.min_sum_hessian {
            continue;
        }

        let gain = score(left_g, left_h, params.l2_regularization)
            + score(right_g, right_h, params.l2_regularization)
            - parent;
        if best.map_or(true, |(g, _, _)| gain > g) {
            best = Some((gain, value + (next_value - value) / 2.0, left_count));
        }
    }

    let (gain, threshold, split_at) = best?;
    if gain <= 0.0 || !gain.is_finite() {
        return None;
    }
    Some(Candidate {
        feature,
        threshold,
        gain,
        left: sorted[..split_at].iter().map(|&(i, _)| i).collect(),
        right: sorted[split_at..].iter().map(|&(i, _)| i).collect(),
    })
}

fn best_split(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    features: &[usize],
    params: &TreeParams,
) -> Option<Candidate> {
    if indices.len() < params.min_datapoints_in_leaf * 2 {
        return None;
    }
    // Collect preserves feature order, so the fold below picks the lowest
    // feature index among equal gains no matter how rayon schedules work.
    let candidates: Vec<Option<Candidate>> = features
        .par_iter()
        .map(|&f| best_split_for_feature(x, gradients, hessians, indices, f, params))
        .collect();

    candidates.into_iter().flatten().fold(None, |best, c| match best {
        Some(b) if b.gain >= c.gain => Some(b),
        _ => Some(c),
    })
}

struct PendingSplit {
    gain: f64,
    node: usize,
    candidate: Candidate,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingSplit {}

impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingSplit {
    // Max-heap on gain; earlier nodes win ties
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| other.node.cmp(&self.node))
    }
}

enum Slot {
    Leaf(Vec<usize>),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Grow one tree on the given gradient/hessian statistics, considering only `features`
pub(crate) fn grow_tree(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    features: &[usize],
    params: &TreeParams,
) -> RegressionTree {
    let all: Vec<usize> = (0..x.nrows()).collect();
    let mut slots = Vec::with_capacity(params.num_leaves * 2);
    let mut heap = BinaryHeap::new();

    if let Some(candidate) = best_split(x, gradients, hessians, &all, features, params) {
        heap.push(PendingSplit {
            gain: candidate.gain,
            node: 0,
            candidate,
        });
    }
    slots.push(Slot::Leaf(all));

    let mut leaves = 1;
    while leaves < params.num_leaves {
        let Some(PendingSplit { node, candidate, .. }) = heap.pop() else {
            break;
        };

        let left_id = slots.len();
        let right_id = left_id + 1;
        for (child_id, child_rows) in [(left_id, &candidate.left), (right_id, &candidate.right)] {
            if let Some(next) = best_split(x, gradients, hessians, child_rows, features, params) {
                heap.push(PendingSplit {
                    gain: next.gain,
                    node: child_id,
                    candidate: next,
                });
            }
        }

        slots[node] = Slot::Split {
            feature: candidate.feature,
            threshold: candidate.threshold,
            left: left_id,
            right: right_id,
        };
        slots.push(Slot::Leaf(candidate.left));
        slots.push(Slot::Leaf(candidate.right));
        leaves += 1;
    }

    let nodes = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Leaf(rows) => {
                let g: f64 = rows.iter().map(|&i| gradients[i]).sum();
                let h: f64 = rows.iter().map(|&i| hessians[i]).sum();
                TreeNode::Leaf {
                    value: params.shrinkage * leaf_weight(g, h, params.l2_regularization),
                }
            }
            Slot::Split {
                feature,
                threshold,
                left,
                right,
            } => TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            },
        })
        .collect();

    RegressionTree { nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn params(num_leaves: usize, min_leaf: usize) -> TreeParams {
        TreeParams {
            num_leaves,
            min_datapoints_in_leaf: min_leaf,
            l2_regularization: 0.0,
            min_sum_hessian: 1e-3,
            shrinkage: 1.0,
        }
    }

    #[test]
    fn test_single_split_separates_targets() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = [1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        // Squared error at prediction 0: gradient = -y, hessian = 1
        let g: Vec<f64> = y.iter().map(|v| -v).collect();
        let h = vec![1.0; 6];
        let tree = grow_tree(&x, &g, &h, &[0], &params(2, 1));

        assert_eq!(tree.num_leaves(), 2);
        assert!((tree.predict(array![2.0].view()) - 1.0).abs() < 1e-12);
        assert!((tree.predict(array![11.0].view()) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_leaf_budget_respected() {
        let x = Array2::from_shape_fn((64, 2), |(i, j)| (i * (j + 1)) as f64);
        let g: Vec<f64> = (0..64).map(|i| ((i * 7) % 13) as f64 - 6.0).collect();
        let h = vec![1.0; 64];
        let tree = grow_tree(&x, &g, &h, &[0, 1], &params(5, 2));
        assert!(tree.num_leaves() <= 5);
        assert!(tree.num_leaves() >= 2);
    }

    #[test]
    fn test_min_leaf_blocks_split() {
        let x = array![[1.0], [2.0], [3.0]];
        let g = [-1.0, -1.0, 5.0];
        let h = [1.0; 3];
        let tree = grow_tree(&x, &g, &h, &[0], &params(4, 2));
        assert_eq!(tree.num_leaves(), 1);
    }

    #[test]
    fn test_constant_feature_never_splits() {
        let x = array![[4.0], [4.0], [4.0], [4.0]];
        let g = [-1.0, 1.0, -1.0, 1.0];
        let h = [1.0; 4];
        let tree = grow_tree(&x, &g, &h, &[0], &params(4, 1));
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.max_feature(), None);
    }
}
