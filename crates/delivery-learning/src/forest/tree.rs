//! CART regression tree with the MSE criterion.

use ndarray::{Array2, ArrayView1};

/// Tree node.
#[derive(Debug, Clone)]
pub(crate) enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Growth limits shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct RegressionTree {
    root: TreeNode,
    /// Impurity decrease per feature, normalized to sum to 1 (all zero for a
    /// tree that never split).
    feature_importances: Vec<f64>,
}

/// Best split found for a node.
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit on the rows of `x` listed in `samples`; repeated indices count as
    /// repeated samples, which is how bootstrap draws are passed in.
    pub fn fit(x: &Array2<f64>, y: &[f64], samples: &[usize], params: TreeParams) -> Self {
        let mut importances = vec![0.0; x.ncols()];
        let root = build(x, y, samples.to_vec(), 0, params, &mut importances);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        Self {
            root,
            feature_importances: importances,
        }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        node_depth(&self.root)
    }
}

fn build(
    x: &Array2<f64>,
    y: &[f64],
    samples: Vec<usize>,
    depth: usize,
    params: TreeParams,
    importances: &mut [f64],
) -> TreeNode {
    let n = samples.len();
    let (sum, sq_sum) = samples
        .iter()
        .fold((0.0, 0.0), |(s, sq), &i| (s + y[i], sq + y[i] * y[i]));
    let value = if n == 0 { 0.0 } else { sum / n as f64 };

    let should_stop = n < params.min_samples_split
        || n < 2 * params.min_samples_leaf
        || depth >= params.max_depth
        || is_pure(y, &samples);
    if should_stop {
        return TreeNode::Leaf { value };
    }

    let parent_impurity = mse(n, sum, sq_sum);
    let Some(best) = find_best_split(x, y, &samples, parent_impurity, params.min_samples_leaf)
    else {
        return TreeNode::Leaf { value };
    };

    importances[best.feature_idx] += n as f64 * best.gain;

    let (left, right): (Vec<usize>, Vec<usize>) = samples
        .into_iter()
        .partition(|&i| x[[i, best.feature_idx]] <= best.threshold);

    TreeNode::Split {
        feature_idx: best.feature_idx,
        threshold: best.threshold,
        left: Box::new(build(x, y, left, depth + 1, params, importances)),
        right: Box::new(build(x, y, right, depth + 1, params, importances)),
    }
}

/// Scan every feature with a sorted sweep and keep the largest impurity
/// decrease. Ties keep the lowest feature index.
fn find_best_split(
    x: &Array2<f64>,
    y: &[f64],
    samples: &[usize],
    parent_impurity: f64,
    min_samples_leaf: usize,
) -> Option<SplitCandidate> {
    let n = samples.len();
    let total_sum: f64 = samples.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = samples.iter().map(|&i| y[i] * y[i]).sum();

    let mut best: Option<SplitCandidate> = None;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for feature_idx in 0..x.ncols() {
        pairs.clear();
        pairs.extend(samples.iter().map(|&i| (x[[i, feature_idx]], y[i])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for split_at in 1..n {
            let (value, target) = pairs[split_at - 1];
            left_sum += target;
            left_sq += target * target;

            let next_value = pairs[split_at].0;
            if next_value <= value {
                continue;
            }
            let left_count = split_at;
            let right_count = n - split_at;
            if left_count < min_samples_leaf || right_count < min_samples_leaf {
                continue;
            }

            let weighted = (left_count as f64 * mse(left_count, left_sum, left_sq)
                + right_count as f64
                    * mse(right_count, total_sum - left_sum, total_sq - left_sq))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: (value + next_value) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

/// Variance from running sums, clamped at zero against rounding.
fn mse(count: usize, sum: f64, sq_sum: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    (sq_sum / n - (sum / n).powi(2)).max(0.0)
}

fn is_pure(y: &[f64], samples: &[usize]) -> bool {
    match samples.first() {
        None => true,
        Some(&first) => samples.iter().all(|&i| (y[i] - y[first]).abs() < 1e-10),
    }
}
