//! Bagged ensemble of regression trees.
//!
//! Every tree is grown on a bootstrap sample of the training rows, considers
//! all features at every split and uses the MSE criterion. Tree `i` draws its
//! bootstrap sample from a ChaCha8 generator seeded with `seed + i`, so trees
//! can be fit in parallel and the forest is still reproducible.

mod tree;

use crate::error::{LearningError, Result};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;
use tree::{RegressionTree, TreeParams};

/// Hyperparameters of a [`RandomForestRegressor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    params: ForestParams,
    trees: Vec<RegressionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Fit the forest on `x` (rows are samples) and targets `y`.
    pub fn fit(&mut self, x: &Array2<f64>, y: &[f64]) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(LearningError::ShapeMismatch {
                expected: format!("y length = {n_samples}"),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(LearningError::InvalidData(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }

        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
        };
        let base_seed = self.params.seed;

        let trees: Vec<RegressionTree> = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let samples: Vec<usize> = (0..n_samples)
                    .map(|_| rng.gen_range(0..n_samples))
                    .collect();
                RegressionTree::fit(x, y, &samples, tree_params)
            })
            .collect();

        self.n_features = x.ncols();
        self.feature_importances = average_importances(&trees, self.n_features);
        self.trees = trees;

        debug!(
            trees = self.trees.len(),
            max_depth_reached = self.trees.iter().map(RegressionTree::depth).max().unwrap_or(0),
            "Fitted random forest"
        );
        Ok(self)
    }

    /// Mean prediction of all trees for every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(LearningError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(LearningError::ShapeMismatch {
                expected: format!("{} columns", self.n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let n_trees = self.trees.len() as f64;
        Ok((0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                // Sequential sum keeps the result independent of thread count.
                self.trees.iter().map(|tree| tree.predict_row(row)).sum::<f64>() / n_trees
            })
            .collect())
    }

    /// Mean decrease in impurity per feature, summing to 1 unless no tree
    /// ever split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Average the per-tree normalized importances and renormalize.
fn average_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut total = vec![0.0; n_features];
    for tree in trees {
        for (acc, &value) in total.iter_mut().zip(tree.feature_importances()) {
            *acc += value;
        }
    }

    let sum: f64 = total.iter().sum();
    if sum > 0.0 {
        for value in &mut total {
            *value /= sum;
        }
    }
    total
}
