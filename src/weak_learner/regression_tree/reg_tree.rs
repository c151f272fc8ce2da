use fixedbitset::FixedBitSet;
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::{Error, Result};
use crate::common::{DEFAULT_LAMBDA_L2, NUMERIC_TOLERANCE};
use super::bin::{Bin, Bins, GradientHessian};
use super::node::Node;
use super::split_rule::{LR, Splitter};


/// A weighted least-squares regression tree
/// over the columns of a feature matrix.
///
/// The tree is grown greedily with histogram binning:
/// each feature is cut into equal-width bins and
/// the split that maximizes
/// `G_l^2 / (H_l + lambda) + G_r^2 / (H_r + lambda)`
/// is chosen at every node,
/// where `G = -sum w_i y_i` and `H = sum w_i`.
/// A leaf predicts `-G / (H + lambda)`,
/// the regularized weighted mean of the targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}


struct TreeGrower<'a> {
    features: ArrayView2<'a, f64>,
    bins: Vec<Bins>,
    gh: Vec<GradientHessian>,
    lambda_l2: f64,
}


impl RegressionTree {
    /// Fit a tree of depth at most `max_depth`
    /// on the rows of `features` with targets `labels`
    /// and sample weights `weights`.
    ///
    /// Returns the tree together with the sorted, distinct indices of
    /// the feature columns it splits on.
    pub fn fit(
        features: ArrayView2<'_, f64>,
        labels: &[f64],
        weights: &[f64],
        max_depth: usize,
        n_bins: usize,
    ) -> (Self, Vec<usize>)
    {
        let (n_sample, n_feature) = features.dim();
        assert_eq!(n_sample, labels.len());
        assert_eq!(n_sample, weights.len());

        let bins = features.columns()
            .into_iter()
            .map(|column| Bins::cut(column, n_bins))
            .collect::<Vec<_>>();

        let gh = labels.iter()
            .zip(weights)
            .map(|(y, w)| GradientHessian::new(-w * y, *w))
            .collect::<Vec<_>>();

        let indices = (0..n_sample).filter(|&i| gh[i].hess > 0f64)
            .collect::<Vec<_>>();

        let grower = TreeGrower {
            features,
            bins,
            gh,
            lambda_l2: DEFAULT_LAMBDA_L2,
        };
        let root = if n_feature == 0 {
            Node::leaf(grower.prediction(&indices))
        } else {
            grower.full_tree(indices, max_depth)
        };

        let tree = Self { root };
        let retained = tree.features_in_use(n_feature);
        (tree, retained)
    }


    /// A tree that predicts `value` everywhere.
    pub fn constant(value: f64) -> Self {
        Self { root: Node::leaf(value) }
    }


    /// Returns the depth of the tree.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }


    /// Returns the sorted, distinct feature indices the tree splits on.
    pub fn features_in_use(&self, n_feature: usize) -> Vec<usize> {
        let mut used = FixedBitSet::with_capacity(n_feature);
        self.root.for_each_feature(&mut |feature| {
            used.grow(feature + 1);
            used.insert(feature);
        });
        used.ones().collect()
    }


    /// Returns the number of feature columns the tree needs to read,
    /// one past its largest split feature.
    pub fn feature_bound(&self) -> usize {
        let mut bound = 0;
        self.root.for_each_feature(&mut |feature| {
            bound = bound.max(feature + 1);
        });
        bound
    }


    /// Renumber the split features so that
    /// the tree reads a feature matrix made of the `retained` columns only.
    ///
    /// `retained` must be sorted and contain every feature the tree splits on.
    pub fn compact(&mut self, retained: &[usize]) -> Result<()> {
        let mut missing = None;
        self.root.for_each_feature(&mut |feature| {
            if retained.binary_search(&feature).is_err() {
                missing = Some(feature);
            }
        });
        if let Some(feature) = missing {
            return Err(Error::IndexOutOfRange {
                what: "retained feature",
                index: feature,
                limit: retained.len(),
            });
        }

        self.root.remap_features(&|feature| {
            retained.binary_search(&feature).unwrap_or_default()
        });
        Ok(())
    }


    /// Predict one value per row of `features`.
    pub fn predict(&self, features: ArrayView2<'_, f64>) -> Vec<f64> {
        (0..features.nrows()).into_par_iter()
            .map(|i| self.root.predict(features.row(i)))
            .collect()
    }
}


impl TreeGrower<'_> {
    fn full_tree(&self, indices: Vec<usize>, max_depth: usize) -> Node {
        let pred = self.prediction(&indices);

        if max_depth == 0 || indices.len() < 2 {
            return Node::leaf(pred);
        }

        let rule = match self.best_split(&indices) {
            Some((feature, threshold)) => Splitter::new(feature, threshold),
            None => { return Node::leaf(pred); },
        };

        // Split the train data for left/right childrens
        let mut lindices = Vec::new();
        let mut rindices = Vec::new();
        for i in indices {
            match rule.split(self.features.row(i)) {
                LR::Left  => { lindices.push(i); },
                LR::Right => { rindices.push(i); },
            }
        }

        // If the split has no meaning, construct a leaf node.
        if lindices.is_empty() || rindices.is_empty() {
            return Node::leaf(pred);
        }

        let ltree = self.full_tree(lindices, max_depth - 1);
        let rtree = self.full_tree(rindices, max_depth - 1);

        Node::branch(rule, ltree, rtree)
    }


    /// Returns the regularized prediction `-G / (H + lambda)`.
    fn prediction(&self, indices: &[usize]) -> f64 {
        let (grad, hess) = indices.iter()
            .fold((0f64, 0f64), |(g, h), &i| {
                (g + self.gh[i].grad, h + self.gh[i].hess)
            });
        -grad / (hess + self.lambda_l2)
    }


    /// Returns the best `(feature, threshold)` pair,
    /// or `None` if no split improves on the parent node.
    /// Ties are broken towards the smallest feature index.
    fn best_split(&self, indices: &[usize]) -> Option<(usize, f64)> {
        self.bins.par_iter()
            .enumerate()
            .filter_map(|(feature, bins)| {
                let column = self.features.column(feature);
                let pack = bins.pack(indices, column, &self.gh);
                self.best_split_at(pack)
                    .map(|(score, threshold)| (score, feature, threshold))
            })
            .max_by(|x, y| x.0.total_cmp(&y.0).then(y.1.cmp(&x.1)))
            .map(|(_, feature, threshold)| (feature, threshold))
    }


    fn best_split_at(&self, pack: Vec<(Bin, GradientHessian)>)
        -> Option<(f64, f64)>
    {
        if pack.len() < 2 { return None; }

        let mut right_grad_sum = pack.iter().map(|(_, gh)| gh.grad).sum::<f64>();
        let mut right_hess_sum = pack.iter().map(|(_, gh)| gh.hess).sum::<f64>();

        let mut left_grad_sum = 0f64;
        let mut left_hess_sum = 0f64;

        let lambda = self.lambda_l2;
        let parent_score = right_grad_sum.powi(2) / (right_hess_sum + lambda);

        let mut best_score = f64::MIN;
        let mut best_threshold = f64::MIN;

        // The right-most bin cannot be a split point.
        let n_split = pack.len() - 1;
        for (bin, gh) in pack.into_iter().take(n_split) {
            left_grad_sum  += gh.grad;
            left_hess_sum  += gh.hess;
            right_grad_sum -= gh.grad;
            right_hess_sum -= gh.hess;

            let score =
                left_grad_sum.powi(2) / (left_hess_sum + lambda)
                + right_grad_sum.powi(2) / (right_hess_sum + lambda);
            if best_score < score {
                best_score = score;
                best_threshold = bin.0.end;
            }
        }

        if best_score <= parent_score + NUMERIC_TOLERANCE {
            return None;
        }
        Some((best_score, best_threshold))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_fit_01() {
        // Only the second feature separates the labels.
        let features = array![
            [0.3, -1.0],
            [0.1, -0.9],
            [0.2,  1.0],
            [0.3,  0.8],
        ];
        let labels = [-1.0, -1.0, 1.0, 1.0];
        let weights = [1.0; 4];
        let (tree, retained) = RegressionTree::fit(
            features.view(), &labels, &weights, 2, 16
        );

        assert_eq!(vec![1], retained, "got {retained:?}.");
        let pred = tree.predict(features.view());
        for (p, y) in pred.iter().zip(labels) {
            assert!(p * y > 0.0, "expected the sign of {y}, got {p}.");
        }
    }

    #[test]
    fn test_fit_depth_01() {
        let features = Array2::from_shape_fn((8, 1), |(i, _)| i as f64);
        let labels = [-1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0];
        let weights = [1.0; 8];
        let (tree, _) = RegressionTree::fit(
            features.view(), &labels, &weights, 2, 255
        );
        assert!(tree.depth() <= 2, "got depth {}.", tree.depth());
    }

    #[test]
    fn test_fit_zero_depth_01() {
        let features = array![[0.0], [1.0]];
        let labels = [1.0, 1.0];
        let weights = [1.0, 3.0];
        let (tree, retained) = RegressionTree::fit(
            features.view(), &labels, &weights, 0, 4
        );
        assert!(retained.is_empty());
        let exp = 4.0 / (4.0 + DEFAULT_LAMBDA_L2);
        let res = tree.predict(features.view())[0];
        assert!((exp - res).abs() < 1e-12, "expected {exp}, got {res}.");
    }

    #[test]
    fn test_compact_01() {
        let features = array![
            [0.0, 0.0, -1.0],
            [0.0, 0.0, -1.0],
            [0.0, 0.0,  1.0],
            [0.0, 0.0,  1.0],
        ];
        let labels = [-1.0, -1.0, 1.0, 1.0];
        let weights = [1.0; 4];
        let (mut tree, retained) = RegressionTree::fit(
            features.view(), &labels, &weights, 1, 8
        );
        assert_eq!(vec![2], retained);

        let full = tree.predict(features.view());
        tree.compact(&retained).unwrap();
        let pruned = features.select(ndarray::Axis(1), &retained);
        let res = tree.predict(pruned.view());
        assert_eq!(full, res, "expected {full:?}, got {res:?}.");

        assert!(tree.compact(&[]).is_err());
    }

    #[test]
    fn test_feature_bound_01() {
        assert_eq!(0, RegressionTree::constant(1.0).feature_bound());

        let features = array![
            [0.0, 0.0, -1.0],
            [0.0, 0.0, -1.0],
            [0.0, 0.0,  1.0],
            [0.0, 0.0,  1.0],
        ];
        let labels = [-1.0, -1.0, 1.0, 1.0];
        let weights = [1.0; 4];
        let (tree, _) = RegressionTree::fit(
            features.view(), &labels, &weights, 1, 8
        );
        assert_eq!(3, tree.feature_bound());
    }

    #[test]
    fn test_serde_01() {
        let features = array![[0.0], [1.0], [2.0], [3.0]];
        let labels = [-1.0, -1.0, 1.0, 1.0];
        let weights = [0.5, 1.5, 0.25, 2.0];
        let (tree, _) = RegressionTree::fit(
            features.view(), &labels, &weights, 2, 8
        );
        let json = serde_json::to_string(&tree).unwrap();
        let res: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, res);
    }
}
