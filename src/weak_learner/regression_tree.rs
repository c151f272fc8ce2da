// Binning of the feature columns.
mod bin;
// Split rule of the branch nodes.
mod split_rule;
// Nodes of a fitted tree.
mod node;
// The tree and its growing algorithm.
mod reg_tree;


pub use reg_tree::RegressionTree;
