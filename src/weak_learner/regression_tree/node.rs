//! Defines the inner representation
//! of the Regression Tree class.
use ndarray::ArrayView1;
use serde::{Serialize, Deserialize};

use super::split_rule::{LR, Splitter};


/// Enumeration of `BranchNode` and `LeafNode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum Node {
    /// A node that have two childrens.
    Branch(BranchNode),


    /// A node that have no child.
    Leaf(LeafNode),
}


/// Represents the branch nodes of regression tree.
/// Each `BranchNode` must have two childrens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BranchNode {
    pub(crate) rule: Splitter,
    pub(crate) left: Box<Node>,
    pub(crate) right: Box<Node>,
}


/// Represents the leaf nodes of regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LeafNode {
    pub(crate) prediction: f64,
}


impl Node {
    /// Construct a leaf node.
    #[inline]
    pub(crate) fn leaf(prediction: f64) -> Self {
        Self::Leaf(LeafNode { prediction })
    }


    /// Construct a branch node.
    #[inline]
    pub(crate) fn branch(rule: Splitter, left: Node, right: Node) -> Self {
        Self::Branch(BranchNode {
            rule,
            left: Box::new(left),
            right: Box::new(right),
        })
    }


    /// Predict the target value of a feature row.
    #[inline]
    pub(crate) fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        match self {
            Node::Branch(ref node) => match node.rule.split(row) {
                LR::Left  => node.left.predict(row),
                LR::Right => node.right.predict(row),
            },
            Node::Leaf(ref node) => node.prediction,
        }
    }


    /// Visit the split features of this sub-tree.
    pub(crate) fn for_each_feature<F>(&self, f: &mut F)
        where F: FnMut(usize)
    {
        if let Node::Branch(ref node) = self {
            f(node.rule.feature);
            node.left.for_each_feature(f);
            node.right.for_each_feature(f);
        }
    }


    /// Overwrite the split feature of each branch with `map(feature)`.
    pub(crate) fn remap_features<F>(&mut self, map: &F)
        where F: Fn(usize) -> usize
    {
        if let Node::Branch(ref mut node) = self {
            node.rule.feature = map(node.rule.feature);
            node.left.remap_features(map);
            node.right.remap_features(map);
        }
    }


    /// Returns the depth of this sub-tree.
    pub(crate) fn depth(&self) -> usize {
        match self {
            Node::Branch(ref node) => {
                1 + node.left.depth().max(node.right.depth())
            },
            Node::Leaf(_) => 0,
        }
    }
}
