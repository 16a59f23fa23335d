// src/core/indexing/binary_space/tree.rs

//! The `BinarySpaceTree` arena and its `SpatialTree` implementation.

use super::{build_binary_space_tree, LeafSizeParams, SplitBound};
use crate::core::common::KnnError;
use crate::core::indexing::traits::{LeafSizeTree, NodeId, SpatialTree, TreeNode};
use crate::core::types::{Permutation, PointSet};
use serde::{Deserialize, Serialize};

/// A binary tree whose nodes each cover a contiguous range of its dataset.
///
/// The dataset is stored in the tree's internal order; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct BinarySpaceTree<B: SplitBound> {
    pub(super) nodes: Vec<TreeNode<B>>,
    pub(super) dataset: PointSet,
    pub(super) params: LeafSizeParams,
}

impl<B: SplitBound> BinarySpaceTree<B> {
    /// Builds with the given leaf size.
    pub fn with_leaf_size(points: PointSet, leaf_size: usize) -> Result<(Self, Permutation), KnnError> {
        build_binary_space_tree(points, &LeafSizeParams { leaf_size })
    }

    pub const fn leaf_size(&self) -> usize {
        self.params.leaf_size
    }
}

impl<B: SplitBound> SpatialTree for BinarySpaceTree<B> {
    type Bound = B;
    type Params = LeafSizeParams;

    const TREE_NAME: &'static str = B::TREE_NAME;

    fn build(points: PointSet, params: &Self::Params) -> Result<(Self, Option<Permutation>), KnnError> {
        let (tree, old_from_new) = build_binary_space_tree(points, params)?;
        Ok((tree, Some(old_from_new)))
    }

    fn dataset(&self) -> &PointSet {
        &self.dataset
    }

    fn nodes(&self) -> &[TreeNode<B>] {
        &self.nodes
    }

    fn root(&self) -> NodeId {
        0
    }

    fn params(&self) -> &Self::Params {
        &self.params
    }
}

impl<B: SplitBound> LeafSizeTree for BinarySpaceTree<B> {
    fn params_with_leaf_size(leaf_size: usize) -> Self::Params {
        LeafSizeParams { leaf_size }
    }
}
