// src/core/indexing/traits.rs

use super::bound::Bound;
use crate::core::common::KnnError;
use crate::core::types::{Permutation, PointSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Position of a node inside a tree's node arena.
pub type NodeId = usize;

/// One node of a spatial tree.
///
/// Only leaves hold points. `points` are indices into the tree's own
/// dataset, which is in the tree's internal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode<B> {
    pub bound: B,
    pub children: Vec<NodeId>,
    pub points: Vec<usize>,
    pub parent: Option<NodeId>,
}

impl<B> TreeNode<B> {
    pub const fn leaf(bound: B, points: Vec<usize>, parent: Option<NodeId>) -> Self {
        Self { bound, children: Vec::new(), points, parent }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Capability interface every concrete index structure provides.
///
/// The traversals and wrappers are written once against this trait: building
/// from a point set, the bounding summary of each node, and child / point
/// access.
pub trait SpatialTree: Sized + Debug + Serialize + DeserializeOwned {
    type Bound: Bound;
    /// Build parameters (leaf size, node capacities, overlap radius, ...).
    type Params: Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned;

    /// Human-readable label, e.g. `"kd-tree"`.
    const TREE_NAME: &'static str;

    /// Builds the tree, taking ownership of the points.
    ///
    /// Trees that reorder their dataset return the old-from-new map; trees
    /// that index points in place return `None`.
    fn build(points: PointSet, params: &Self::Params) -> Result<(Self, Option<Permutation>), KnnError>;

    /// The indexed points, in the tree's internal order.
    fn dataset(&self) -> &PointSet;

    fn nodes(&self) -> &[TreeNode<Self::Bound>];

    fn root(&self) -> NodeId;

    fn params(&self) -> &Self::Params;

    fn node(&self, id: NodeId) -> &TreeNode<Self::Bound> {
        &self.nodes()[id]
    }

    fn bound(&self, id: NodeId) -> &Self::Bound {
        &self.nodes()[id].bound
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes()[id].children
    }

    fn points(&self, id: NodeId) -> &[usize] {
        &self.nodes()[id].points
    }

    fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes()[id].is_leaf()
    }

    fn num_nodes(&self) -> usize {
        self.nodes().len()
    }

    /// Height of the tree, counted in nodes along the longest root-to-leaf path.
    fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root(), 1usize)];
        while let Some((id, d)) = stack.pop() {
            deepest = deepest.max(d);
            stack.extend(self.children(id).iter().map(|&c| (c, d + 1)));
        }
        deepest
    }

    /// Every point index stored under `id` (duplicates included for overlapping trees).
    fn descendant_points(&self, id: NodeId) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.extend_from_slice(self.points(n));
            stack.extend_from_slice(self.children(n));
        }
        out
    }
}

/// Trees whose only build knob is the leaf size (kd-tree, ball tree).
pub trait LeafSizeTree: SpatialTree + 'static {
    fn params_with_leaf_size(leaf_size: usize) -> Self::Params;
}
