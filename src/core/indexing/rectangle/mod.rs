// src/core/indexing/rectangle/mod.rs

//! Insertion-built minimum bounding rectangle trees: R tree, R* tree and X tree.
//!
//! All three share one node arena and insertion loop; they differ in how an
//! insert descends (`choose_child`) and how an overflowing node is split.
//! Points are indexed in place, so no permutation is produced.

use super::bound::HRectBound;
use super::traits::NodeId;
use crate::core::common::KnnError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

mod split;
mod tree;

pub use self::split::{RStarTreeSplit, RTreeSplit, XTreeSplit};
pub use self::tree::RectangleTree;

pub type RTree = RectangleTree<RTreeSplit>;
pub type RStarTree = RectangleTree<RStarTreeSplit>;
pub type XTree = RectangleTree<XTreeSplit>;

/// Node capacities shared by the rectangle tree family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleParams {
    pub max_leaf_size: usize,
    pub min_leaf_size: usize,
    pub max_num_children: usize,
    pub min_num_children: usize,
}

impl Default for RectangleParams {
    fn default() -> Self {
        Self { max_leaf_size: 20, min_leaf_size: 8, max_num_children: 5, min_num_children: 2 }
    }
}

impl RectangleParams {
    /// Every overflowing node must be splittable into two halves that both
    /// meet the minimum fill.
    pub fn validate(&self) -> Result<(), KnnError> {
        if self.max_leaf_size == 0 || self.min_leaf_size == 0 {
            return Err(KnnError::invalid("rectangle tree leaf sizes must be at least 1"));
        }
        if self.min_leaf_size * 2 > self.max_leaf_size + 1 {
            return Err(KnnError::invalid(format!(
                "min_leaf_size {} is too large for max_leaf_size {}",
                self.min_leaf_size, self.max_leaf_size
            )));
        }
        if self.max_num_children < 2 || self.min_num_children == 0 {
            return Err(KnnError::invalid("rectangle tree nodes need max_num_children >= 2 and min_num_children >= 1"));
        }
        if self.min_num_children * 2 > self.max_num_children + 1 {
            return Err(KnnError::invalid(format!(
                "min_num_children {} is too large for max_num_children {}",
                self.min_num_children, self.max_num_children
            )));
        }
        Ok(())
    }
}

/// How an overflowing node's entries are divided: positions into the entry
/// list for each half, plus the axis the division was made on, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub axis: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalSplit {
    Split(SplitPlan),
    /// Keep the node whole and raise its capacity.
    Supernode,
}

/// Descent and split rules of one rectangle tree flavour.
pub trait RectangleSplit: Copy + Debug + Default + Send + Sync + 'static {
    const TREE_NAME: &'static str;
    /// Whether an overflowing non-root leaf first evicts part of its points
    /// for reinsertion (once per top-level insert).
    const FORCED_REINSERT: bool;

    /// Child of `node` an insert of `point` descends into.
    fn choose_child(tree: &RectangleTree<Self>, node: NodeId, point: &[f64]) -> NodeId;

    fn split_leaf(entries: &[HRectBound], min_fill: usize) -> SplitPlan;

    fn split_internal(
        _tree: &RectangleTree<Self>,
        _node: NodeId,
        entries: &[HRectBound],
        min_fill: usize,
    ) -> InternalSplit {
        InternalSplit::Split(Self::split_leaf(entries, min_fill))
    }
}
