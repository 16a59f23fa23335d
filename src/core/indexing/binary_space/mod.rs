// src/core/indexing/binary_space/mod.rs

//! Binary space partitioning trees (kd-tree, ball tree).
//!
//! Both split a node on the widest dimension of its points at the midpoint
//! and reorder the dataset so that every node owns a contiguous range of
//! points. The reordering is reported back as an old-from-new permutation.

use super::bound::{BallBound, Bound, HRectBound};
use serde::{Deserialize, Serialize};

mod builder;
mod tree;

pub use self::builder::build_binary_space_tree;
pub use self::tree::BinarySpaceTree;

/// Default number of points a leaf may hold.
pub const DEFAULT_LEAF_SIZE: usize = 20;

/// Bounds a binary space tree can be built with.
pub trait SplitBound: Bound + 'static {
    const TREE_NAME: &'static str;
}

impl SplitBound for HRectBound {
    const TREE_NAME: &'static str = "kd-tree";
}

impl SplitBound for BallBound {
    const TREE_NAME: &'static str = "ball tree";
}

/// Hyper-rectangle bounded binary space tree.
pub type KdTree = BinarySpaceTree<HRectBound>;

/// Ball bounded binary space tree.
pub type BallTree = BinarySpaceTree<BallBound>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafSizeParams {
    /// Largest number of points a leaf may hold.
    pub leaf_size: usize,
}

impl Default for LeafSizeParams {
    fn default() -> Self {
        Self { leaf_size: DEFAULT_LEAF_SIZE }
    }
}
