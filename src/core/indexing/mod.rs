// src/core/indexing/mod.rs

//! Spatial index structures.
//!
//! Every tree implements [`SpatialTree`], so the search traversals are written
//! once and run unmodified against any of them.

pub mod binary_space;
pub mod bound;
pub mod cover_tree;
pub mod rectangle;
pub mod spill_tree;
pub mod traits;

pub use binary_space::{BallTree, BinarySpaceTree, KdTree, LeafSizeParams, DEFAULT_LEAF_SIZE};
pub use bound::{BallBound, Bound, HRectBound};
pub use cover_tree::{CoverTree, CoverTreeParams};
pub use rectangle::{RStarTree, RTree, RectangleParams, RectangleTree, XTree};
pub use spill_tree::{SpillTree, SpillTreeParams};
pub use traits::{LeafSizeTree, NodeId, SpatialTree, TreeNode};
