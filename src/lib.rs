#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![forbid(unsafe_code)]
#![warn(clippy::all)]

//! # OxiKNN: tree-accelerated k-nearest and k-furthest neighbor search
//!
//! `oxiknn` answers "which `k` reference points are closest to (or furthest
//! from) each query point" for dense point sets. It provides:
//! - Brute-force, single-tree and dual-tree search, exact or within a relative
//!   error `epsilon`
//! - kd-trees, ball trees, cover trees, R, R* and X trees, and spill trees
//! - A model that picks its tree at runtime, optionally searches in a random
//!   rotation of the input space, and persists to JSON
//!
//! Results always refer to points in the order the caller supplied them,
//! whichever tree reorders them internally.

pub mod core;

pub use crate::core::common::KnnError;
pub use crate::core::config::{SearchConfig, SearchConfigBuilder};
pub use crate::core::indexing::{BallTree, CoverTree, KdTree, RStarTree, RTree, SpatialTree, SpillTree, XTree};
pub use crate::core::model::{KfnModel, KnnModel, NsModel, TreeType};
pub use crate::core::search::{LeafSearch, NeighborSearch, NeighborSearcher, SpillSearch};
pub use crate::core::sort::{FurthestNeighborSort, NearestNeighborSort, SortPolicy};
pub use crate::core::types::{NeighborResult, Permutation, PointSet};

/// Core result type for the library
pub type Result<T> = std::result::Result<T, KnnError>;
