// src/core/model/tree_type.rs

use crate::core::common::KnnError;
use crate::core::indexing::{BallTree, CoverTree, KdTree, RStarTree, RTree, SpatialTree, XTree};
use std::fmt;
use std::str::FromStr;

/// Which concrete tree a model builds.
///
/// Persisted and configured by its short name (`"kd"`, `"cover"`, `"r"`,
/// `"r-star"`, `"ball"`, `"x"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TreeType {
    #[default]
    KdTree,
    CoverTree,
    RTree,
    RStarTree,
    BallTree,
    XTree,
}

impl TreeType {
    pub const ALL: [Self; 6] = [Self::KdTree, Self::CoverTree, Self::RTree, Self::RStarTree, Self::BallTree, Self::XTree];

    /// Stable short name used in configuration files and model records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KdTree => "kd",
            Self::CoverTree => "cover",
            Self::RTree => "r",
            Self::RStarTree => "r-star",
            Self::BallTree => "ball",
            Self::XTree => "x",
        }
    }

    /// Human-readable label of the tree this discriminant selects.
    pub const fn tree_name(self) -> &'static str {
        match self {
            Self::KdTree => KdTree::TREE_NAME,
            Self::CoverTree => CoverTree::TREE_NAME,
            Self::RTree => RTree::TREE_NAME,
            Self::RStarTree => RStarTree::TREE_NAME,
            Self::BallTree => BallTree::TREE_NAME,
            Self::XTree => XTree::TREE_NAME,
        }
    }

    /// Whether the tree is built through the leaf-size wrapper.
    pub const fn uses_leaf_size(self) -> bool {
        matches!(self, Self::KdTree | Self::BallTree)
    }
}

impl fmt::Display for TreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeType {
    type Err = KnnError;

    /// Accepts the short name or the tree label, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted) || t.tree_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| KnnError::UnsupportedTreeType(s.to_string()))
    }
}
