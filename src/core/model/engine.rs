// src/core/model/engine.rs

use super::tree_type::TreeType;
use crate::core::common::KnnError;
use crate::core::indexing::{BallTree, CoverTree, CoverTreeParams, KdTree, RStarTree, RTree, RectangleParams, XTree};
use crate::core::search::{LeafSearch, NeighborSearch, NeighborSearcher};
use crate::core::sort::SortPolicy;
use serde::{Deserialize, Serialize};

/// The concrete engine a model owns, one variant per tree type.
///
/// Persisted with its variant name as the tag, so a record always restores
/// the engine type it was written from.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum SearchEngine<P: SortPolicy> {
    KdTree(LeafSearch<P, KdTree>),
    CoverTree(NeighborSearch<'static, P, CoverTree>),
    RTree(NeighborSearch<'static, P, RTree>),
    RStarTree(NeighborSearch<'static, P, RStarTree>),
    BallTree(LeafSearch<P, BallTree>),
    XTree(NeighborSearch<'static, P, XTree>),
}

impl<P: SortPolicy> SearchEngine<P> {
    /// An untrained engine for `tree_type`.
    ///
    /// Node capacities are checked up front for the rectangle trees, so a
    /// naive engine cannot later fail to leave naive mode over bad parameters.
    pub fn new(
        tree_type: TreeType,
        leaf_size: usize,
        rectangle: &RectangleParams,
        naive: bool,
        single_mode: bool,
    ) -> Result<Self, KnnError> {
        if matches!(tree_type, TreeType::RTree | TreeType::RStarTree | TreeType::XTree) {
            rectangle.validate()?;
        }
        Ok(match tree_type {
            TreeType::KdTree => Self::KdTree(LeafSearch::new(leaf_size, naive, single_mode)?),
            TreeType::CoverTree => Self::CoverTree(NeighborSearch::new(naive, single_mode, CoverTreeParams::default())),
            TreeType::RTree => Self::RTree(NeighborSearch::new(naive, single_mode, rectangle.clone())),
            TreeType::RStarTree => Self::RStarTree(NeighborSearch::new(naive, single_mode, rectangle.clone())),
            TreeType::BallTree => Self::BallTree(LeafSearch::new(leaf_size, naive, single_mode)?),
            TreeType::XTree => Self::XTree(NeighborSearch::new(naive, single_mode, rectangle.clone())),
        })
    }

    pub const fn tree_type(&self) -> TreeType {
        match self {
            Self::KdTree(_) => TreeType::KdTree,
            Self::CoverTree(_) => TreeType::CoverTree,
            Self::RTree(_) => TreeType::RTree,
            Self::RStarTree(_) => TreeType::RStarTree,
            Self::BallTree(_) => TreeType::BallTree,
            Self::XTree(_) => TreeType::XTree,
        }
    }

    pub fn searcher(&self) -> &dyn NeighborSearcher {
        match self {
            Self::KdTree(e) => e,
            Self::CoverTree(e) => e,
            Self::RTree(e) => e,
            Self::RStarTree(e) => e,
            Self::BallTree(e) => e,
            Self::XTree(e) => e,
        }
    }

    pub fn searcher_mut(&mut self) -> &mut dyn NeighborSearcher {
        match self {
            Self::KdTree(e) => e,
            Self::CoverTree(e) => e,
            Self::RTree(e) => e,
            Self::RStarTree(e) => e,
            Self::BallTree(e) => e,
            Self::XTree(e) => e,
        }
    }
}
