// src/core/search/searcher.rs

use super::traversal::SearchStats;
use crate::core::common::KnnError;
use crate::core::types::{NeighborResult, PointSet};
use std::borrow::Cow;

/// Contract shared by every search engine, whichever tree it runs on.
///
/// The model façade drives its concrete engine only through this trait.
pub trait NeighborSearcher {
    /// Replaces the reference set (and any tree built over it).
    fn train(&mut self, reference: PointSet) -> Result<(), KnnError>;

    /// `k` best reference points for each query, in caller order.
    fn search(&mut self, queries: &PointSet, k: usize) -> Result<NeighborResult, KnnError>;

    /// `k` best other reference points for each reference point.
    fn search_self(&mut self, k: usize) -> Result<NeighborResult, KnnError>;

    fn naive(&self) -> bool;

    fn set_naive(&mut self, naive: bool) -> Result<(), KnnError>;

    fn single_mode(&self) -> bool;

    fn set_single_mode(&mut self, single_mode: bool);

    /// Relative error allowed when pruning; 0 for exact search.
    fn epsilon(&self) -> f64;

    fn set_epsilon(&mut self, epsilon: f64) -> Result<(), KnnError>;

    /// The trained reference set, in caller order.
    fn reference_set(&self) -> Result<Cow<'_, PointSet>, KnnError>;

    fn tree_name(&self) -> &'static str;

    fn last_search_stats(&self) -> SearchStats;
}
