// src/core/search/leaf.rs

//! Search over trees that must be built (and owned) by the engine itself.
//!
//! Binary space trees reorder the points they index. `LeafSearch` always
//! builds its trees from raw points with a fixed leaf size, keeps the
//! reference permutation, and builds a throwaway query tree for each
//! dual-tree search, so every result it returns is already in caller order.

use super::engine::NeighborSearch;
use super::searcher::NeighborSearcher;
use super::traversal::SearchStats;
use crate::core::common::KnnError;
use crate::core::indexing::LeafSizeTree;
use crate::core::metric::{EuclideanDistance, Metric};
use crate::core::sort::SortPolicy;
use crate::core::types::{NeighborResult, Permutation, PointSet};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct LeafSearch<P: SortPolicy, T: LeafSizeTree, M: Metric = EuclideanDistance> {
    leaf_size: usize,
    engine: NeighborSearch<'static, P, T, M>,
}

impl<P: SortPolicy, T: LeafSizeTree, M: Metric> LeafSearch<P, T, M> {
    pub fn new(leaf_size: usize, naive: bool, single_mode: bool) -> Result<Self, KnnError> {
        if leaf_size == 0 {
            return Err(KnnError::invalid("leaf size must be at least 1"));
        }
        Ok(Self { leaf_size, engine: NeighborSearch::new(naive, single_mode, T::params_with_leaf_size(leaf_size)) })
    }

    /// Approximate search; see `NeighborSearch::with_epsilon`.
    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self, KnnError> {
        self.engine.set_epsilon(epsilon)?;
        Ok(self)
    }

    /// Builds the engine and trains it on `reference` in one step.
    pub fn with_reference(reference: PointSet, leaf_size: usize, naive: bool, single_mode: bool) -> Result<Self, KnnError> {
        let mut search = Self::new(leaf_size, naive, single_mode)?;
        search.train(reference)?;
        Ok(search)
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    pub fn train(&mut self, reference: PointSet) -> Result<(), KnnError> {
        self.engine.train(reference)
    }

    pub fn search(&mut self, queries: &PointSet, k: usize) -> Result<NeighborResult, KnnError> {
        self.engine.search(queries, k)
    }

    pub fn search_self(&mut self, k: usize) -> Result<NeighborResult, KnnError> {
        self.engine.search_self(k)
    }

    /// The tree built over the reference set, in its internal order.
    pub fn reference_tree(&self) -> Option<&T> {
        self.engine.reference_tree()
    }

    /// Old-from-new map captured when the reference tree was built.
    pub fn reference_permutation(&self) -> Option<&Permutation> {
        self.engine.reference_permutation()
    }
}

impl<P: SortPolicy, T: LeafSizeTree, M: Metric> NeighborSearcher for LeafSearch<P, T, M> {
    fn train(&mut self, reference: PointSet) -> Result<(), KnnError> {
        self.engine.train(reference)
    }

    fn search(&mut self, queries: &PointSet, k: usize) -> Result<NeighborResult, KnnError> {
        self.engine.search(queries, k)
    }

    fn search_self(&mut self, k: usize) -> Result<NeighborResult, KnnError> {
        self.engine.search_self(k)
    }

    fn naive(&self) -> bool {
        self.engine.naive()
    }

    fn set_naive(&mut self, naive: bool) -> Result<(), KnnError> {
        self.engine.set_naive(naive)
    }

    fn single_mode(&self) -> bool {
        self.engine.single_mode()
    }

    fn set_single_mode(&mut self, single_mode: bool) {
        self.engine.set_single_mode(single_mode);
    }

    fn epsilon(&self) -> f64 {
        self.engine.epsilon()
    }

    fn set_epsilon(&mut self, epsilon: f64) -> Result<(), KnnError> {
        self.engine.set_epsilon(epsilon)
    }

    fn reference_set(&self) -> Result<Cow<'_, PointSet>, KnnError> {
        self.engine.reference_set()
    }

    fn tree_name(&self) -> &'static str {
        T::TREE_NAME
    }

    fn last_search_stats(&self) -> SearchStats {
        self.engine.last_search_stats()
    }
}
