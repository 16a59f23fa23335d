// src/core/search/spill.rs

//! Search over a spill tree with overlap radius `tau`.
//!
//! Spill trees are meant for approximate search: besides the overlap, the
//! engine accepts a relative error `epsilon` that loosens every pruning bound.
//!
//! Overlap only ever applies to the reference side. Query trees for dual-tree
//! search are built with `tau = 0`, and a self-search against a reference tree
//! with non-zero overlap indexes the references again without overlap rather
//! than reusing the reference tree as the query tree.

use super::engine::NeighborSearch;
use super::searcher::NeighborSearcher;
use super::traversal::SearchStats;
use crate::core::common::KnnError;
use crate::core::config::SearchConfig;
use crate::core::indexing::{SpatialTree, SpillTree, SpillTreeParams};
use crate::core::metric::{EuclideanDistance, Metric};
use crate::core::sort::SortPolicy;
use crate::core::types::{NeighborResult, PointSet};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SpillSearch<'a, P: SortPolicy, M: Metric = EuclideanDistance> {
    tau: f64,
    engine: NeighborSearch<'a, P, SpillTree, M>,
}

impl<'a, P: SortPolicy, M: Metric> SpillSearch<'a, P, M> {
    /// Fails with `InvalidParameter` when `tau` is negative.
    pub fn new(tau: f64, leaf_size: usize, naive: bool, single_mode: bool) -> Result<Self, KnnError> {
        let params = SpillTreeParams { tau, leaf_size, ..SpillTreeParams::default() };
        params.validate()?;
        let query_params = SpillTreeParams { tau: 0.0, ..params };
        Ok(Self { tau, engine: NeighborSearch::new(naive, single_mode, params).with_query_params(query_params) })
    }

    /// Allows a relative error of `epsilon` on reported distances. Fails with
    /// `InvalidParameter` unless `epsilon` is finite and non-negative.
    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self, KnnError> {
        self.engine.set_epsilon(epsilon)?;
        Ok(self)
    }

    /// Takes `tau`, `epsilon`, leaf size and search mode from `config`.
    pub fn from_config(config: &SearchConfig) -> Result<Self, KnnError> {
        Self::new(config.tau, config.leaf_size, config.naive, config.single_mode)?.with_epsilon(config.epsilon)
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn epsilon(&self) -> f64 {
        self.engine.epsilon()
    }

    /// Builds (and owns) a spill tree over `reference` outside naive mode.
    pub fn train(&mut self, reference: PointSet) -> Result<(), KnnError> {
        self.engine.train(reference)
    }

    /// Takes ownership of a caller-built spill tree.
    pub fn train_tree(&mut self, tree: SpillTree) -> Result<(), KnnError> {
        let tau = tree.tau();
        self.engine.train_tree(tree, None)?;
        self.tau = tau;
        Ok(())
    }

    /// Searches against a caller-built spill tree without taking ownership.
    pub fn train_borrowed(&mut self, tree: &'a SpillTree) -> Result<(), KnnError> {
        self.engine.train_borrowed(tree, None)?;
        self.tau = tree.tau();
        Ok(())
    }

    pub fn search(&mut self, queries: &PointSet, k: usize) -> Result<NeighborResult, KnnError> {
        self.engine.search(queries, k)
    }

    pub fn search_with_query_tree(&mut self, query_tree: &SpillTree, k: usize) -> Result<NeighborResult, KnnError> {
        self.engine.search_with_query_tree(query_tree, None, k)
    }

    pub fn search_self(&mut self, k: usize) -> Result<NeighborResult, KnnError> {
        self.engine.search_self(k)
    }

    pub fn reference_tree(&self) -> Option<&SpillTree> {
        self.engine.reference_tree()
    }

    pub fn owns_tree(&self) -> bool {
        self.engine.owns_tree()
    }
}

impl<P: SortPolicy, M: Metric> NeighborSearcher for SpillSearch<'_, P, M> {
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
        SpillTree::TREE_NAME
    }

    fn last_search_stats(&self) -> SearchStats {
        self.engine.last_search_stats()
    }
}
