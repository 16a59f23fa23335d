// src/core/search/engine.rs

//! `NeighborSearch`: the generic search engine over any `SpatialTree`.

use super::searcher::NeighborSearcher;
use super::traversal::{dual_tree_search, naive_search, single_tree_search, Exclusion, SearchStats};
use crate::core::common::KnnError;
use crate::core::indexing::SpatialTree;
use crate::core::metric::{EuclideanDistance, Metric};
use crate::core::sort::SortPolicy;
use crate::core::types::{NeighborResult, Permutation, PointSet};
use log::{debug, trace};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops::Deref;

/// A reference tree the engine either owns or borrows from the caller.
///
/// An owned tree is released with the engine; a borrowed one never is.
/// Serializing writes the tree itself; deserializing always yields an owned tree.
#[derive(Debug)]
pub enum TreeHandle<'a, T> {
    Owned(Box<T>),
    Borrowed(&'a T),
}

impl<T> TreeHandle<'_, T> {
    pub const fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

impl<T> Deref for TreeHandle<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Self::Owned(tree) => tree,
            Self::Borrowed(tree) => tree,
        }
    }
}

impl<T: Serialize> Serialize for TreeHandle<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (**self).serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for TreeHandle<'_, T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(|tree| Self::Owned(Box::new(tree)))
    }
}

/// What the engine searches against once trained.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum ReferenceState<'a, T: SpatialTree> {
    /// Raw points, in caller order (naive mode, no tree built).
    Naive(PointSet),
    /// A tree plus the old-from-new map of its dataset, if it reordered it.
    Tree { tree: TreeHandle<'a, T>, old_from_new: Option<Permutation> },
}

impl<T: SpatialTree> ReferenceState<'_, T> {
    /// Reference points in the order traversals report indices in.
    fn points(&self) -> &PointSet {
        match self {
            Self::Naive(points) => points,
            Self::Tree { tree, .. } => tree.dataset(),
        }
    }

    fn permutation(&self) -> Option<&Permutation> {
        match self {
            Self::Naive(_) => None,
            Self::Tree { old_from_new, .. } => old_from_new.as_ref(),
        }
    }
}

/// k-nearest or k-furthest neighbor search over a reference set.
///
/// The engine searches naively, with one tree over the references
/// (single mode) or with trees over both references and queries (dual mode).
/// Whatever the mode, results come back in caller order: columns follow the
/// query set and reported indices refer to the reference set as it was
/// trained.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct NeighborSearch<'a, P: SortPolicy, T: SpatialTree, M: Metric = EuclideanDistance> {
    reference: Option<ReferenceState<'a, T>>,
    /// Parameters for reference trees this engine builds.
    params: T::Params,
    /// Parameters for query trees this engine builds.
    query_params: T::Params,
    naive: bool,
    single_mode: bool,
    /// Allowed relative error; 0 means exact search.
    #[serde(default)]
    epsilon: f64,
    metric: M,
    #[serde(skip)]
    stats: SearchStats,
    #[serde(skip)]
    policy: PhantomData<P>,
}

impl<'a, P: SortPolicy, T: SpatialTree, M: Metric> NeighborSearch<'a, P, T, M> {
    /// An untrained engine that builds trees with `params`.
    pub fn new(naive: bool, single_mode: bool, params: T::Params) -> Self {
        Self::with_metric(naive, single_mode, params, M::default())
    }

    pub fn with_metric(naive: bool, single_mode: bool, params: T::Params, metric: M) -> Self {
        Self {
            reference: None,
            query_params: params.clone(),
            params,
            naive,
            single_mode,
            epsilon: 0.0,
            metric,
            stats: SearchStats::default(),
            policy: PhantomData,
        }
    }

    /// Uses `query_params` instead of the reference parameters whenever a
    /// query tree is built.
    pub fn with_query_params(mut self, query_params: T::Params) -> Self {
        self.query_params = query_params;
        self
    }

    /// Turns the search approximate. A reported k-th neighbor distance is
    /// then within a factor of `1 + epsilon` of the true one for nearest
    /// neighbors, and at least `1 - epsilon` times the true one for furthest
    /// neighbors.
    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self, KnnError> {
        self.set_epsilon(epsilon)?;
        Ok(self)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Fails with `InvalidParameter` unless `epsilon` is finite and non-negative.
    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<(), KnnError> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(KnnError::invalid(format!("epsilon must be finite and non-negative, got {}", epsilon)));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    /// Trains on raw points. Outside naive mode this builds and owns a tree.
    ///
    /// On failure the previous reference set stays in place.
    pub fn train(&mut self, reference: PointSet) -> Result<(), KnnError> {
        let state = if self.naive { ReferenceState::Naive(reference) } else { self.build_reference(reference)? };
        self.reference = Some(state);
        Ok(())
    }

    fn build_reference(&self, reference: PointSet) -> Result<ReferenceState<'a, T>, KnnError> {
        let (tree, old_from_new) = T::build(reference, &self.params)?;
        debug!("{} search engine now owns a {} over {} points", P::NAME, T::TREE_NAME, tree.dataset().len());
        Ok(ReferenceState::Tree { tree: TreeHandle::Owned(Box::new(tree)), old_from_new })
    }

    /// Takes ownership of a caller-built tree. `old_from_new` maps the tree's
    /// internal order back to the caller's, if the tree reordered its points.
    pub fn train_tree(&mut self, tree: T, old_from_new: Option<Permutation>) -> Result<(), KnnError> {
        self.install_tree(TreeHandle::Owned(Box::new(tree)), old_from_new)
    }

    /// Searches against a caller-owned tree, which the engine never releases.
    pub fn train_borrowed(&mut self, tree: &'a T, old_from_new: Option<Permutation>) -> Result<(), KnnError> {
        self.install_tree(TreeHandle::Borrowed(tree), old_from_new)
    }

    fn install_tree(&mut self, tree: TreeHandle<'a, T>, old_from_new: Option<Permutation>) -> Result<(), KnnError> {
        if self.naive {
            return Err(KnnError::invalid("cannot train on a reference tree while naive search is enabled"));
        }
        if let Some(perm) = &old_from_new {
            if perm.len() != tree.dataset().len() {
                return Err(KnnError::invalid(format!(
                    "permutation covers {} points but the tree holds {}",
                    perm.len(),
                    tree.dataset().len()
                )));
            }
        }
        self.reference = Some(ReferenceState::Tree { tree, old_from_new });
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.reference.is_some()
    }

    pub fn params(&self) -> &T::Params {
        &self.params
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// The reference tree, when one is in use.
    pub fn reference_tree(&self) -> Option<&T> {
        match &self.reference {
            Some(ReferenceState::Tree { tree, .. }) => Some(&**tree),
            _ => None,
        }
    }

    /// Old-from-new map of the reference tree's dataset, if it reordered it.
    pub fn reference_permutation(&self) -> Option<&Permutation> {
        self.reference.as_ref().and_then(ReferenceState::permutation)
    }

    /// Whether the engine owns (and will release) its reference tree.
    pub fn owns_tree(&self) -> bool {
        matches!(&self.reference, Some(ReferenceState::Tree { tree, .. }) if tree.is_owned())
    }

    fn state(&self) -> Result<&ReferenceState<'a, T>, KnnError> {
        self.reference.as_ref().ok_or_else(|| KnnError::not_initialized("search called before training"))
    }

    /// Boundary checks shared by every search entry point.
    fn check_request(n_references: usize, dim: usize, queries: Option<&PointSet>, k: usize) -> Result<(), KnnError> {
        if k > n_references {
            return Err(KnnError::invalid(format!(
                "requested {} neighbors, but the reference set has only {} points",
                k, n_references
            )));
        }
        if let Some(queries) = queries {
            if !queries.is_empty() && queries.dim() != dim {
                return Err(KnnError::DimensionMismatch { expected: dim, found: queries.dim() });
            }
        }
        Ok(())
    }

    /// Maps reference indices back to caller order.
    fn unmap_references(result: &mut NeighborResult, perm: Option<&Permutation>) {
        if let Some(perm) = perm {
            result.unmap_neighbors(perm.as_slice());
        }
    }

    /// Finds the `k` best reference points for every query point.
    pub fn search(&mut self, queries: &PointSet, k: usize) -> Result<NeighborResult, KnnError> {
        let state = self.state()?;
        let references = state.points();
        Self::check_request(references.len(), references.dim(), Some(queries), k)?;

        let mut stats = SearchStats::default();
        if k == 0 || queries.is_empty() {
            self.stats = stats;
            return Ok(NeighborResult::unfilled(k, queries.len(), P::worst_distance()));
        }

        let mut result = match (self.naive, state) {
            (true, _) | (false, ReferenceState::Naive(_)) => {
                naive_search::<P, M>(&self.metric, queries, references, k, Exclusion::Nothing, &mut stats)
            }
            (false, ReferenceState::Tree { tree, .. }) if self.single_mode => {
                single_tree_search::<P, M, T>(&self.metric, &**tree, queries, k, self.epsilon, Exclusion::Nothing, &mut stats)
            }
            (false, ReferenceState::Tree { tree, .. }) => {
                let (query_tree, query_perm) = T::build(queries.clone(), &self.query_params)?;
                let raw =
                    dual_tree_search::<P, M, T>(&self.metric, &query_tree, tree, k, self.epsilon, Exclusion::Nothing, &mut stats);
                match &query_perm {
                    Some(perm) => raw.unmap_columns(perm.as_slice()),
                    None => raw,
                }
            }
        };
        Self::unmap_references(&mut result, state.permutation());

        trace!("{} search over {} queries: {:?}", P::NAME, queries.len(), stats);
        self.stats = stats;
        Ok(result)
    }

    /// Dual-tree search with a caller-built query tree. `query_old_from_new`
    /// maps the query tree's internal order back to the caller's.
    pub fn search_with_query_tree(
        &mut self,
        query_tree: &T,
        query_old_from_new: Option<&Permutation>,
        k: usize,
    ) -> Result<NeighborResult, KnnError> {
        if self.naive || self.single_mode {
            return Err(KnnError::invalid("a query tree can only be used in dual-tree mode"));
        }
        let state = self.state()?;
        let tree = match state {
            ReferenceState::Tree { tree, .. } => tree,
            ReferenceState::Naive(_) => {
                return Err(KnnError::invalid("a query tree can only be used with a reference tree"))
            }
        };
        let references = tree.dataset();
        Self::check_request(references.len(), references.dim(), Some(query_tree.dataset()), k)?;

        let mut stats = SearchStats::default();
        let queries = query_tree.dataset();
        let mut result = if k == 0 || queries.is_empty() {
            NeighborResult::unfilled(k, queries.len(), P::worst_distance())
        } else {
            dual_tree_search::<P, M, T>(&self.metric, query_tree, tree, k, self.epsilon, Exclusion::Nothing, &mut stats)
        };
        if let Some(perm) = query_old_from_new {
            result = result.unmap_columns(perm.as_slice());
        }
        Self::unmap_references(&mut result, state.permutation());

        self.stats = stats;
        Ok(result)
    }

    /// Uses the reference set as the query set. A point is never reported
    /// as its own neighbor, so with `k` equal to the reference size the last
    /// slot of every column stays empty.
    pub fn search_self(&mut self, k: usize) -> Result<NeighborResult, KnnError> {
        let state = self.state()?;
        let references = state.points();
        let n = references.len();
        Self::check_request(n, references.dim(), None, k)?;

        let mut stats = SearchStats::default();
        if k == 0 || n == 0 {
            self.stats = stats;
            return Ok(NeighborResult::unfilled(k, n, P::worst_distance()));
        }

        // columns come out in the reference set's internal order
        let mut result = match (self.naive, state) {
            (true, _) | (false, ReferenceState::Naive(_)) => {
                naive_search::<P, M>(&self.metric, references, references, k, Exclusion::SameIndex, &mut stats)
            }
            (false, ReferenceState::Tree { tree, .. }) if self.single_mode => {
                single_tree_search::<P, M, T>(&self.metric, &**tree, references, k, self.epsilon, Exclusion::SameIndex, &mut stats)
            }
            (false, ReferenceState::Tree { tree, .. }) if self.query_params == *tree.params() => {
                dual_tree_search::<P, M, T>(&self.metric, &**tree, tree, k, self.epsilon, Exclusion::SameIndex, &mut stats)
            }
            (false, ReferenceState::Tree { tree, .. }) => {
                // the reference tree was built differently from how query
                // trees must be, so index the references again as queries
                let (query_tree, query_perm) = T::build(references.clone(), &self.query_params)?;
                let raw = match &query_perm {
                    Some(perm) => dual_tree_search::<P, M, T>(
                        &self.metric,
                        &query_tree,
                        tree,
                        k,
                        self.epsilon,
                        Exclusion::Through(perm.as_slice()),
                        &mut stats,
                    ),
                    None => dual_tree_search::<P, M, T>(
                        &self.metric,
                        &query_tree,
                        tree,
                        k,
                        self.epsilon,
                        Exclusion::SameIndex,
                        &mut stats,
                    ),
                };
                match &query_perm {
                    Some(perm) => raw.unmap_columns(perm.as_slice()),
                    None => raw,
                }
            }
        };

        if let Some(perm) = state.permutation() {
            result = result.unmap_columns(perm.as_slice());
            result.unmap_neighbors(perm.as_slice());
        }

        trace!("{} self-search over {} points: {:?}", P::NAME, n, stats);
        self.stats = stats;
        Ok(result)
    }

    pub fn naive(&self) -> bool {
        self.naive
    }

    /// Switches naive mode. Leaving naive mode after a naive training builds
    /// the reference tree from the stored points; if that build fails, the
    /// engine stays naive and keeps its points.
    pub fn set_naive(&mut self, naive: bool) -> Result<(), KnnError> {
        if !naive {
            if let Some(ReferenceState::Naive(points)) = &self.reference {
                let state = self.build_reference(points.clone())?;
                self.reference = Some(state);
            }
        }
        self.naive = naive;
        Ok(())
    }

    pub fn single_mode(&self) -> bool {
        self.single_mode
    }

    pub fn set_single_mode(&mut self, single_mode: bool) {
        self.single_mode = single_mode;
    }

    /// The reference set in caller order.
    pub fn reference_set(&self) -> Result<Cow<'_, PointSet>, KnnError> {
        let state = self
            .reference
            .as_ref()
            .ok_or_else(|| KnnError::not_initialized("reference set requested before training"))?;
        Ok(match state.permutation() {
            Some(perm) => Cow::Owned(state.points().select_columns(&perm.new_from_old())),
            None => Cow::Borrowed(state.points()),
        })
    }

    pub fn last_search_stats(&self) -> SearchStats {
        self.stats
    }
}

impl<P: SortPolicy, T: SpatialTree, M: Metric> NeighborSearcher for NeighborSearch<'_, P, T, M> {
    fn train(&mut self, reference: PointSet) -> Result<(), KnnError> {
        NeighborSearch::train(self, reference)
    }

    fn search(&mut self, queries: &PointSet, k: usize) -> Result<NeighborResult, KnnError> {
        NeighborSearch::search(self, queries, k)
    }

    fn search_self(&mut self, k: usize) -> Result<NeighborResult, KnnError> {
        NeighborSearch::search_self(self, k)
    }

    fn naive(&self) -> bool {
        self.naive
    }

    fn set_naive(&mut self, naive: bool) -> Result<(), KnnError> {
        NeighborSearch::set_naive(self, naive)
    }

    fn single_mode(&self) -> bool {
        self.single_mode
    }

    fn set_single_mode(&mut self, single_mode: bool) {
        self.single_mode = single_mode;
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn set_epsilon(&mut self, epsilon: f64) -> Result<(), KnnError> {
        NeighborSearch::set_epsilon(self, epsilon)
    }

    fn reference_set(&self) -> Result<Cow<'_, PointSet>, KnnError> {
        NeighborSearch::reference_set(self)
    }

    fn tree_name(&self) -> &'static str {
        T::TREE_NAME
    }

    fn last_search_stats(&self) -> SearchStats {
        self.stats
    }
}
