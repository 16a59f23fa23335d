// src/core/search/traversal.rs

//! The three search strategies: exhaustive, single-tree and dual-tree.
//!
//! All three write one result column per query, in the order the queries
//! are handed in (for the dual-tree search, the query tree's internal order),
//! and report reference indices in the order of the reference points given
//! (for trees, the tree's internal order). Mapping back to caller order is
//! left to the engines.
//!
//! Both tree traversals keep an explicit stack of pending work, ordered so
//! the most promising node is expanded first. A non-zero `epsilon` relaxes
//! every pruning bound through `SortPolicy::relax`, trading exactness for
//! fewer base cases.

use super::candidate::CandidateList;
use crate::core::indexing::SpatialTree;
use crate::core::metric::Metric;
use crate::core::sort::SortPolicy;
use crate::core::types::{NeighborResult, PointSet};
use log::trace;
use serde::{Deserialize, Serialize};

/// Counters for the last search an engine ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Query/reference point distances evaluated.
    pub base_cases: usize,
    /// Nodes (single-tree) or node pairs (dual-tree) skipped by the pruning rule.
    pub pruned: usize,
}

/// Which query/reference pairs are skipped because they are the same point.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Exclusion<'p> {
    Nothing,
    /// Query `i` is reference `i`.
    SameIndex,
    /// Query `i` is reference `map[i]`.
    Through(&'p [usize]),
}

impl Exclusion<'_> {
    #[inline]
    fn skips(&self, query: usize, reference: usize) -> bool {
        match self {
            Self::Nothing => false,
            Self::SameIndex => query == reference,
            Self::Through(map) => map[query] == reference,
        }
    }
}

fn collect<P: SortPolicy>(lists: &[CandidateList<P>], k: usize) -> NeighborResult {
    let mut result = NeighborResult::unfilled(k, lists.len(), P::worst_distance());
    for (column, list) in lists.iter().enumerate() {
        list.write_column(&mut result, column);
    }
    result
}

/// Orders `(item, score)` pairs worst first, so that pushing them onto a
/// stack leaves the best on top.
fn worst_first<P: SortPolicy, I>(scored: &mut [(I, f64)]) {
    scored.sort_by(|a, b| P::compare(b.1, a.1));
}

/// Computes every query/reference distance.
pub(crate) fn naive_search<P: SortPolicy, M: Metric>(
    metric: &M,
    queries: &PointSet,
    references: &PointSet,
    k: usize,
    exclusion: Exclusion<'_>,
    stats: &mut SearchStats,
) -> NeighborResult {
    let lists: Vec<CandidateList<P>> = (0..queries.len())
        .map(|q| {
            let mut list = CandidateList::new(k);
            let query = queries.point(q);
            for (r, reference) in references.points().enumerate() {
                if exclusion.skips(q, r) {
                    continue;
                }
                stats.base_cases += 1;
                list.insert(metric.evaluate(query, reference), r);
            }
            list
        })
        .collect();
    trace!("naive search: {} base cases", stats.base_cases);
    collect(&lists, k)
}

/// Searches the reference tree once per query point.
pub(crate) fn single_tree_search<P: SortPolicy, M: Metric, T: SpatialTree>(
    metric: &M,
    tree: &T,
    queries: &PointSet,
    k: usize,
    epsilon: f64,
    exclusion: Exclusion<'_>,
    stats: &mut SearchStats,
) -> NeighborResult {
    let references = tree.dataset();
    let mut lists = Vec::with_capacity(queries.len());

    for q in 0..queries.len() {
        let query = queries.point(q);
        let mut list = CandidateList::<P>::new(k);
        let mut stack = vec![(tree.root(), P::best_point_to_node(tree.bound(tree.root()), query))];

        while let Some((node, score)) = stack.pop() {
            if P::can_prune(score, P::relax(list.worst_distance(), epsilon)) {
                stats.pruned += 1;
                continue;
            }
            if tree.is_leaf(node) {
                for &r in tree.points(node) {
                    if exclusion.skips(q, r) {
                        continue;
                    }
                    stats.base_cases += 1;
                    list.insert(metric.evaluate(query, references.point(r)), r);
                }
                continue;
            }

            let mut scored: Vec<(usize, f64)> = tree
                .children(node)
                .iter()
                .map(|&c| (c, P::best_point_to_node(tree.bound(c), query)))
                .collect();
            worst_first::<P, _>(&mut scored);
            stack.extend(scored);
        }
        lists.push(list);
    }

    trace!("single-tree search: {} base cases, {} nodes pruned", stats.base_cases, stats.pruned);
    collect(&lists, k)
}

/// Recomputes the cached bound of a query leaf from its points' candidate
/// lists and carries the change up through its ancestors.
///
/// A node's bound is the worst candidate distance over all query points
/// beneath it: no reference subtree whose best case fails to beat it can
/// improve any of those queries.
fn refresh_bounds<P: SortPolicy, T: SpatialTree>(
    query_tree: &T,
    lists: &[CandidateList<P>],
    bounds: &mut [f64],
    leaf: usize,
) {
    bounds[leaf] = query_tree
        .points(leaf)
        .iter()
        .map(|&q| lists[q].worst_distance())
        .fold(P::best_distance(), P::worse);

    let mut node = leaf;
    while let Some(parent) = query_tree.node(node).parent {
        let bound = query_tree.children(parent).iter().map(|&c| bounds[c]).fold(P::best_distance(), P::worse);
        if bound == bounds[parent] {
            break;
        }
        bounds[parent] = bound;
        node = parent;
    }
}

/// Traverses a query tree and a reference tree together, pruning whole
/// node pairs at once.
pub(crate) fn dual_tree_search<P: SortPolicy, M: Metric, T: SpatialTree>(
    metric: &M,
    query_tree: &T,
    reference_tree: &T,
    k: usize,
    epsilon: f64,
    exclusion: Exclusion<'_>,
    stats: &mut SearchStats,
) -> NeighborResult {
    let queries = query_tree.dataset();
    let references = reference_tree.dataset();
    let mut lists: Vec<CandidateList<P>> = (0..queries.len()).map(|_| CandidateList::new(k)).collect();
    let mut bounds = vec![P::worst_distance(); query_tree.num_nodes()];

    let (q_root, r_root) = (query_tree.root(), reference_tree.root());
    let mut stack = vec![(q_root, r_root, P::best_node_to_node(query_tree.bound(q_root), reference_tree.bound(r_root)))];

    while let Some((q_node, r_node, score)) = stack.pop() {
        if P::can_prune(score, P::relax(bounds[q_node], epsilon)) {
            stats.pruned += 1;
            continue;
        }

        let q_children = query_tree.children(q_node);
        let r_children = reference_tree.children(r_node);
        let pairs: Vec<(usize, usize)> = match (q_children.is_empty(), r_children.is_empty()) {
            (true, true) => {
                for &q in query_tree.points(q_node) {
                    let query = queries.point(q);
                    for &r in reference_tree.points(r_node) {
                        if exclusion.skips(q, r) {
                            continue;
                        }
                        stats.base_cases += 1;
                        lists[q].insert(metric.evaluate(query, references.point(r)), r);
                    }
                }
                refresh_bounds(query_tree, &lists, &mut bounds, q_node);
                continue;
            }
            (true, false) => r_children.iter().map(|&r| (q_node, r)).collect(),
            (false, true) => q_children.iter().map(|&q| (q, r_node)).collect(),
            (false, false) => q_children.iter().flat_map(|&q| r_children.iter().map(move |&r| (q, r))).collect(),
        };

        let mut scored: Vec<((usize, usize), f64)> = Vec::with_capacity(pairs.len());
        for (q, r) in pairs {
            let score = P::best_node_to_node(query_tree.bound(q), reference_tree.bound(r));
            if P::can_prune(score, P::relax(bounds[q], epsilon)) {
                stats.pruned += 1;
            } else {
                scored.push(((q, r), score));
            }
        }
        worst_first::<P, _>(&mut scored);
        stack.extend(scored.into_iter().map(|((q, r), score)| (q, r, score)));
    }

    trace!("dual-tree search: {} base cases, {} node pairs pruned", stats.base_cases, stats.pruned);
    collect(&lists, k)
}
