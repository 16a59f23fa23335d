// src/core/sort.rs

//! Ordering policies: nearest-first and furthest-first.
//!
//! The policy decides which of two distances is better, what the worst
//! possible distance is (the bound of an unfilled candidate list) and which
//! side of a node's bound is the best case for pruning. Nothing else in the
//! crate hard-codes a direction.

use crate::core::indexing::Bound;
use std::cmp::Ordering;
use std::fmt::Debug;

pub trait SortPolicy: Copy + Debug + Default + Send + Sync + 'static {
    /// Short direction label.
    const NAME: &'static str;
    /// Name of the persisted model record for this direction.
    const MODEL_NAME: &'static str;

    /// True when `value` is strictly better than `reference`.
    fn is_better(value: f64, reference: f64) -> bool;

    /// Distance of an empty candidate slot; every real distance beats it.
    fn worst_distance() -> f64;

    fn best_distance() -> f64;

    /// Best distance any point inside `bound` could have to `point`.
    fn best_point_to_node<B: Bound>(bound: &B, point: &[f64]) -> f64;

    /// Best distance any pair of points from the two bounds could have.
    fn best_node_to_node<B: Bound>(a: &B, b: &B) -> f64;

    /// The worse of two distances.
    fn worse(a: f64, b: f64) -> f64 {
        if Self::is_better(a, b) {
            b
        } else {
            a
        }
    }

    /// Best-first ordering.
    fn compare(a: f64, b: f64) -> Ordering {
        if Self::is_better(a, b) {
            Ordering::Less
        } else if Self::is_better(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Loosens a pruning bound by the relative error `epsilon`, in the
    /// direction that prunes more. `relax(v, 0.0) == v`.
    fn relax(value: f64, epsilon: f64) -> f64;

    /// True when a subtree whose best case is strictly worse than `bound`
    /// cannot hold a candidate. A tie is kept, since a lower-indexed point at
    /// the bound still displaces the worst candidate.
    fn can_prune(best_case: f64, bound: f64) -> bool {
        Self::is_better(bound, best_case)
    }
}

/// Keeps the k smallest distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NearestNeighborSort;

/// Keeps the k largest distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FurthestNeighborSort;

impl SortPolicy for NearestNeighborSort {
    const NAME: &'static str = "nearest";
    const MODEL_NAME: &'static str = "nearest_neighbor_search_model";

    #[inline]
    fn is_better(value: f64, reference: f64) -> bool {
        value < reference
    }

    fn worst_distance() -> f64 {
        f64::INFINITY
    }

    fn best_distance() -> f64 {
        0.0
    }

    #[inline]
    fn relax(value: f64, epsilon: f64) -> f64 {
        if epsilon == 0.0 || !value.is_finite() {
            value
        } else {
            value / (1.0 + epsilon)
        }
    }

    #[inline]
    fn best_point_to_node<B: Bound>(bound: &B, point: &[f64]) -> f64 {
        bound.min_distance_to_point(point)
    }

    #[inline]
    fn best_node_to_node<B: Bound>(a: &B, b: &B) -> f64 {
        a.min_distance(b)
    }
}

impl SortPolicy for FurthestNeighborSort {
    const NAME: &'static str = "furthest";
    const MODEL_NAME: &'static str = "furthest_neighbor_search_model";

    #[inline]
    fn is_better(value: f64, reference: f64) -> bool {
        value > reference
    }

    fn worst_distance() -> f64 {
        f64::NEG_INFINITY
    }

    fn best_distance() -> f64 {
        f64::INFINITY
    }

    #[inline]
    fn relax(value: f64, epsilon: f64) -> f64 {
        if epsilon == 0.0 || value <= 0.0 || !value.is_finite() {
            value
        } else if epsilon >= 1.0 {
            f64::INFINITY
        } else {
            value / (1.0 - epsilon)
        }
    }

    #[inline]
    fn best_point_to_node<B: Bound>(bound: &B, point: &[f64]) -> f64 {
        bound.max_distance_to_point(point)
    }

    #[inline]
    fn best_node_to_node<B: Bound>(a: &B, b: &B) -> f64 {
        a.max_distance(b)
    }
}
