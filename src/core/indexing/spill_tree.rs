// src/core/indexing/spill_tree.rs

//! Spill tree: a kd-style tree whose sibling regions may overlap.
//!
//! A node splits on the midpoint `s` of its widest dimension. With overlap
//! radius `tau`, the left child takes every point with `x <= s + tau` and
//! the right child every point with `x > s - tau`, so points near the
//! boundary land in both. If either overlapping child would hold more than
//! `rho` of the parent's points the node splits without overlap instead.

use super::bound::HRectBound;
use super::traits::{NodeId, SpatialTree, TreeNode};
use super::Bound;
use crate::core::common::KnnError;
use crate::core::types::{Permutation, PointSet};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpillTreeParams {
    /// Overlap radius; zero gives a plain partitioning tree.
    pub tau: f64,
    pub leaf_size: usize,
    /// Largest share of its parent's points an overlapping child may hold.
    pub rho: f64,
}

impl Default for SpillTreeParams {
    fn default() -> Self {
        Self { tau: 0.0, leaf_size: 20, rho: 0.7 }
    }
}

impl SpillTreeParams {
    pub fn with_tau(tau: f64) -> Self {
        Self { tau, ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), KnnError> {
        if !self.tau.is_finite() || self.tau < 0.0 {
            return Err(KnnError::invalid(format!("tau must be a finite non-negative value, got {}", self.tau)));
        }
        if self.leaf_size == 0 {
            return Err(KnnError::invalid("leaf size must be at least 1"));
        }
        if !(self.rho > 0.0 && self.rho < 1.0) {
            return Err(KnnError::invalid(format!("rho must lie strictly between 0 and 1, got {}", self.rho)));
        }
        Ok(())
    }
}

/// Tree over a point set kept in its original order. Leaves may share points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpillTree {
    nodes: Vec<TreeNode<HRectBound>>,
    /// Whether node `id` was split with overlap.
    overlapping: Vec<bool>,
    dataset: PointSet,
    params: SpillTreeParams,
}

impl SpillTree {
    pub fn tau(&self) -> f64 {
        self.params.tau
    }

    pub fn is_overlapping(&self, id: NodeId) -> bool {
        self.overlapping[id]
    }

    /// Splits `members` of node `id`, returning the two child point sets or
    /// `None` when the node should stay a leaf.
    fn split_members(&mut self, id: NodeId, members: &mut [usize]) -> Option<(Vec<usize>, Vec<usize>)> {
        let dim = self.dataset.dim();
        let extent = HRectBound::from_points(dim, members.iter().map(|&i| self.dataset.point(i)));
        let (axis, width) = extent.widest_dimension();
        if members.len() <= self.params.leaf_size || width <= 0.0 {
            return None;
        }

        let split = extent.lo()[axis] + width / 2.0;
        let tau = self.params.tau;
        let coord = |i: usize| self.dataset.point(i)[axis];

        // overlap needs every coordinate on one side of split +/- tau
        if tau > 0.0 && split.is_finite() && members.iter().all(|&i| coord(i).is_finite()) {
            let left: Vec<usize> = members.iter().copied().filter(|&i| coord(i) <= split + tau).collect();
            let right: Vec<usize> = members.iter().copied().filter(|&i| coord(i) > split - tau).collect();
            let limit = self.params.rho * members.len() as f64;
            if (left.len() as f64) <= limit && (right.len() as f64) <= limit {
                self.overlapping[id] = true;
                return Some((left, right));
            }
        }

        let (left, right): (Vec<usize>, Vec<usize>) = members.iter().copied().partition(|&i| coord(i) <= split);
        if !left.is_empty() && !right.is_empty() {
            return Some((left, right));
        }
        members.sort_by(|&a, &b| coord(a).partial_cmp(&coord(b)).unwrap_or(Ordering::Equal));
        let (left, right) = members.split_at(members.len() / 2);
        Some((left.to_vec(), right.to_vec()))
    }
}

impl SpatialTree for SpillTree {
    type Bound = HRectBound;
    type Params = SpillTreeParams;

    const TREE_NAME: &'static str = "spill tree";

    fn build(points: PointSet, params: &Self::Params) -> Result<(Self, Option<Permutation>), KnnError> {
        params.validate()?;

        let n = points.len();
        let dim = points.dim();
        let mut tree = Self {
            nodes: vec![TreeNode::leaf(HRectBound::empty(), Vec::new(), None)],
            overlapping: vec![false],
            dataset: points,
            params: *params,
        };

        let mut pending: Vec<(NodeId, Vec<usize>)> = vec![(0, (0..n).collect())];
        while let Some((id, mut members)) = pending.pop() {
            tree.nodes[id].bound = HRectBound::from_points(dim, members.iter().map(|&i| tree.dataset.point(i)));
            match tree.split_members(id, &mut members) {
                None => tree.nodes[id].points = members,
                Some((left, right)) => {
                    let first = tree.nodes.len();
                    for side in [left, right] {
                        let child = tree.nodes.len();
                        tree.nodes.push(TreeNode::leaf(HRectBound::empty(), Vec::new(), Some(id)));
                        tree.overlapping.push(false);
                        pending.push((child, side));
                    }
                    tree.nodes[id].children = vec![first, first + 1];
                }
            }
        }

        let stored: usize = tree.nodes.iter().map(|node| node.points.len()).sum();
        debug!(
            "built spill tree (tau {}) with {} nodes over {} points, {} leaf entries",
            params.tau,
            tree.nodes.len(),
            n,
            stored
        );
        Ok((tree, None))
    }

    fn dataset(&self) -> &PointSet {
        &self.dataset
    }

    fn nodes(&self) -> &[TreeNode<HRectBound>] {
        &self.nodes
    }

    fn root(&self) -> NodeId {
        0
    }

    fn params(&self) -> &Self::Params {
        &self.params
    }
}
