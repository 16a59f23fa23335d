// src/core/indexing/cover_tree.rs

//! Cover tree over scale levels.
//!
//! Every node is centered on one of its own points. A node whose points lie
//! within `max_d` of its center has children at the next scale down, each
//! covering a radius of `base^(ceil(log_base(max_d)) - 1)`. The first child
//! always keeps the parent's center (the self-child). Points are indexed in
//! place, so building produces no permutation.

use super::bound::BallBound;
use super::traits::{NodeId, SpatialTree, TreeNode};
use crate::core::common::KnnError;
use crate::core::metric::squared_euclidean;
use crate::core::types::{Permutation, PointSet};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverTreeParams {
    /// Ratio between consecutive scale levels; must exceed 1.
    pub base: f64,
}

impl Default for CoverTreeParams {
    fn default() -> Self {
        Self { base: 2.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverTree {
    nodes: Vec<TreeNode<BallBound>>,
    /// Index of the point each node is centered on.
    centers: Vec<usize>,
    dataset: PointSet,
    params: CoverTreeParams,
}

struct PendingCover {
    id: NodeId,
    center: usize,
    members: Vec<usize>,
}

impl CoverTree {
    /// Point index node `id` is centered on.
    pub fn center_point(&self, id: NodeId) -> usize {
        self.centers[id]
    }

    fn distance(&self, a: usize, b: usize) -> f64 {
        squared_euclidean(self.dataset.point(a), self.dataset.point(b)).sqrt()
    }

    /// Radius children of a node with furthest descendant `max_d` cover.
    fn child_radius(base: f64, max_d: f64) -> f64 {
        let mut scale = (max_d.ln() / base.ln()).ceil();
        // log rounding can land one level off either way
        while base.powf(scale) < max_d {
            scale += 1.0;
        }
        while base.powf(scale - 1.0) >= max_d {
            scale -= 1.0;
        }
        base.powf(scale - 1.0)
    }

    fn split_pending(&mut self, pending: PendingCover, stack: &mut Vec<PendingCover>) -> Result<(), KnnError> {
        let PendingCover { id, center, members } = pending;
        let max_d = members.iter().map(|&m| self.distance(center, m)).fold(0.0, f64::max);
        if !max_d.is_finite() {
            return Err(KnnError::Build(format!(
                "cover tree distances from point {} overflow to {}; coordinates are too large to index",
                center, max_d
            )));
        }
        self.nodes[id].bound = BallBound::new(self.dataset.point(center).to_vec(), max_d);

        if members.len() <= 1 || max_d <= 0.0 {
            self.nodes[id].points = members;
            return Ok(());
        }

        let radius = Self::child_radius(self.params.base, max_d);
        let mut remaining = members;
        let mut next_center = Some(center);
        let mut children = Vec::new();
        while let Some(c) = next_center {
            let (covered, rest): (Vec<usize>, Vec<usize>) =
                remaining.into_iter().partition(|&m| m == c || self.distance(c, m) <= radius);
            remaining = rest;

            let child = self.nodes.len();
            self.nodes.push(TreeNode::leaf(BallBound::new(Vec::new(), 0.0), Vec::new(), Some(id)));
            self.centers.push(c);
            children.push(child);
            stack.push(PendingCover { id: child, center: c, members: covered });

            next_center = remaining.first().copied();
        }
        self.nodes[id].children = children;
        Ok(())
    }
}

impl SpatialTree for CoverTree {
    type Bound = BallBound;
    type Params = CoverTreeParams;

    const TREE_NAME: &'static str = "cover tree";

    fn build(points: PointSet, params: &Self::Params) -> Result<(Self, Option<Permutation>), KnnError> {
        if params.base <= 1.0 || !params.base.is_finite() {
            return Err(KnnError::invalid(format!("cover tree base must be a finite value above 1, got {}", params.base)));
        }

        let n = points.len();
        let mut tree = Self {
            nodes: vec![TreeNode::leaf(BallBound::new(Vec::new(), 0.0), Vec::new(), None)],
            centers: vec![0],
            dataset: points,
            params: *params,
        };
        if n > 0 {
            let mut stack = vec![PendingCover { id: 0, center: 0, members: (0..n).collect() }];
            while let Some(pending) = stack.pop() {
                tree.split_pending(pending, &mut stack)?;
            }
        }

        debug!("built cover tree with {} nodes over {} points, depth {}", tree.nodes.len(), n, tree.depth());
        Ok((tree, None))
    }

    fn dataset(&self) -> &PointSet {
        &self.dataset
    }

    fn nodes(&self) -> &[TreeNode<BallBound>] {
        &self.nodes
    }

    fn root(&self) -> NodeId {
        0
    }

    fn params(&self) -> &Self::Params {
        &self.params
    }
}
