// src/core/indexing/rectangle/tree.rs

use super::{InternalSplit, RectangleParams, RectangleSplit};
use crate::core::common::KnnError;
use crate::core::indexing::bound::{Bound, HRectBound};
use crate::core::indexing::traits::{NodeId, SpatialTree, TreeNode};
use crate::core::metric::squared_euclidean;
use crate::core::types::{Permutation, PointSet};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::marker::PhantomData;

/// Share of an overflowing leaf's points evicted for reinsertion.
const REINSERT_FRACTION: f64 = 0.3;

/// Rectangle tree built by inserting points one at a time.
///
/// `capacity[id]` is the most entries node `id` may hold before it must be
/// split; it only grows past the configured maximum for X tree supernodes.
/// `split_history[id]` lists the axes of the splits that produced node `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RectangleTree<S: RectangleSplit> {
    pub(super) nodes: Vec<TreeNode<HRectBound>>,
    pub(super) root: NodeId,
    pub(super) capacity: Vec<usize>,
    pub(super) split_history: Vec<Vec<usize>>,
    pub(super) dataset: PointSet,
    pub(super) params: RectangleParams,
    policy: PhantomData<S>,
}

impl<S: RectangleSplit> RectangleTree<S> {
    /// Most entries node `id` may hold.
    pub fn node_capacity(&self, id: NodeId) -> usize {
        self.capacity[id]
    }

    /// Axes of the splits that produced node `id`, oldest first.
    pub fn split_axes(&self, id: NodeId) -> &[usize] {
        &self.split_history[id]
    }

    /// Points held by a leaf, or children held by an internal node.
    pub fn entry_count(&self, id: NodeId) -> usize {
        let node = &self.nodes[id];
        if node.is_leaf() {
            node.points.len()
        } else {
            node.children.len()
        }
    }

    fn overflows(&self, id: NodeId) -> bool {
        self.entry_count(id) > self.capacity[id]
    }

    fn base_capacity(&self, leaf: bool) -> usize {
        if leaf {
            self.params.max_leaf_size
        } else {
            self.params.max_num_children
        }
    }

    fn recompute_bound(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        let mut bound = HRectBound::empty();
        if node.is_leaf() {
            for &p in &node.points {
                bound.expand_point(self.dataset.point(p));
            }
        } else {
            for &c in &node.children {
                bound.expand(&self.nodes[c].bound);
            }
        }
        self.nodes[id].bound = bound;
    }

    fn push_node(&mut self, node: TreeNode<HRectBound>, capacity: usize, history: Vec<usize>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.capacity.push(capacity);
        self.split_history.push(history);
        id
    }

    /// Inserts dataset point `point`, then resolves overflow bottom-up.
    fn insert(&mut self, point: usize, may_reinsert: bool) {
        let mut path = vec![self.root];
        let mut id = self.root;
        while !self.nodes[id].is_leaf() {
            id = S::choose_child(self, id, self.dataset.point(point));
            path.push(id);
        }

        self.nodes[id].points.push(point);
        for &n in &path {
            self.nodes[n].bound.expand_point(self.dataset.point(point));
        }

        for level in (0..path.len()).rev() {
            let id = path[level];
            if !self.overflows(id) {
                break;
            }
            if S::FORCED_REINSERT && may_reinsert && id != self.root && self.nodes[id].is_leaf() {
                let evicted = self.evict_for_reinsert(id);
                for &ancestor in path[..level].iter().rev() {
                    self.recompute_bound(ancestor);
                }
                trace!("reinserting {} points evicted from node {}", evicted.len(), id);
                for p in evicted {
                    self.insert(p, false);
                }
                return;
            }
            match self.split_node(id) {
                Some(sibling) => self.attach_sibling(id, sibling),
                None => break,
            }
        }
    }

    /// Removes the points furthest from the leaf's center and returns them.
    fn evict_for_reinsert(&mut self, leaf: NodeId) -> Vec<usize> {
        let center = self.nodes[leaf].bound.center();
        let mut points = std::mem::take(&mut self.nodes[leaf].points);
        let dataset = &self.dataset;
        points.sort_by(|&a, &b| {
            let da = squared_euclidean(&center, dataset.point(a));
            let db = squared_euclidean(&center, dataset.point(b));
            db.partial_cmp(&da).unwrap_or(Ordering::Equal)
        });
        let count = ((points.len() as f64 * REINSERT_FRACTION).ceil() as usize).clamp(1, points.len() - 1);
        let evicted: Vec<usize> = points.drain(..count).collect();
        self.nodes[leaf].points = points;
        self.recompute_bound(leaf);
        evicted
    }

    /// Splits `id` in two, returning the new sibling, or `None` when the
    /// node became a supernode instead.
    fn split_node(&mut self, id: NodeId) -> Option<NodeId> {
        let leaf = self.nodes[id].is_leaf();
        let entries: Vec<HRectBound> = if leaf {
            self.nodes[id].points.iter().map(|&p| HRectBound::from_point(self.dataset.point(p))).collect()
        } else {
            self.nodes[id].children.iter().map(|&c| self.nodes[c].bound.clone()).collect()
        };

        let plan = if leaf {
            S::split_leaf(&entries, self.params.min_leaf_size)
        } else {
            match S::split_internal(self, id, &entries, self.params.min_num_children) {
                InternalSplit::Split(plan) => plan,
                InternalSplit::Supernode => {
                    self.capacity[id] += self.params.max_num_children;
                    debug!("node {} became a supernode with capacity {}", id, self.capacity[id]);
                    return None;
                }
            }
        };

        if let Some(axis) = plan.axis {
            self.split_history[id].push(axis);
        }
        let history = self.split_history[id].clone();
        let parent = self.nodes[id].parent;
        let base = self.base_capacity(leaf);
        let sibling_capacity = base.max(plan.right.len());

        let sibling = if leaf {
            let points = std::mem::take(&mut self.nodes[id].points);
            self.nodes[id].points = plan.left.iter().map(|&i| points[i]).collect();
            let moved = plan.right.iter().map(|&i| points[i]).collect();
            self.push_node(TreeNode::leaf(HRectBound::empty(), moved, parent), sibling_capacity, history)
        } else {
            let children = std::mem::take(&mut self.nodes[id].children);
            self.nodes[id].children = plan.left.iter().map(|&i| children[i]).collect();
            let moved: Vec<NodeId> = plan.right.iter().map(|&i| children[i]).collect();
            let mut node = TreeNode::leaf(HRectBound::empty(), Vec::new(), parent);
            node.children = moved.clone();
            let sibling = self.push_node(node, sibling_capacity, history);
            for c in moved {
                self.nodes[c].parent = Some(sibling);
            }
            sibling
        };

        self.capacity[id] = base.max(plan.left.len());
        self.recompute_bound(id);
        self.recompute_bound(sibling);
        Some(sibling)
    }

    fn attach_sibling(&mut self, id: NodeId, sibling: NodeId) {
        match self.nodes[id].parent {
            Some(parent) => self.nodes[parent].children.push(sibling),
            None => {
                let mut root = TreeNode::leaf(HRectBound::empty(), Vec::new(), None);
                root.children = vec![id, sibling];
                let capacity = self.params.max_num_children;
                let new_root = self.push_node(root, capacity, Vec::new());
                self.nodes[id].parent = Some(new_root);
                self.nodes[sibling].parent = Some(new_root);
                self.recompute_bound(new_root);
                self.root = new_root;
            }
        }
    }
}

impl<S: RectangleSplit> SpatialTree for RectangleTree<S> {
    type Bound = HRectBound;
    type Params = RectangleParams;

    const TREE_NAME: &'static str = S::TREE_NAME;

    fn build(points: PointSet, params: &Self::Params) -> Result<(Self, Option<Permutation>), KnnError> {
        params.validate()?;

        let n = points.len();
        let mut tree = Self {
            nodes: vec![TreeNode::leaf(HRectBound::empty(), Vec::new(), None)],
            root: 0,
            capacity: vec![params.max_leaf_size],
            split_history: vec![Vec::new()],
            dataset: points,
            params: params.clone(),
            policy: PhantomData,
        };
        for point in 0..n {
            tree.insert(point, true);
        }

        debug!("built {} with {} nodes over {} points, depth {}", S::TREE_NAME, tree.nodes.len(), n, tree.depth());
        Ok((tree, None))
    }

    fn dataset(&self) -> &PointSet {
        &self.dataset
    }

    fn nodes(&self) -> &[TreeNode<HRectBound>] {
        &self.nodes
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn params(&self) -> &Self::Params {
        &self.params
    }
}
