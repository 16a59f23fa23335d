// src/core/indexing/binary_space/builder.rs

//! Logic for building a binary space tree from a point set.

use super::{BinarySpaceTree, LeafSizeParams, SplitBound};
use crate::core::common::KnnError;
use crate::core::indexing::bound::HRectBound;
use crate::core::indexing::traits::{NodeId, TreeNode};
use crate::core::indexing::Bound;
use crate::core::types::{Permutation, PointSet};
use log::debug;
use std::cmp::Ordering;

/// A node waiting to be split: its arena id and the range `[begin, begin + count)`
/// of the working order it owns.
struct PendingNode {
    id: NodeId,
    begin: usize,
    count: usize,
}

/// Builds a binary space tree, taking ownership of `points`.
///
/// Each node is split on the dimension where its points spread widest, at the
/// midpoint of that extent. When the midpoint leaves one side empty the node
/// is split at the median instead. Nodes with at most `leaf_size` points, or
/// whose points are all identical, become leaves.
///
/// # Returns
/// The tree (whose dataset is in the new order) and the old-from-new
/// permutation describing that reordering.
pub fn build_binary_space_tree<B: SplitBound>(
    points: PointSet,
    params: &LeafSizeParams,
) -> Result<(BinarySpaceTree<B>, Permutation), KnnError> {
    if params.leaf_size == 0 {
        return Err(KnnError::invalid("leaf size must be at least 1"));
    }

    let dim = points.dim();
    let n = points.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut nodes: Vec<TreeNode<B>> = vec![TreeNode::leaf(node_bound(&points, &order), Vec::new(), None)];
    let mut pending = vec![PendingNode { id: 0, begin: 0, count: n }];

    while let Some(PendingNode { id, begin, count }) = pending.pop() {
        let range = &mut order[begin..begin + count];
        let extent = HRectBound::from_points(dim, range.iter().map(|&i| points.point(i)));
        let (axis, width) = extent.widest_dimension();

        if count <= params.leaf_size || width <= 0.0 {
            nodes[id].points = (begin..begin + count).collect();
            continue;
        }

        let split_value = extent.lo()[axis] + width / 2.0;
        let mut left_count = partition(range, |i| points.point(i)[axis] <= split_value);
        if left_count == 0 || left_count == count {
            range.sort_unstable_by(|&a, &b| {
                points.point(a)[axis].partial_cmp(&points.point(b)[axis]).unwrap_or(Ordering::Equal)
            });
            left_count = count / 2;
        }

        let left = nodes.len();
        let right = left + 1;
        let left_bound = node_bound(&points, &order[begin..begin + left_count]);
        let right_bound = node_bound(&points, &order[begin + left_count..begin + count]);
        nodes.push(TreeNode::leaf(left_bound, Vec::new(), Some(id)));
        nodes.push(TreeNode::leaf(right_bound, Vec::new(), Some(id)));
        nodes[id].children = vec![left, right];

        pending.push(PendingNode { id: right, begin: begin + left_count, count: count - left_count });
        pending.push(PendingNode { id: left, begin, count: left_count });
    }

    debug!("built {} with {} nodes over {} points (leaf size {})", B::TREE_NAME, nodes.len(), n, params.leaf_size);

    let dataset = points.select_columns(&order);
    let permutation = Permutation::from_old_from_new(order)?;
    Ok((BinarySpaceTree { nodes, dataset, params: *params }, permutation))
}

fn node_bound<B: SplitBound>(points: &PointSet, members: &[usize]) -> B {
    B::from_points(points.dim(), members.iter().map(|&i| points.point(i)))
}

/// Moves every index for which `goes_left` holds to the front and returns
/// how many there were.
fn partition(indices: &mut [usize], mut goes_left: impl FnMut(usize) -> bool) -> usize {
    let mut left = 0;
    for i in 0..indices.len() {
        if goes_left(indices[i]) {
            indices.swap(left, i);
            left += 1;
        }
    }
    left
}
