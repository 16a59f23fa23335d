// src/core/indexing/rectangle/split.rs

//! Descent and split rules for the R, R* and X trees.

use super::{InternalSplit, RectangleSplit, RectangleTree, SplitPlan};
use crate::core::indexing::bound::{Bound, HRectBound};
use crate::core::indexing::traits::NodeId;
use crate::core::metric::squared_euclidean;
use std::cmp::Ordering;

/// Largest overlap (as a share of the union volume) an X tree accepts
/// between the two halves of a split internal node.
const MAX_OVERLAP: f64 = 0.2;

/// Guttman's R tree: least-enlargement descent, quadratic split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RTreeSplit;

/// R* tree: overlap-aware descent, margin-driven split and forced reinsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RStarTreeSplit;

/// X tree: R* descent and split, with supernodes instead of high-overlap
/// internal splits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XTreeSplit;

impl RectangleSplit for RTreeSplit {
    const TREE_NAME: &'static str = "R tree";
    const FORCED_REINSERT: bool = false;

    fn choose_child(tree: &RectangleTree<Self>, node: NodeId, point: &[f64]) -> NodeId {
        least_enlargement(tree, &tree.nodes[node].children, point)
    }

    fn split_leaf(entries: &[HRectBound], min_fill: usize) -> SplitPlan {
        quadratic_split(entries, min_fill)
    }
}

impl RectangleSplit for RStarTreeSplit {
    const TREE_NAME: &'static str = "R* tree";
    const FORCED_REINSERT: bool = true;

    fn choose_child(tree: &RectangleTree<Self>, node: NodeId, point: &[f64]) -> NodeId {
        rstar_choose_child(tree, node, point)
    }

    fn split_leaf(entries: &[HRectBound], min_fill: usize) -> SplitPlan {
        rstar_split(entries, min_fill)
    }
}

impl RectangleSplit for XTreeSplit {
    const TREE_NAME: &'static str = "X tree";
    const FORCED_REINSERT: bool = false;

    fn choose_child(tree: &RectangleTree<Self>, node: NodeId, point: &[f64]) -> NodeId {
        rstar_choose_child(tree, node, point)
    }

    fn split_leaf(entries: &[HRectBound], min_fill: usize) -> SplitPlan {
        rstar_split(entries, min_fill)
    }

    /// Falls back to a minimal-overlap split along an axis from the node's
    /// split history, and to a supernode when that still overlaps too much.
    fn split_internal(tree: &RectangleTree<Self>, node: NodeId, entries: &[HRectBound], min_fill: usize) -> InternalSplit {
        let plan = rstar_split(entries, min_fill);
        if overlap_ratio(entries, &plan) <= MAX_OVERLAP {
            return InternalSplit::Split(plan);
        }

        let mut best: Option<(f64, SplitPlan)> = None;
        for &axis in tree.split_axes(node) {
            for order in sorted_orders(entries, axis) {
                for plan in distributions(&order, min_fill, Some(axis)) {
                    let ratio = overlap_ratio(entries, &plan);
                    if best.as_ref().map_or(true, |(r, _)| ratio < *r) {
                        best = Some((ratio, plan));
                    }
                }
            }
        }
        match best {
            Some((ratio, plan)) if ratio <= MAX_OVERLAP => InternalSplit::Split(plan),
            _ => InternalSplit::Supernode,
        }
    }
}

fn group_bound(entries: &[HRectBound], members: &[usize]) -> HRectBound {
    let mut bound = HRectBound::empty();
    for &i in members {
        bound.expand(&entries[i]);
    }
    bound
}

fn overlap_ratio(entries: &[HRectBound], plan: &SplitPlan) -> f64 {
    let left = group_bound(entries, &plan.left);
    let right = group_bound(entries, &plan.right);
    let union = left.union(&right).volume();
    if union > 0.0 {
        left.overlap(&right) / union
    } else {
        0.0
    }
}

fn least_enlargement<S: RectangleSplit>(tree: &RectangleTree<S>, children: &[NodeId], point: &[f64]) -> NodeId {
    let target = HRectBound::from_point(point);
    let mut best = children[0];
    let mut best_key = (f64::INFINITY, f64::INFINITY);
    for &c in children {
        let bound = &tree.nodes[c].bound;
        let key = (bound.enlargement(&target), bound.volume());
        if key < best_key {
            best_key = key;
            best = c;
        }
    }
    best
}

/// Above leaves, minimise the overlap the grown child would add with its
/// siblings; higher up, fall back to least enlargement.
fn rstar_choose_child<S: RectangleSplit>(tree: &RectangleTree<S>, node: NodeId, point: &[f64]) -> NodeId {
    let children = &tree.nodes[node].children;
    if !tree.nodes[children[0]].is_leaf() {
        return least_enlargement(tree, children, point);
    }
    let bound = |id: NodeId| &tree.nodes[id].bound;

    let target = HRectBound::from_point(point);
    let mut best = children[0];
    let mut best_key = (f64::INFINITY, f64::INFINITY, f64::INFINITY);
    for &c in children {
        let grown = bound(c).union(&target);
        let overlap_growth: f64 = children
            .iter()
            .filter(|&&o| o != c)
            .map(|&o| grown.overlap(bound(o)) - bound(c).overlap(bound(o)))
            .sum();
        let key = (overlap_growth, bound(c).enlargement(&target), bound(c).volume());
        if key < best_key {
            best_key = key;
            best = c;
        }
    }
    best
}

/// Quadratic split: seed the two groups with the most wasteful pair, then
/// assign the entry with the strongest preference first.
fn quadratic_split(entries: &[HRectBound], min_fill: usize) -> SplitPlan {
    let n = entries.len();
    let min_fill = min_fill.clamp(1, n / 2);

    let (mut seed_a, mut seed_b) = (0, 1);
    let mut worst = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for i in 0..n {
        for j in i + 1..n {
            let waste = entries[i].union(&entries[j]).volume() - entries[i].volume() - entries[j].volume();
            let spread = squared_euclidean(&entries[i].center(), &entries[j].center());
            if (waste, spread) > worst {
                worst = (waste, spread);
                seed_a = i;
                seed_b = j;
            }
        }
    }

    let mut left = vec![seed_a];
    let mut right = vec![seed_b];
    let mut left_bound = entries[seed_a].clone();
    let mut right_bound = entries[seed_b].clone();
    let mut remaining: Vec<usize> = (0..n).filter(|&i| i != seed_a && i != seed_b).collect();

    while !remaining.is_empty() {
        if left.len() + remaining.len() <= min_fill {
            left.append(&mut remaining);
            break;
        }
        if right.len() + remaining.len() <= min_fill {
            right.append(&mut remaining);
            break;
        }

        let mut pick = 0;
        let mut strongest = f64::NEG_INFINITY;
        for (pos, &i) in remaining.iter().enumerate() {
            let preference = (left_bound.enlargement(&entries[i]) - right_bound.enlargement(&entries[i])).abs();
            if preference > strongest {
                strongest = preference;
                pick = pos;
            }
        }
        let i = remaining.swap_remove(pick);

        let grow_left = left_bound.enlargement(&entries[i]);
        let grow_right = right_bound.enlargement(&entries[i]);
        let to_left = match grow_left.partial_cmp(&grow_right) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => match left_bound.volume().partial_cmp(&right_bound.volume()) {
                Some(Ordering::Less) => true,
                Some(Ordering::Greater) => false,
                _ => left.len() <= right.len(),
            },
        };
        if to_left {
            left.push(i);
            left_bound.expand(&entries[i]);
        } else {
            right.push(i);
            right_bound.expand(&entries[i]);
        }
    }

    SplitPlan { left, right, axis: None }
}

/// Entry positions sorted along `axis`, once by lower and once by upper edge.
fn sorted_orders(entries: &[HRectBound], axis: usize) -> [Vec<usize>; 2] {
    let by = |edge: fn(&HRectBound) -> &[f64]| {
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|&a, &b| {
            let ea = edge(&entries[a]).get(axis).copied().unwrap_or(0.0);
            let eb = edge(&entries[b]).get(axis).copied().unwrap_or(0.0);
            ea.partial_cmp(&eb).unwrap_or(Ordering::Equal)
        });
        order
    };
    [by(HRectBound::lo), by(HRectBound::hi)]
}

/// Every split of `order` into a prefix and suffix that both hold at least
/// `min_fill` entries.
fn distributions(order: &[usize], min_fill: usize, axis: Option<usize>) -> impl Iterator<Item = SplitPlan> + '_ {
    let n = order.len();
    let min_fill = min_fill.clamp(1, n / 2);
    (min_fill..=n - min_fill).map(move |k| SplitPlan {
        left: order[..k].to_vec(),
        right: order[k..].to_vec(),
        axis,
    })
}

/// R* split: pick the axis with the smallest summed margin over all
/// distributions, then the distribution on it with the least overlap
/// (ties broken by total volume).
fn rstar_split(entries: &[HRectBound], min_fill: usize) -> SplitPlan {
    let dim = entries.first().map_or(0, |e| e.lo().len());

    let mut best_axis = 0;
    let mut best_margin = f64::INFINITY;
    for axis in 0..dim {
        let mut margin = 0.0;
        for order in sorted_orders(entries, axis) {
            for plan in distributions(&order, min_fill, None) {
                margin += group_bound(entries, &plan.left).margin() + group_bound(entries, &plan.right).margin();
            }
        }
        if margin < best_margin {
            best_margin = margin;
            best_axis = axis;
        }
    }

    let mut best: Option<((f64, f64), SplitPlan)> = None;
    for order in sorted_orders(entries, best_axis) {
        for plan in distributions(&order, min_fill, Some(best_axis)) {
            let left = group_bound(entries, &plan.left);
            let right = group_bound(entries, &plan.right);
            let key = (left.overlap(&right), left.volume() + right.volume());
            if best.as_ref().map_or(true, |(k, _)| key < *k) {
                best = Some((key, plan));
            }
        }
    }

    match best {
        Some((_, plan)) => plan,
        None => {
            let half = entries.len() / 2;
            SplitPlan { left: (0..half).collect(), right: (half..entries.len()).collect(), axis: None }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(coords: &[[f64; 2]]) -> Vec<HRectBound> {
        coords.iter().map(|c| HRectBound::from_point(c)).collect()
    }

    fn assert_valid(plan: &SplitPlan, n: usize, min_fill: usize) {
        let mut all: Vec<usize> = plan.left.iter().chain(&plan.right).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<_>>());
        assert!(plan.left.len() >= min_fill && plan.right.len() >= min_fill);
    }

    #[test]
    fn test_quadratic_split_separates_clusters() {
        let entries = points(&[[0.0, 0.0], [0.1, 0.2], [10.0, 10.0], [10.1, 9.9], [0.2, 0.1], [9.8, 10.2]]);
        let plan = quadratic_split(&entries, 2);
        assert_valid(&plan, 6, 2);
        let left_low = plan.left.iter().all(|&i| entries[i].lo()[0] < 5.0);
        let right_low = plan.right.iter().all(|&i| entries[i].lo()[0] < 5.0);
        assert!(left_low != right_low);
    }

    #[test]
    fn test_rstar_split_chooses_spread_axis() {
        let entries = points(&[[0.0, 0.0], [1.0, 0.1], [2.0, 0.0], [3.0, 0.1], [4.0, 0.0]]);
        let plan = rstar_split(&entries, 2);
        assert_valid(&plan, 5, 2);
        assert_eq!(plan.axis, Some(0));
    }

    #[test]
    fn test_splits_handle_duplicates() {
        let entries = points(&[[1.0, 1.0]; 7]);
        assert_valid(&quadratic_split(&entries, 3), 7, 3);
        assert_valid(&rstar_split(&entries, 3), 7, 3);
    }

    #[test]
    fn test_distributions_respect_min_fill() {
        let order: Vec<usize> = (0..6).collect();
        let sizes: Vec<usize> = distributions(&order, 2, None).map(|p| p.left.len()).collect();
        assert_eq!(sizes, vec![2, 3, 4]);
    }
}
