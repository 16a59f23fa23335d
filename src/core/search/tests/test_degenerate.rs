//! Builds and searches over extreme coordinates: every tree must either
//! index the points or fail cleanly, never hang.

use crate::core::common::KnnError;
use crate::core::indexing::{
    BallTree, CoverTree, CoverTreeParams, KdTree, LeafSizeParams, RStarTree, RTree, RectangleParams, SpatialTree, SpillTree,
    SpillTreeParams, XTree,
};
use crate::core::search::NeighborSearch;
use crate::core::sort::NearestNeighborSort;
use crate::core::types::PointSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn small_rectangles() -> RectangleParams {
    RectangleParams { max_leaf_size: 4, min_leaf_size: 2, max_num_children: 4, min_num_children: 2 }
}

/// Coordinates whose squared distances overflow to infinity.
fn overflowing() -> PointSet {
    let mut pts = vec![vec![0.0, 0.0], vec![1e200, 1e200], vec![-1e200, 3.0]];
    pts.extend((0..20).map(|i| vec![i as f64 * 1e199, -(i as f64) * 3e199]));
    PointSet::from_points(&pts).unwrap()
}

fn with_infinities() -> PointSet {
    let mut pts: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 4) as f64]).collect();
    pts.push(vec![f64::INFINITY, 0.0]);
    pts.push(vec![0.0, f64::NEG_INFINITY]);
    pts.push(vec![f64::NAN, 1.0]);
    PointSet::from_points(&pts).unwrap()
}

fn assert_indexes_every_point<T: SpatialTree>(points: PointSet, params: &T::Params) {
    let n = points.len();
    let (tree, _) = T::build(points, params).unwrap();
    let mut covered = tree.descendant_points(tree.root());
    covered.sort_unstable();
    covered.dedup();
    assert_eq!(covered, (0..n).collect::<Vec<_>>(), "{} lost points", T::TREE_NAME);
}

#[test]
fn test_partitioning_trees_survive_overflowing_distances() {
    for points in [overflowing(), with_infinities()] {
        assert_indexes_every_point::<KdTree>(points.clone(), &LeafSizeParams { leaf_size: 2 });
        assert_indexes_every_point::<BallTree>(points.clone(), &LeafSizeParams { leaf_size: 2 });
        assert_indexes_every_point::<RTree>(points.clone(), &small_rectangles());
        assert_indexes_every_point::<RStarTree>(points.clone(), &small_rectangles());
        assert_indexes_every_point::<XTree>(points.clone(), &small_rectangles());
        assert_indexes_every_point::<SpillTree>(points, &SpillTreeParams { tau: 0.5, leaf_size: 2, rho: 0.7 });
    }
}

#[test]
fn test_cover_tree_reports_overflow() {
    for points in [overflowing(), with_infinities()] {
        let result = CoverTree::build(points, &CoverTreeParams::default());
        assert!(matches!(result, Err(KnnError::Build(_))));
    }
}

#[test]
fn test_search_over_overflowing_distances_returns() {
    let mut engine = NeighborSearch::<NearestNeighborSort, KdTree>::new(false, false, LeafSizeParams { leaf_size: 2 });
    engine.train(overflowing()).unwrap();
    let result = engine.search_self(3).unwrap();
    assert_eq!(result.n_queries(), 23);
    // every distance reported is a real one
    for (n, d) in result.neighbors.as_slice().iter().zip(result.distances.as_slice()) {
        assert_eq!(n.is_some(), d.is_finite());
    }
}

#[test]
fn test_large_finite_coordinates_agree_with_naive() {
    let mut rng = StdRng::seed_from_u64(17);
    let pts: Vec<Vec<f64>> = (0..120).map(|_| vec![rng.gen_range(-1e150..1e150), rng.gen_range(-1e150..1e150)]).collect();
    let references = PointSet::from_points(&pts).unwrap();

    let mut naive = NeighborSearch::<NearestNeighborSort, CoverTree>::new(true, false, CoverTreeParams::default());
    naive.train(references.clone()).unwrap();
    let expected = naive.search_self(4).unwrap();

    for single_mode in [true, false] {
        let mut cover = NeighborSearch::<NearestNeighborSort, CoverTree>::new(false, single_mode, CoverTreeParams::default());
        cover.train(references.clone()).unwrap();
        assert_eq!(cover.search_self(4).unwrap(), expected);

        let mut ball = NeighborSearch::<NearestNeighborSort, BallTree>::new(false, single_mode, LeafSizeParams { leaf_size: 5 });
        ball.train(references.clone()).unwrap();
        assert_eq!(ball.search_self(4).unwrap(), expected);

        let mut xtree = NeighborSearch::<NearestNeighborSort, XTree>::new(false, single_mode, small_rectangles());
        xtree.train(references.clone()).unwrap();
        assert_eq!(xtree.search_self(4).unwrap(), expected);
    }
}

#[test]
fn test_failed_naive_switch_keeps_points() {
    let mut engine = NeighborSearch::<NearestNeighborSort, CoverTree>::new(true, false, CoverTreeParams::default());
    engine.train(overflowing()).unwrap();
    let before = engine.search_self(2).unwrap();

    assert!(matches!(engine.set_naive(false), Err(KnnError::Build(_))));
    assert!(engine.naive());
    assert!(engine.is_trained());
    assert_eq!(engine.reference_set().unwrap().as_slice(), overflowing().as_slice());
    assert_eq!(engine.search_self(2).unwrap().neighbors, before.neighbors);
}

#[test]
fn test_failed_retrain_keeps_previous_tree() {
    let mut engine = NeighborSearch::<NearestNeighborSort, CoverTree>::new(false, true, CoverTreeParams::default());
    let references = PointSet::from_points(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 2.0]]).unwrap();
    engine.train(references.clone()).unwrap();

    assert!(engine.train(overflowing()).is_err());
    assert_eq!(engine.reference_set().unwrap().as_slice(), references.as_slice());
    assert_eq!(engine.search_self(1).unwrap().neighbors.col(0), &[Some(1)]);
}
