use crate::core::common::KnnError;
use crate::core::config::SearchConfig;
use crate::core::indexing::RectangleParams;
use crate::core::model::{KfnModel, KnnModel, TreeType};
use crate::core::types::{NeighborResult, PointSet};
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

fn random_points(n: usize, dim: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let pts: Vec<Vec<f64>> = (0..n).map(|_| (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect()).collect();
    PointSet::from_points(&pts).unwrap()
}

fn assert_same_results(a: &NeighborResult, b: &NeighborResult) {
    assert_eq!(a.neighbors, b.neighbors);
    for (x, y) in a.distances.as_slice().iter().zip(b.distances.as_slice()) {
        assert_relative_eq!(*x, *y, epsilon = 1e-9);
    }
}

#[test]
fn test_random_basis_does_not_change_neighbors() {
    let references = random_points(120, 4, 1);
    let queries = random_points(25, 4, 2);
    for tree_type in TreeType::ALL {
        let mut plain = KnnModel::new(tree_type, false);
        plain.build_model(references.clone(), 10, false, false).unwrap();
        let mut rotated = KnnModel::new(tree_type, true).with_seed(99);
        rotated.build_model(references.clone(), 10, false, false).unwrap();

        assert!(plain.basis().is_none());
        assert!(rotated.basis().is_some());
        assert_same_results(&plain.search(&queries, 5).unwrap(), &rotated.search(&queries, 5).unwrap());
        assert_same_results(&plain.search_self(3).unwrap(), &rotated.search_self(3).unwrap());
    }
}

#[test]
fn test_dataset_is_the_rotated_reference_set() {
    let references = random_points(10, 3, 5);
    let mut model = KnnModel::new(TreeType::CoverTree, true).with_seed(5);
    model.build_model(references.clone(), 20, false, true).unwrap();

    let expected = model.basis().unwrap().multiply(&references).unwrap();
    let dataset = model.dataset().unwrap();
    for (a, b) in dataset.as_slice().iter().zip(expected.as_slice()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn test_json_round_trip_gives_identical_results() {
    let references = random_points(80, 3, 11);
    let queries = random_points(15, 3, 12);
    for tree_type in TreeType::ALL {
        let mut model = KnnModel::new(tree_type, true).with_seed(3);
        model.build_model(references.clone(), 8, false, false).unwrap();
        let before = model.search(&queries, 4).unwrap();

        let mut restored = KnnModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(restored.tree_type(), tree_type);
        assert_eq!(restored.leaf_size(), 8);
        assert_eq!(restored.basis(), model.basis());
        assert_same_results(&before, &restored.search(&queries, 4).unwrap());
    }
}

#[test]
fn test_save_and_load_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kfn.json");

    let references = random_points(60, 2, 21);
    let mut model = KfnModel::new(TreeType::BallTree, false);
    model.build_model(references, 5, false, true).unwrap();
    model.save(&path).unwrap();

    let mut loaded = KfnModel::load(&path).unwrap();
    assert_eq!(loaded.tree_name(), "ball tree");
    assert!(loaded.single_mode().unwrap());
    assert!(!loaded.naive().unwrap());
    assert_same_results(&model.search_self(2).unwrap(), &loaded.search_self(2).unwrap());
}

#[test]
fn test_unbuilt_model_round_trips() {
    let model = KnnModel::new(TreeType::XTree, true);
    let restored = KnnModel::from_json(&model.to_json().unwrap()).unwrap();
    assert!(!restored.is_built());
    assert_eq!(restored.tree_type(), TreeType::XTree);
    assert!(restored.random_basis());
}

#[test]
fn test_loading_the_other_direction_is_rejected() {
    let mut model = KnnModel::new(TreeType::KdTree, false);
    model.build_model(random_points(10, 2, 4), 3, false, false).unwrap();
    let json = model.to_json().unwrap();
    match KfnModel::from_json(&json) {
        Err(KnnError::SerializationTypeMismatch { expected, found }) => {
            assert_eq!(expected, "furthest_neighbor_search_model");
            assert_eq!(found, "nearest_neighbor_search_model");
        }
        other => panic!("expected a type mismatch, got {:?}", other.map(|m| m.tree_name())),
    }
}

#[test]
fn test_discriminant_must_match_engine() {
    let mut model = KnnModel::new(TreeType::KdTree, false);
    model.build_model(random_points(10, 2, 4), 3, false, false).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
    value["tree_type"] = serde_json::Value::from("cover");
    let result = KnnModel::from_json(&value.to_string());
    assert!(matches!(result, Err(KnnError::SerializationTypeMismatch { .. })));

    value["tree_type"] = serde_json::Value::from("quadtree");
    assert!(KnnModel::from_json(&value.to_string()).is_err());
}

#[test]
fn test_unknown_version_is_rejected() {
    let model = KnnModel::new(TreeType::KdTree, false);
    let mut value: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
    value["version"] = serde_json::Value::from(99);
    assert!(matches!(KnnModel::from_json(&value.to_string()), Err(KnnError::Configuration(_))));
}

#[test]
fn test_accessors_before_build() {
    let mut model = KnnModel::new(TreeType::RStarTree, false);
    let queries = random_points(3, 2, 0);
    assert!(matches!(model.search(&queries, 1), Err(KnnError::ModelNotInitialized(_))));
    assert!(matches!(model.search_self(1), Err(KnnError::ModelNotInitialized(_))));
    assert!(matches!(model.dataset(), Err(KnnError::ModelNotInitialized(_))));
    assert!(matches!(model.naive(), Err(KnnError::ModelNotInitialized(_))));
    assert!(matches!(model.set_naive(true), Err(KnnError::ModelNotInitialized(_))));
    assert!(matches!(model.single_mode(), Err(KnnError::ModelNotInitialized(_))));
    assert!(matches!(model.set_single_mode(true), Err(KnnError::ModelNotInitialized(_))));
    assert_eq!(model.tree_name(), "R* tree");
}

#[test]
fn test_rebuild_replaces_engine() {
    let references = random_points(40, 2, 8);
    let mut model = KnnModel::new(TreeType::KdTree, false);
    model.build_model(references.clone(), 4, true, false).unwrap();
    assert!(model.naive().unwrap());

    model.set_tree_type(TreeType::RTree);
    assert_eq!(model.tree_name(), "R tree");
    model.build_model(references, 4, false, true).unwrap();
    assert!(!model.naive().unwrap());
    assert!(model.single_mode().unwrap());
    assert_eq!(model.dataset().unwrap().len(), 40);
}

#[test]
fn test_mode_switches_keep_results() {
    let references = random_points(50, 3, 31);
    let queries = random_points(7, 3, 32);
    let mut model = KnnModel::new(TreeType::CoverTree, false);
    model.build_model(references, 20, true, false).unwrap();
    let naive = model.search(&queries, 3).unwrap();

    model.set_naive(false).unwrap();
    let dual = model.search(&queries, 3).unwrap();
    model.set_single_mode(true).unwrap();
    let single = model.search(&queries, 3).unwrap();

    assert_same_results(&naive, &dual);
    assert_same_results(&naive, &single);
    assert!(model.last_search_stats().unwrap().base_cases > 0);
}

#[test]
fn test_from_config() {
    let config = SearchConfig::builder()
        .tree_type(TreeType::BallTree)
        .leaf_size(6)
        .random_basis(true)
        .seed(17)
        .build()
        .unwrap();
    let references = random_points(30, 2, 40);
    let mut model = KnnModel::from_config(&config, references.clone()).unwrap();
    assert_eq!(model.leaf_size(), 6);
    assert!(model.basis().is_some());

    let mut plain = KnnModel::new(TreeType::BallTree, false);
    plain.build_model(references, 6, false, false).unwrap();
    assert_same_results(&plain.search_self(2).unwrap(), &model.search_self(2).unwrap());
}

#[test]
fn test_empty_queries_with_random_basis() {
    let mut model = KnnModel::new(TreeType::KdTree, true).with_seed(1);
    model.build_model(random_points(5, 3, 2), 2, false, false).unwrap();
    let result = model.search(&PointSet::empty(3), 2).unwrap();
    assert_eq!((result.k(), result.n_queries()), (2, 0));
}

#[test]
fn test_four_point_scenario_through_kd_model() {
    let references =
        PointSet::from_points(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![5.0, 5.0]]).unwrap();
    let query = PointSet::from_points(&[vec![0.0, 0.0]]).unwrap();

    let mut naive = KnnModel::new(TreeType::KdTree, false);
    naive.build_model(references.clone(), 1, true, false).unwrap();
    let mut dual = KnnModel::new(TreeType::KdTree, false);
    dual.build_model(references, 1, false, false).unwrap();
    assert!(!dual.naive().unwrap() && !dual.single_mode().unwrap());

    // the disjoint query coincides with reference 0, which is kept
    let expected = naive.search(&query, 2).unwrap();
    let result = dual.search(&query, 2).unwrap();
    assert_eq!(result, expected);
    assert_eq!(result.neighbors.col(0), &[Some(0), Some(1)]);
    assert_eq!(result.distances.col(0), &[0.0, 1.0]);

    // against itself, (0,0) finds the two points at distance 1
    let expected = naive.search_self(2).unwrap();
    let result = dual.search_self(2).unwrap();
    assert_eq!(result, expected);
    assert_eq!(result.neighbors.col(0), &[Some(1), Some(2)]);
    assert_eq!(result.distances.col(0), &[1.0, 1.0]);
}

#[test]
fn test_bad_rectangle_params_rejected_in_naive_build() {
    let bad = RectangleParams { max_leaf_size: 4, min_leaf_size: 4, ..RectangleParams::default() };
    let mut model = KnnModel::new(TreeType::RTree, false).with_rectangle_params(bad);
    let result = model.build_model(random_points(20, 2, 3), 20, true, false);
    assert!(matches!(result, Err(KnnError::InvalidParameter { .. })));
    assert!(!model.is_built());
}

#[test]
fn test_failed_naive_switch_keeps_trained_model() {
    let references = PointSet::from_points(&[vec![0.0, 0.0], vec![1e200, 1e200], vec![-1e200, 3.0]]).unwrap();
    let mut model = KnnModel::new(TreeType::CoverTree, false);
    model.build_model(references.clone(), 20, true, false).unwrap();
    let before = model.search_self(1).unwrap();

    assert!(matches!(model.set_naive(false), Err(KnnError::Build(_))));
    assert!(model.naive().unwrap());
    assert_eq!(model.dataset().unwrap().as_slice(), references.as_slice());
    assert_eq!(model.search_self(1).unwrap().neighbors, before.neighbors);
}

#[test]
fn test_failed_rebuild_keeps_previous_engine() {
    let references = random_points(30, 2, 6);
    let mut model = KnnModel::new(TreeType::BallTree, false);
    model.build_model(references.clone(), 5, false, true).unwrap();
    let before = model.search_self(2).unwrap();

    assert!(model.build_model(references.clone(), 0, false, false).is_err());
    assert_eq!(model.leaf_size(), 5);
    assert!(model.single_mode().unwrap());

    model.set_tree_type(TreeType::CoverTree);
    let huge = PointSet::from_points(&[vec![0.0, 0.0], vec![1e200, 1e200], vec![-1e200, 3.0]]).unwrap();
    assert!(matches!(model.build_model(huge, 5, false, false), Err(KnnError::Build(_))));
    assert_same_results(&before, &model.search_self(2).unwrap());
    assert_eq!(model.dataset().unwrap().len(), 30);
}

#[test]
fn test_epsilon_round_trips_and_validates() {
    let references = random_points(60, 3, 14);
    let queries = random_points(10, 3, 15);
    let mut model = KnnModel::new(TreeType::KdTree, false).with_epsilon(0.5).unwrap();
    model.build_model(references.clone(), 4, false, true).unwrap();
    assert_eq!(model.epsilon(), 0.5);
    assert!(model.set_epsilon(-1.0).is_err());
    assert_eq!(model.epsilon(), 0.5);

    let mut restored = KnnModel::from_json(&model.to_json().unwrap()).unwrap();
    assert_eq!(restored.epsilon(), 0.5);
    assert_same_results(&model.search(&queries, 3).unwrap(), &restored.search(&queries, 3).unwrap());

    // back to exact search
    restored.set_epsilon(0.0).unwrap();
    let mut exact = KnnModel::new(TreeType::KdTree, false);
    exact.build_model(references, 4, true, false).unwrap();
    assert_same_results(&exact.search(&queries, 3).unwrap(), &restored.search(&queries, 3).unwrap());
}
