// src/core/model/mod.rs

//! Runtime-selected neighbor search models.

pub mod engine;
pub mod ns_model;
pub mod random_basis;
pub mod tree_type;

pub use engine::SearchEngine;
pub use ns_model::{KfnModel, KnnModel, NsModel, MODEL_VERSION};
pub use random_basis::RandomBasis;
pub use tree_type::TreeType;
