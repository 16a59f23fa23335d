// src/core/types/mod.rs

pub mod matrix;
pub mod permutation;
pub mod result;

pub use matrix::{Matrix, PointSet};
pub use permutation::{to_original, Permutation};
pub use result::NeighborResult;
