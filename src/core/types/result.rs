// src/core/types/result.rs

use super::matrix::Matrix;
use serde::{Deserialize, Serialize};

/// Output of a k-neighbor search: `k` rows by one column per query point.
///
/// Within a column, entries are ordered best first. A slot with no candidate
/// (fewer than `k` reference points were eligible) holds `None` and the sort
/// policy's worst distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    pub neighbors: Matrix<Option<usize>>,
    pub distances: Matrix<f64>,
}

impl NeighborResult {
    /// A result with every slot marked as "no result".
    pub fn unfilled(k: usize, n_queries: usize, worst_distance: f64) -> Self {
        Self {
            neighbors: Matrix::filled(k, n_queries, None),
            distances: Matrix::filled(k, n_queries, worst_distance),
        }
    }

    pub const fn k(&self) -> usize {
        self.neighbors.rows()
    }

    pub const fn n_queries(&self) -> usize {
        self.neighbors.cols()
    }

    pub fn neighbors_of(&self, query: usize) -> &[Option<usize>] {
        self.neighbors.col(query)
    }

    pub fn distances_of(&self, query: usize) -> &[f64] {
        self.distances.col(query)
    }

    /// Builds a result whose column `old_from_new[i]` is column `i` of `self`.
    ///
    /// Used to undo the reordering a query-side tree applied to the queries.
    pub fn unmap_columns(&self, old_from_new: &[usize]) -> Self {
        let mut out = self.clone();
        for (new, &old) in old_from_new.iter().enumerate() {
            out.neighbors.col_mut(old).clone_from_slice(self.neighbors.col(new));
            out.distances.col_mut(old).copy_from_slice(self.distances.col(new));
        }
        out
    }

    /// Rewrites every reported reference index `i` as `old_from_new[i]`.
    pub fn unmap_neighbors(&mut self, old_from_new: &[usize]) {
        for col in 0..self.neighbors.cols() {
            for slot in self.neighbors.col_mut(col) {
                if let Some(index) = slot {
                    *index = old_from_new[*index];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfilled_marks_every_slot() {
        let r = NeighborResult::unfilled(2, 3, f64::INFINITY);
        assert_eq!(r.k(), 2);
        assert_eq!(r.n_queries(), 3);
        assert!(r.neighbors.as_slice().iter().all(Option::is_none));
        assert!(r.distances.as_slice().iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_unmap_columns_moves_each_column_to_its_original_slot() {
        let mut r = NeighborResult::unfilled(1, 3, 0.0);
        for col in 0..3 {
            r.neighbors.set(0, col, Some(10 + col));
            r.distances.set(0, col, col as f64);
        }
        // internal column 0 was original query 2, 1 -> 0, 2 -> 1
        let unmapped = r.unmap_columns(&[2, 0, 1]);
        assert_eq!(unmapped.neighbors_of(2), &[Some(10)]);
        assert_eq!(unmapped.neighbors_of(0), &[Some(11)]);
        assert_eq!(unmapped.neighbors_of(1), &[Some(12)]);
        assert_eq!(unmapped.distances_of(2), &[0.0]);
        assert_eq!(unmapped.distances_of(1), &[2.0]);
    }

    #[test]
    fn test_unmap_neighbors_leaves_empty_slots() {
        let mut r = NeighborResult::unfilled(2, 1, f64::INFINITY);
        r.neighbors.set(0, 0, Some(1));
        r.unmap_neighbors(&[4, 9, 2]);
        assert_eq!(r.neighbors_of(0), &[Some(9), None]);
    }
}
