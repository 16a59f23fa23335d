// src/core/types/permutation.rs

//! Index remap tables produced when a tree reorders the points it indexes.

use crate::core::common::KnnError;
use serde::{Deserialize, Serialize};

/// Bijection from a structure's internal (new) point index to the caller's
/// original index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permutation {
    old_from_new: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self { old_from_new: (0..n).collect() }
    }

    /// Validates that `old_from_new` is a bijection on `0..len`.
    pub fn from_old_from_new(old_from_new: Vec<usize>) -> Result<Self, KnnError> {
        let mut seen = vec![false; old_from_new.len()];
        for &old in &old_from_new {
            match seen.get_mut(old) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(KnnError::invalid(format!("index {} appears twice in permutation", old)))
                }
                None => {
                    return Err(KnnError::invalid(format!(
                        "index {} out of range for permutation of length {}",
                        old,
                        old_from_new.len()
                    )))
                }
            }
        }
        Ok(Self { old_from_new })
    }

    pub fn len(&self) -> usize {
        self.old_from_new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.old_from_new.is_empty()
    }

    /// Original index of the point stored at internal position `new`.
    pub fn old_from_new(&self, new: usize) -> usize {
        self.old_from_new[new]
    }

    /// The inverse table: internal position of each original index.
    pub fn new_from_old(&self) -> Vec<usize> {
        let mut inverse = vec![0; self.old_from_new.len()];
        for (new, &old) in self.old_from_new.iter().enumerate() {
            inverse[old] = new;
        }
        inverse
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.old_from_new
    }

    pub fn is_identity(&self) -> bool {
        self.old_from_new.iter().enumerate().all(|(new, &old)| new == old)
    }
}

/// Maps an internal index back to the caller's index. `None` acts as identity.
#[inline]
pub fn to_original(permutation: Option<&Permutation>, index: usize) -> usize {
    permutation.map_or(index, |p| p.old_from_new(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let p = Permutation::identity(4);
        assert!(p.is_identity());
        assert_eq!(p.old_from_new(3), 3);
        assert_eq!(to_original(None, 7), 7);
    }

    #[test]
    fn test_rejects_non_bijection() {
        assert!(Permutation::from_old_from_new(vec![0, 0, 1]).is_err());
        assert!(Permutation::from_old_from_new(vec![0, 3, 1]).is_err());
        assert!(Permutation::from_old_from_new(vec![2, 0, 1]).is_ok());
    }

    #[test]
    fn test_round_trip_through_inverse() {
        let p = Permutation::from_old_from_new(vec![2, 0, 3, 1]).unwrap();
        let inverse = p.new_from_old();
        for original in 0..4 {
            assert_eq!(p.old_from_new(inverse[original]), original);
        }
        assert_eq!(to_original(Some(&p), 0), 2);
        assert!(!p.is_identity());
    }
}
