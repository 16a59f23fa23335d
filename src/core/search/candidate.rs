// src/core/search/candidate.rs

//! Bounded best-first list of neighbor candidates for one query point.

use crate::core::sort::SortPolicy;
use crate::core::types::NeighborResult;
use std::marker::PhantomData;

/// The best `k` (distance, reference index) pairs seen so far, best first.
///
/// Entries are ordered by distance, then by reference index, so the list
/// holds the same entries whatever order candidates arrive in. An index
/// already in the list is never added twice.
#[derive(Debug, Clone)]
pub struct CandidateList<P: SortPolicy> {
    k: usize,
    entries: Vec<(f64, usize)>,
    policy: PhantomData<P>,
}

impl<P: SortPolicy> CandidateList<P> {
    pub fn new(k: usize) -> Self {
        Self { k, entries: Vec::with_capacity(k + 1), policy: PhantomData }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.k
    }

    /// Distance a new candidate has to beat. The policy's worst distance
    /// until the list is full.
    pub fn worst_distance(&self) -> f64 {
        if self.is_full() {
            self.entries.last().map_or(P::worst_distance(), |&(d, _)| d)
        } else {
            P::worst_distance()
        }
    }

    /// Whether `(distance, index)` ranks ahead of the entry `(d, i)`.
    fn precedes(distance: f64, index: usize, (d, i): (f64, usize)) -> bool {
        P::is_better(distance, d) || (distance == d && index < i)
    }

    /// Offers a candidate; returns whether it was kept.
    pub fn insert(&mut self, distance: f64, index: usize) -> bool {
        if self.k == 0 || !P::is_better(distance, P::worst_distance()) {
            return false;
        }
        if self.is_full() && !self.entries.last().map_or(true, |&last| Self::precedes(distance, index, last)) {
            return false;
        }
        if self.entries.iter().any(|&(_, i)| i == index) {
            return false;
        }
        let position =
            self.entries.iter().position(|&e| Self::precedes(distance, index, e)).unwrap_or(self.entries.len());
        self.entries.insert(position, (distance, index));
        self.entries.truncate(self.k);
        true
    }

    pub fn entries(&self) -> &[(f64, usize)] {
        &self.entries
    }

    /// Writes the list into column `column`; slots past the end keep the
    /// result's "no result" marker.
    pub fn write_column(&self, result: &mut NeighborResult, column: usize) {
        for (row, &(distance, index)) in self.entries.iter().enumerate() {
            result.neighbors.set(row, column, Some(index));
            result.distances.set(row, column, distance);
        }
    }
}
