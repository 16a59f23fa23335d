// src/core/model/random_basis.rs

//! Uniformly random rotations of the point space.
//!
//! A Gaussian matrix is factored as QR and the sign of every column of Q is
//! chosen so that R has a positive diagonal. Draws whose determinant is
//! negative are reflections and are thrown away, so the result is always a
//! proper rotation.

use crate::core::common::KnnError;
use crate::core::types::PointSet;
use log::{debug, info};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Draws with an R diagonal entry this small are treated as rank deficient.
const DEGENERATE_NORM: f64 = 1e-10;

/// A random orthogonal `d x d` matrix applied to every point before indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RandomBasis {
    q: PointSet,
}

impl RandomBasis {
    /// Draws a rotation from `seed`, or from system entropy when `None`.
    pub fn new(dim: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::generate(dim, &mut rng)
    }

    pub fn generate<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Self {
        info!("Creating random basis...");
        if dim == 0 {
            return Self { q: PointSet::identity(0) };
        }
        let mut attempts = 0usize;
        loop {
            attempts += 1;
            let gaussian = DMatrix::<f64>::from_fn(dim, dim, |_, _| rng.sample(StandardNormal));
            let qr = gaussian.qr();
            let r_diagonal = qr.r().diagonal();
            if r_diagonal.iter().any(|r| r.abs() < DEGENERATE_NORM) {
                continue;
            }
            let mut q = qr.q();
            for (j, r) in r_diagonal.iter().enumerate() {
                if *r < 0.0 {
                    for value in q.column_mut(j).iter_mut() {
                        *value = -*value;
                    }
                }
            }
            if q.determinant() >= 0.0 {
                debug!("random basis of dimension {} accepted after {} draw(s)", dim, attempts);
                return Self { q: PointSet::from_dmatrix(&q) };
            }
        }
    }

    /// Wraps an existing matrix, which must be square.
    pub fn from_matrix(q: PointSet) -> Result<Self, KnnError> {
        if q.rows() != q.cols() {
            return Err(KnnError::DimensionMismatch { expected: q.rows(), found: q.cols() });
        }
        Ok(Self { q })
    }

    pub fn dim(&self) -> usize {
        self.q.rows()
    }

    pub fn matrix(&self) -> &PointSet {
        &self.q
    }

    /// Rotates every point: returns `q * points`.
    pub fn apply(&self, points: &PointSet) -> Result<PointSet, KnnError> {
        if points.is_empty() {
            return Ok(PointSet::empty(self.dim()));
        }
        self.q.multiply(points)
    }
}
