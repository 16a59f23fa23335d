// src/core/types/matrix.rs

//! Dense column-major matrices. A point set stores one point per column.
//!
//! Linear algebra on point sets goes through `nalgebra`, whose dense
//! matrices share the column-major layout.

use crate::core::common::KnnError;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Dense matrix stored column by column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// An ordered set of D-dimensional points, one per column.
pub type PointSet = Matrix<f64>;

impl<T: Clone> Matrix<T> {
    /// Creates a `rows x cols` matrix with every entry set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self { rows, cols, data: vec![value; rows * cols] }
    }

    /// Wraps column-major data, checking that its length matches the shape.
    pub fn from_column_major(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, KnnError> {
        if data.len() != rows * cols {
            return Err(KnnError::invalid(format!(
                "matrix of shape {}x{} needs {} entries, got {}",
                rows,
                cols,
                rows * cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Number of columns.
    pub const fn len(&self) -> usize {
        self.cols
    }

    pub const fn is_empty(&self) -> bool {
        self.cols == 0
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(col * self.rows + row)
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let at = col * self.rows + row;
        self.data[at] = value;
    }

    pub fn col(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    pub fn col_mut(&mut self, col: usize) -> &mut [T] {
        let rows = self.rows;
        &mut self.data[col * rows..(col + 1) * rows]
    }

    /// Iterates over the columns in order.
    pub fn columns(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.cols).map(move |c| self.col(c))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Copies the given columns, in the given order, into a new matrix.
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.rows);
        for &i in indices {
            data.extend_from_slice(self.col(i));
        }
        Self { rows: self.rows, cols: indices.len(), data }
    }
}

impl Matrix<f64> {
    /// Builds a point set from row-vectors of coordinates.
    ///
    /// Every point must have the same dimension. An empty slice gives a 0x0 set.
    pub fn from_points(points: &[Vec<f64>]) -> Result<Self, KnnError> {
        let dim = points.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(dim * points.len());
        for p in points {
            if p.len() != dim {
                return Err(KnnError::DimensionMismatch { expected: dim, found: p.len() });
            }
            data.extend_from_slice(p);
        }
        Ok(Self { rows: dim, cols: points.len(), data })
    }

    /// A point set of the given dimension holding no points.
    pub const fn empty(dim: usize) -> Self {
        Self { rows: dim, cols: 0, data: Vec::new() }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::filled(n, n, 0.0);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Dimensionality of the points.
    pub const fn dim(&self) -> usize {
        self.rows
    }

    pub fn point(&self, i: usize) -> &[f64] {
        self.col(i)
    }

    pub fn points(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.columns()
    }

    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.rows, self.cols, &self.data)
    }

    pub fn from_dmatrix(m: &DMatrix<f64>) -> Self {
        Self { rows: m.nrows(), cols: m.ncols(), data: m.as_slice().to_vec() }
    }

    /// Matrix product `self * rhs`.
    pub fn multiply(&self, rhs: &Self) -> Result<Self, KnnError> {
        if self.cols != rhs.rows {
            return Err(KnnError::DimensionMismatch { expected: self.cols, found: rhs.rows });
        }
        Ok(Self::from_dmatrix(&(self.to_dmatrix() * rhs.to_dmatrix())))
    }

    pub fn transpose(&self) -> Self {
        Self::from_dmatrix(&self.to_dmatrix().transpose())
    }
}
