// src/core/indexing/bound.rs

//! Bounding regions used for pruning: axis-aligned hyper-rectangles and balls.
//!
//! An empty bound (no points absorbed yet) has zero-length coordinate vectors.
//! Distances against it collapse to zero, so it is never pruned, which is
//! harmless because an empty node holds nothing to evaluate.

use crate::core::metric::squared_euclidean;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Capability every node bound provides to the traversals.
pub trait Bound: Clone + Debug + Serialize + DeserializeOwned {
    /// Smallest bound containing all the given points.
    fn from_points<'a, I>(dim: usize, points: I) -> Self
    where
        I: IntoIterator<Item = &'a [f64]>;

    fn min_distance_to_point(&self, point: &[f64]) -> f64;

    fn max_distance_to_point(&self, point: &[f64]) -> f64;

    fn min_distance(&self, other: &Self) -> f64;

    fn max_distance(&self, other: &Self) -> f64;

    fn center(&self) -> Vec<f64>;
}

/// Axis-aligned hyper-rectangle `[lo, hi]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HRectBound {
    lo: Vec<f64>,
    hi: Vec<f64>,
}

impl HRectBound {
    pub const fn empty() -> Self {
        Self { lo: Vec::new(), hi: Vec::new() }
    }

    pub fn from_point(point: &[f64]) -> Self {
        Self { lo: point.to_vec(), hi: point.to_vec() }
    }

    pub fn is_empty(&self) -> bool {
        self.lo.is_empty()
    }

    pub fn lo(&self) -> &[f64] {
        &self.lo
    }

    pub fn hi(&self) -> &[f64] {
        &self.hi
    }

    pub fn width(&self, dim: usize) -> f64 {
        self.hi.get(dim).zip(self.lo.get(dim)).map_or(0.0, |(h, l)| h - l)
    }

    /// Dimension with the largest extent, and that extent.
    pub fn widest_dimension(&self) -> (usize, f64) {
        (0..self.lo.len())
            .map(|d| (d, self.width(d)))
            .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    pub fn expand_point(&mut self, point: &[f64]) {
        if self.is_empty() {
            *self = Self::from_point(point);
            return;
        }
        for ((lo, hi), &p) in self.lo.iter_mut().zip(self.hi.iter_mut()).zip(point) {
            *lo = lo.min(p);
            *hi = hi.max(p);
        }
    }

    pub fn expand(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        for d in 0..self.lo.len() {
            self.lo[d] = self.lo[d].min(other.lo[d]);
            self.hi[d] = self.hi[d].max(other.hi[d]);
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.expand(other);
        out
    }

    pub fn volume(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (0..self.lo.len()).map(|d| self.width(d)).product()
    }

    /// Sum of edge lengths.
    pub fn margin(&self) -> f64 {
        (0..self.lo.len()).map(|d| self.width(d)).sum()
    }

    /// Volume of the intersection with `other` (zero when disjoint).
    pub fn overlap(&self, other: &Self) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let mut volume = 1.0;
        for d in 0..self.lo.len() {
            let extent = self.hi[d].min(other.hi[d]) - self.lo[d].max(other.lo[d]);
            if extent <= 0.0 {
                return 0.0;
            }
            volume *= extent;
        }
        volume
    }

    /// Volume increase needed to absorb `other`.
    pub fn enlargement(&self, other: &Self) -> f64 {
        self.union(other).volume() - self.volume()
    }

    pub fn contains_point(&self, point: &[f64]) -> bool {
        !self.is_empty()
            && self.lo.iter().zip(&self.hi).zip(point).all(|((lo, hi), p)| lo <= p && p <= hi)
    }
}

impl Bound for HRectBound {
    fn from_points<'a, I>(_dim: usize, points: I) -> Self
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut bound = Self::empty();
        for p in points {
            bound.expand_point(p);
        }
        bound
    }

    fn min_distance_to_point(&self, point: &[f64]) -> f64 {
        self.lo
            .iter()
            .zip(&self.hi)
            .zip(point)
            .map(|((&lo, &hi), &p)| {
                let gap = (lo - p).max(p - hi).max(0.0);
                gap * gap
            })
            .sum::<f64>()
            .sqrt()
    }

    fn max_distance_to_point(&self, point: &[f64]) -> f64 {
        self.lo
            .iter()
            .zip(&self.hi)
            .zip(point)
            .map(|((&lo, &hi), &p)| {
                let far = (p - lo).abs().max((hi - p).abs());
                far * far
            })
            .sum::<f64>()
            .sqrt()
    }

    fn min_distance(&self, other: &Self) -> f64 {
        (0..self.lo.len().min(other.lo.len()))
            .map(|d| {
                let gap = (self.lo[d] - other.hi[d]).max(other.lo[d] - self.hi[d]).max(0.0);
                gap * gap
            })
            .sum::<f64>()
            .sqrt()
    }

    fn max_distance(&self, other: &Self) -> f64 {
        (0..self.lo.len().min(other.lo.len()))
            .map(|d| {
                let far = (self.hi[d] - other.lo[d]).abs().max((other.hi[d] - self.lo[d]).abs());
                far * far
            })
            .sum::<f64>()
            .sqrt()
    }

    fn center(&self) -> Vec<f64> {
        self.lo.iter().zip(&self.hi).map(|(l, h)| (l + h) / 2.0).collect()
    }
}

/// Relative widening applied to ball distance bounds, covering the rounding
/// of the center distance and the radius.
const BALL_SLACK: f64 = 1e-12;

/// Hyper-sphere bound: every point lies within `radius` of `center`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallBound {
    center: Vec<f64>,
    radius: f64,
}

impl BallBound {
    pub const fn new(center: Vec<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    pub const fn radius(&self) -> f64 {
        self.radius
    }

    fn center_distance(&self, point: &[f64]) -> f64 {
        squared_euclidean(&self.center, point).sqrt()
    }
}

impl Bound for BallBound {
    /// Centers the ball on the centroid of the points.
    fn from_points<'a, I>(dim: usize, points: I) -> Self
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let points: Vec<&[f64]> = points.into_iter().collect();
        if points.is_empty() {
            return Self { center: Vec::new(), radius: 0.0 };
        }
        let mut center = vec![0.0; dim];
        for p in &points {
            for (c, &x) in center.iter_mut().zip(p.iter()) {
                *c += x;
            }
        }
        let n = points.len() as f64;
        for c in &mut center {
            *c /= n;
        }
        let radius = points
            .iter()
            .map(|p| squared_euclidean(&center, p).sqrt())
            .fold(0.0, f64::max);
        Self { center, radius }
    }

    fn min_distance_to_point(&self, point: &[f64]) -> f64 {
        let d = self.center_distance(point);
        (d - self.radius - BALL_SLACK * (d + self.radius)).max(0.0)
    }

    fn max_distance_to_point(&self, point: &[f64]) -> f64 {
        let reach = self.center_distance(point) + self.radius;
        reach + BALL_SLACK * reach
    }

    fn min_distance(&self, other: &Self) -> f64 {
        let d = self.center_distance(&other.center);
        let radii = self.radius + other.radius;
        (d - radii - BALL_SLACK * (d + radii)).max(0.0)
    }

    fn max_distance(&self, other: &Self) -> f64 {
        let reach = self.center_distance(&other.center) + self.radius + other.radius;
        reach + BALL_SLACK * reach
    }

    fn center(&self) -> Vec<f64> {
        self.center.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(lo: &[f64], hi: &[f64]) -> HRectBound {
        let mut r = HRectBound::from_point(lo);
        r.expand_point(hi);
        r
    }

    #[test]
    fn test_rect_volume_margin_overlap() {
        let a = rect(&[0.0, 0.0], &[10.0, 5.0]);
        assert_relative_eq!(a.volume(), 50.0);
        assert_relative_eq!(a.margin(), 15.0);

        let b = rect(&[3.0, 3.0], &[8.0, 8.0]);
        assert_relative_eq!(a.overlap(&b), 10.0);
        let c = rect(&[20.0, 20.0], &[21.0, 21.0]);
        assert_eq!(a.overlap(&c), 0.0);
        assert_eq!(a.union(&b), rect(&[0.0, 0.0], &[10.0, 8.0]));
    }

    #[test]
    fn test_rect_point_distances() {
        let r = rect(&[0.0, 0.0], &[1.0, 1.0]);
        assert_eq!(r.min_distance_to_point(&[0.5, 0.5]), 0.0);
        assert_relative_eq!(r.min_distance_to_point(&[4.0, 5.0]), 5.0);
        assert_relative_eq!(r.max_distance_to_point(&[0.0, 0.0]), 2f64.sqrt());
        assert!(r.contains_point(&[1.0, 0.0]));
        assert!(!r.contains_point(&[1.1, 0.0]));
    }

    #[test]
    fn test_rect_rect_distances() {
        let a = rect(&[0.0, 0.0], &[1.0, 1.0]);
        let b = rect(&[2.0, 2.0], &[3.0, 3.0]);
        assert_relative_eq!(a.min_distance(&b), 2f64.sqrt());
        assert_relative_eq!(a.max_distance(&b), 18f64.sqrt());
        let overlapping = rect(&[0.5, 0.5], &[1.5, 1.5]);
        assert_eq!(a.min_distance(&overlapping), 0.0);
    }

    #[test]
    fn test_rect_widest_dimension() {
        let r = rect(&[0.0, 0.0, 0.0], &[1.0, 4.0, 2.0]);
        assert_eq!(r.widest_dimension(), (1, 4.0));
    }

    #[test]
    fn test_empty_rect_absorbs_first_point() {
        let mut r = HRectBound::empty();
        assert!(r.is_empty());
        r.expand_point(&[2.0, 3.0]);
        assert_eq!(r.lo(), &[2.0, 3.0]);
        assert_eq!(r.volume(), 0.0);
    }

    #[test]
    fn test_ball_bounds() {
        let pts: Vec<Vec<f64>> = vec![vec![-1.0, 0.0], vec![1.0, 0.0]];
        let ball = BallBound::from_points(2, pts.iter().map(Vec::as_slice));
        assert_eq!(ball.center(), vec![0.0, 0.0]);
        assert_relative_eq!(ball.radius(), 1.0);
        assert_relative_eq!(ball.min_distance_to_point(&[3.0, 0.0]), 2.0, epsilon = 1e-9);
        assert_relative_eq!(ball.max_distance_to_point(&[3.0, 0.0]), 4.0, epsilon = 1e-9);

        let other = BallBound::new(vec![5.0, 0.0], 1.0);
        assert_relative_eq!(ball.min_distance(&other), 3.0, epsilon = 1e-9);
        assert_relative_eq!(ball.max_distance(&other), 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bounds_contain_their_points() {
        let pts: Vec<Vec<f64>> = vec![vec![0.0, 1.0], vec![2.0, -1.0], vec![0.5, 0.5]];
        let ball = BallBound::from_points(2, pts.iter().map(Vec::as_slice));
        let r = HRectBound::from_points(2, pts.iter().map(Vec::as_slice));
        for p in &pts {
            assert_eq!(ball.min_distance_to_point(p), 0.0);
            assert_eq!(r.min_distance_to_point(p), 0.0);
        }
    }

    #[test]
    fn test_ball_bounds_never_cut_into_boundary_points() {
        let pts: Vec<Vec<f64>> = (0..7).map(|i| vec![0.1 * i as f64, 0.3 - 0.07 * i as f64, 1.0 / (i + 1) as f64]).collect();
        let ball = BallBound::from_points(3, pts.iter().map(Vec::as_slice));
        let query = [2.7, -1.3, 0.9];
        for p in &pts {
            let d = squared_euclidean(p, &query).sqrt();
            assert!(ball.min_distance_to_point(&query) <= d);
            assert!(ball.max_distance_to_point(&query) >= d);
        }
    }
}
