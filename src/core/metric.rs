// src/core/metric.rs

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Distance capability injected into the search engines.
///
/// Tree bounds are Euclidean, so a metric plugged into a tree-backed engine
/// must agree with Euclidean distance for pruning to stay exact.
pub trait Metric: Clone + Debug + Default + Serialize + DeserializeOwned {
    /// Distance between two points of equal dimension.
    fn evaluate(&self, a: &[f64], b: &[f64]) -> f64;

    fn name(&self) -> &'static str;
}

/// Standard L2 distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EuclideanDistance;

impl Metric for EuclideanDistance {
    #[inline]
    fn evaluate(&self, a: &[f64], b: &[f64]) -> f64 {
        squared_euclidean(a, b).sqrt()
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

#[inline]
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_distance() {
        let m = EuclideanDistance;
        assert_relative_eq!(m.evaluate(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_relative_eq!(m.evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(m.name(), "euclidean");
    }
}
