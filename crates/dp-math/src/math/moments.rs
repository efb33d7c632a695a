//! Moments of discrete weighted distributions.

use serde::{Deserialize, Serialize};

use super::stable::StableSum;

/// Population moments of a discrete distribution given as `(value, weight)`
/// pairs. Weights are normalized by their total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedMoments {
    pub total_weight: f64,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// Third standardized moment; zero for a degenerate distribution.
    pub skewness: f64,
    /// Fourth standardized moment minus three; zero for a degenerate distribution.
    pub excess_kurtosis: f64,
}

/// Compute weighted moments.
///
/// Returns `None` when the total weight is not strictly positive or any
/// weight is negative or non-finite.
pub fn weighted_moments(points: &[(f64, f64)]) -> Option<WeightedMoments> {
    if points.iter().any(|(v, w)| !w.is_finite() || *w < 0.0 || !v.is_finite()) {
        return None;
    }
    let total: StableSum = points.iter().map(|(_, w)| *w).collect();
    let total_weight = total.value();
    if total_weight <= 0.0 {
        return None;
    }

    let mean = points
        .iter()
        .map(|(v, w)| v * w)
        .collect::<StableSum>()
        .value()
        / total_weight;

    let mut m2 = StableSum::new();
    let mut m3 = StableSum::new();
    let mut m4 = StableSum::new();
    for (v, w) in points {
        let d = v - mean;
        let d2 = d * d;
        m2.add(w * d2);
        m3.add(w * d2 * d);
        m4.add(w * d2 * d2);
    }
    let variance = (m2.value() / total_weight).max(0.0);
    let std_dev = variance.sqrt();

    let (skewness, excess_kurtosis) = if variance > 0.0 {
        (
            (m3.value() / total_weight) / (variance * std_dev),
            (m4.value() / total_weight) / (variance * variance) - 3.0,
        )
    } else {
        (0.0, 0.0)
    };

    Some(WeightedMoments {
        total_weight,
        mean,
        variance,
        std_dev,
        skewness,
        excess_kurtosis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx_eq;

    #[test]
    fn moments_two_point() {
        let m = weighted_moments(&[(15.0, 0.2), (35.0, 0.8)]).unwrap();
        assert!(approx_eq(m.mean, 31.0, 1e-12));
        assert!(approx_eq(m.variance, 64.0, 1e-12));
        assert!(approx_eq(m.std_dev, 8.0, 1e-12));
        // Bernoulli with p = 0.8 on the high atom: skew = (1 - 2p) / sqrt(p(1 - p))
        assert!(approx_eq(m.skewness, -1.5, 1e-12));
        assert!(approx_eq(m.excess_kurtosis, 0.25, 1e-12));
    }

    #[test]
    fn moments_symmetric_has_zero_skew() {
        let m = weighted_moments(&[(-1.0, 0.25), (0.0, 0.5), (1.0, 0.25)]).unwrap();
        assert!(approx_eq(m.mean, 0.0, 1e-12));
        assert!(approx_eq(m.skewness, 0.0, 1e-12));
    }

    #[test]
    fn moments_unnormalized_weights() {
        let a = weighted_moments(&[(1.0, 1.0), (3.0, 3.0)]).unwrap();
        let b = weighted_moments(&[(1.0, 0.25), (3.0, 0.75)]).unwrap();
        assert!(approx_eq(a.mean, b.mean, 1e-12));
        assert!(approx_eq(a.variance, b.variance, 1e-12));
        assert!(approx_eq(a.total_weight, 4.0, 1e-12));
    }

    #[test]
    fn moments_degenerate() {
        let m = weighted_moments(&[(7.0, 1.0)]).unwrap();
        assert_eq!(m.variance, 0.0);
        assert_eq!(m.skewness, 0.0);
        assert_eq!(m.excess_kurtosis, 0.0);
    }

    #[test]
    fn moments_rejects_bad_weights() {
        assert!(weighted_moments(&[]).is_none());
        assert!(weighted_moments(&[(1.0, 0.0)]).is_none());
        assert!(weighted_moments(&[(1.0, -1.0), (2.0, 2.0)]).is_none());
        assert!(weighted_moments(&[(f64::NAN, 1.0)]).is_none());
    }
}
