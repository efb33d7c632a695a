//! Numerically stable summation and tolerance checks for probability mass.

/// Default tolerance used when checking that a probability vector sums to one.
pub const PROBABILITY_TOL: f64 = 1e-8;

/// Neumaier-compensated running sum.
///
/// Path probabilities are products of many small factors; summing millions of
/// them naively drifts away from one, which breaks the normalization checks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StableSum {
    sum: f64,
    compensation: f64,
}

impl StableSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term.
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    /// Current compensated total.
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl Extend<f64> for StableSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.add(v);
        }
    }
}

impl FromIterator<f64> for StableSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = StableSum::new();
        acc.extend(iter);
        acc
    }
}

/// Compensated sum of an iterator of values.
pub fn stable_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().collect::<StableSum>().value()
}

/// Absolute-or-relative approximate equality.
///
/// NaN never compares equal; infinities compare equal only to themselves.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

/// Check that `values` is a probability distribution: finite, non-negative,
/// summing to one within `tol`.
pub fn is_distribution(values: &[f64], tol: f64) -> bool {
    if values.is_empty() {
        return false;
    }
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return false;
    }
    approx_eq(stable_sum(values.iter().copied()), 1.0, tol)
}
