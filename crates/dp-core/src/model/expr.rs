//! Typed linear expressions over model variables.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Handle to a variable of a [`Model`](super::Model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// `Σ coefficient · variable + constant`.
///
/// Terms are kept in insertion order; repeated variables are allowed and
/// merged by [`LinearExpr::compact`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coefficient: f64) -> Self {
        Self {
            terms: vec![(var, coefficient)],
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merge repeated variables and drop zero coefficients, keeping the
    /// order of first appearance.
    pub fn compact(mut self) -> Self {
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(self.terms.len());
        let mut slot: std::collections::HashMap<VarId, usize> = std::collections::HashMap::new();
        for (var, coefficient) in self.terms.drain(..) {
            match slot.get(&var) {
                Some(&i) => merged[i].1 += coefficient,
                None => {
                    slot.insert(var, merged.len());
                    merged.push((var, coefficient));
                }
            }
        }
        merged.retain(|(_, c)| *c != 0.0);
        self.terms = merged;
        self
    }

    /// Value of the expression for a dense assignment indexed by `VarId`.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(var, c)| c * values.get(var.0).copied().unwrap_or(0.0))
                .sum::<f64>()
    }

    fn scale(mut self, factor: f64) -> Self {
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        LinearExpr::constant(value)
    }
}

impl AddAssign<LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl SubAssign<LinearExpr> for LinearExpr {
    fn sub_assign(&mut self, rhs: LinearExpr) {
        *self += -rhs;
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs.into();
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self -= rhs.into();
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scale(-1.0)
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        self.scale(rhs)
    }
}

impl Mul<VarId> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: VarId) -> LinearExpr {
        LinearExpr::term(rhs, self)
    }
}

impl std::iter::Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, e| acc + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let x = VarId(0);
        let y = VarId(1);
        let e = 2.0 * x + 3.0 * y - LinearExpr::constant(1.0);
        assert_eq!(e.evaluate(&[1.0, 2.0]), 7.0);
        let n = -e.clone();
        assert_eq!(n.evaluate(&[1.0, 2.0]), -7.0);
        assert_eq!((e * 0.5).evaluate(&[1.0, 2.0]), 3.5);
    }

    #[test]
    fn test_compact_merges_terms() {
        let x = VarId(0);
        let y = VarId(1);
        let e = (1.0 * x + 2.0 * y + 3.0 * x - 2.0 * y).compact();
        assert_eq!(e.terms(), &[(x, 4.0)]);
    }

    #[test]
    fn test_sum() {
        let e: LinearExpr = (0..3).map(|i| LinearExpr::term(VarId(i), 1.0)).sum();
        assert_eq!(e.terms().len(), 3);
        assert_eq!(e.evaluate(&[1.0, 1.0, 1.0]), 3.0);
    }
}
