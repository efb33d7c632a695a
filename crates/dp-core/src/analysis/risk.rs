//! Risk statistics of a utility distribution.
//!
//! Utilities are gains and risk sits in the lower tail:
//!
//! * `VaR(α)` is the smallest utility `v` with `P(U ≤ v) ≥ α`;
//! * `CVaR(α)` is the expected utility over the worst `α` of probability
//!   mass, taking only the part of the `VaR` atom needed to reach `α`.
//!
//! `α` must lie in `[0, 1]`, and `CVaR(0) = VaR(0)` is the smallest utility.

use dp_math::{weighted_moments, StableSum, WeightedMoments};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::UtilityDistribution;
use crate::error::ModelError;

/// Slack when comparing cumulative mass against `α`.
const CDF_TOL: f64 = 1e-12;

/// Summary statistics of a utility distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UtilityStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub variance: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    pub min: f64,
    pub max: f64,
}

/// VaR and CVaR at one level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskMeasure {
    pub alpha: f64,
    pub value_at_risk: f64,
    pub conditional_value_at_risk: f64,
}

fn check_alpha(alpha: f64) -> Result<(), ModelError> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(ModelError::InvalidAlpha {
            alpha,
            range: "[0, 1]",
        })
    }
}

impl UtilityDistribution {
    fn moments(&self) -> Result<WeightedMoments, ModelError> {
        let points: Vec<(f64, f64)> = self.iter().collect();
        weighted_moments(&points).ok_or(ModelError::EmptyDistribution)
    }

    pub fn expected_value(&self) -> Result<f64, ModelError> {
        Ok(self.moments()?.mean)
    }

    pub fn variance(&self) -> Result<f64, ModelError> {
        Ok(self.moments()?.variance)
    }

    pub fn std_dev(&self) -> Result<f64, ModelError> {
        Ok(self.moments()?.std_dev)
    }

    pub fn skewness(&self) -> Result<f64, ModelError> {
        Ok(self.moments()?.skewness)
    }

    pub fn excess_kurtosis(&self) -> Result<f64, ModelError> {
        Ok(self.moments()?.excess_kurtosis)
    }

    /// Smallest utility whose cumulative probability reaches `alpha`.
    pub fn value_at_risk(&self, alpha: f64) -> Result<f64, ModelError> {
        check_alpha(alpha)?;
        let last = *self.utilities().last().ok_or(ModelError::EmptyDistribution)?;
        let mut cdf = StableSum::new();
        for (u, p) in self.iter() {
            cdf.add(p);
            if cdf.value() + CDF_TOL >= alpha {
                return Ok(u);
            }
        }
        Ok(last)
    }

    /// Expected utility over the worst `alpha` of the probability mass.
    pub fn conditional_value_at_risk(&self, alpha: f64) -> Result<f64, ModelError> {
        let var = self.value_at_risk(alpha)?;
        if alpha == 0.0 {
            return Ok(var);
        }
        let mut tail = StableSum::new();
        let mut mass = StableSum::new();
        for (u, p) in self.iter().take_while(|(u, _)| *u < var) {
            tail.add(u * p);
            mass.add(p);
        }
        let remainder = (alpha - mass.value()).max(0.0);
        Ok((tail.value() + var * remainder) / alpha)
    }

    pub fn statistics(&self) -> Result<UtilityStatistics, ModelError> {
        let m = self.moments()?;
        let (min, max) = match (self.utilities().first(), self.utilities().last()) {
            (Some(&min), Some(&max)) => (min, max),
            _ => return Err(ModelError::EmptyDistribution),
        };
        Ok(UtilityStatistics {
            mean: m.mean,
            std_dev: m.std_dev,
            variance: m.variance,
            skewness: m.skewness,
            excess_kurtosis: m.excess_kurtosis,
            min,
            max,
        })
    }

    /// VaR and CVaR at each level.
    pub fn risk_measures(&self, alphas: &[f64]) -> Result<Vec<RiskMeasure>, ModelError> {
        alphas
            .iter()
            .map(|&alpha| {
                Ok(RiskMeasure {
                    alpha,
                    value_at_risk: self.value_at_risk(alpha)?,
                    conditional_value_at_risk: self.conditional_value_at_risk(alpha)?,
                })
            })
            .collect()
    }
}
