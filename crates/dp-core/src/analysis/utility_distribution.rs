//! Distribution of the path utility under a decision strategy.

use dp_math::StableSum;

use crate::decision::DecisionStrategy;
use crate::diagram::InfluenceDiagram;
use crate::error::DiagramError;
use crate::paths::CompatiblePaths;

/// Discrete utility distribution, sorted by utility.
///
/// Equal utilities are merged exactly; zero-probability outcomes are dropped.
/// Utilities are untranslated.
#[derive(Debug, Clone, PartialEq)]
pub struct UtilityDistribution {
    utilities: Vec<f64>,
    probabilities: Vec<f64>,
}

impl UtilityDistribution {
    pub fn new(diagram: &InfluenceDiagram, strategy: &DecisionStrategy) -> Result<Self, DiagramError> {
        if !diagram.is_generated() {
            return Err(DiagramError::NotGenerated);
        }
        let mut points = Vec::new();
        for path in CompatiblePaths::new(diagram, strategy, None)? {
            let p = diagram.probability_of(&path);
            if p > 0.0 {
                points.push((diagram.raw_path_utility(&path)?, p));
            }
        }
        Ok(Self::from_points(points))
    }

    /// Build from `(utility, probability)` pairs in any order.
    pub fn from_points(mut points: Vec<(f64, f64)>) -> Self {
        points.retain(|(_, p)| *p > 0.0);
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut utilities: Vec<f64> = Vec::with_capacity(points.len());
        let mut sums: Vec<StableSum> = Vec::with_capacity(points.len());
        for (u, p) in points {
            match utilities.last() {
                Some(&last) if last == u => {
                    if let Some(sum) = sums.last_mut() {
                        sum.add(p);
                    }
                }
                _ => {
                    utilities.push(u);
                    let mut sum = StableSum::new();
                    sum.add(p);
                    sums.push(sum);
                }
            }
        }
        Self {
            utilities,
            probabilities: sums.iter().map(StableSum::value).collect(),
        }
    }

    /// Round utilities to `decimals` places and merge equal keys.
    pub fn with_precision(&self, decimals: u32) -> Self {
        let factor = 10f64.powi(decimals as i32);
        Self::from_points(
            self.iter()
                .map(|(u, p)| ((u * factor).round() / factor, p))
                .collect(),
        )
    }

    pub fn utilities(&self) -> &[f64] {
        &self.utilities
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn len(&self) -> usize {
        self.utilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utilities.is_empty()
    }

    /// `(utility, probability)` pairs in ascending utility order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.utilities
            .iter()
            .copied()
            .zip(self.probabilities.iter().copied())
    }
}
