//! Marginal state distributions under a decision strategy.

use dp_math::StableSum;

use crate::decision::DecisionStrategy;
use crate::diagram::{InfluenceDiagram, State, StateRef};
use crate::error::{DiagramError, ModelError};
use crate::paths::{CompatiblePaths, FixedPath};

/// Per-node distribution over states, indexed like the diagram's paths.
#[derive(Debug, Clone, PartialEq)]
pub struct StateProbabilities {
    names: Vec<String>,
    probabilities: Vec<Vec<f64>>,
    fixed: Option<(usize, State)>,
}

fn accumulate(
    diagram: &InfluenceDiagram,
    strategy: &DecisionStrategy,
    fixed: Option<&FixedPath>,
) -> Result<Vec<Vec<StableSum>>, DiagramError> {
    if !diagram.is_generated() {
        return Err(DiagramError::NotGenerated);
    }
    let mut sums: Vec<Vec<StableSum>> = diagram
        .states()
        .iter()
        .map(|&n| vec![StableSum::new(); n])
        .collect();
    for path in CompatiblePaths::new(diagram, strategy, fixed)? {
        let p = diagram.probability_of(&path);
        if p == 0.0 {
            continue;
        }
        for (node, &state) in path.iter().enumerate() {
            sums[node][state].add(p);
        }
    }
    Ok(sums)
}

impl StateProbabilities {
    /// Marginals of every chance and decision node.
    pub fn new(diagram: &InfluenceDiagram, strategy: &DecisionStrategy) -> Result<Self, DiagramError> {
        let sums = accumulate(diagram, strategy, None)?;
        Ok(Self {
            names: node_names(diagram),
            probabilities: sums
                .iter()
                .map(|row| row.iter().map(StableSum::value).collect())
                .collect(),
            fixed: None,
        })
    }

    /// Marginals conditional on a chance node taking a state.
    ///
    /// `prior` supplies the probability of the conditioning event; it must
    /// be positive.
    pub fn conditional(
        diagram: &InfluenceDiagram,
        strategy: &DecisionStrategy,
        node: &str,
        state: impl Into<StateRef>,
        prior: &StateProbabilities,
    ) -> Result<Self, ModelError> {
        let fixed = FixedPath::from_names(diagram, [(node, state)])?;
        let Some((index, state)) = fixed.iter().next() else {
            return Err(DiagramError::InvalidFixedPath(format!("nothing fixed for {node}")).into());
        };
        let mass = prior
            .probabilities
            .get(index)
            .and_then(|row| row.get(state))
            .copied()
            .unwrap_or(0.0);
        if mass <= 0.0 {
            return Err(DiagramError::InvalidFixedPath(format!(
                "{node} = {} has zero probability under the strategy",
                diagram.nodes()[index].states()[state]
            ))
            .into());
        }
        let sums = accumulate(diagram, strategy, Some(&fixed))?;
        Ok(Self {
            names: node_names(diagram),
            probabilities: sums
                .iter()
                .map(|row| row.iter().map(|s| s.value() / mass).collect())
                .collect(),
            fixed: Some((index, state)),
        })
    }

    /// Distribution of the node at `index`.
    pub fn get(&self, index: usize) -> Option<&[f64]> {
        self.probabilities.get(index).map(Vec::as_slice)
    }

    pub fn by_name(&self, name: &str) -> Option<&[f64]> {
        let index = self.names.iter().position(|n| n == name)?;
        self.get(index)
    }

    /// `(node name, distribution)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.probabilities.iter().map(Vec::as_slice))
    }

    /// The conditioning event, if any.
    pub fn fixed(&self) -> Option<(usize, State)> {
        self.fixed
    }
}

fn node_names(diagram: &InfluenceDiagram) -> Vec<String> {
    diagram.nodes()[..diagram.states().len()]
        .iter()
        .map(|n| n.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::test_utils::{used_car, used_car_strategy};

    #[test]
    fn test_marginals_under_optimal_strategy() {
        let d = used_car();
        let strategy = used_car_strategy(&d);
        let sp = StateProbabilities::new(&d, &strategy).unwrap();
        assert_eq!(sp.by_name("T").unwrap(), &[0.0, 1.0]);
        let r = sp.by_name("R").unwrap();
        assert_approx_eq!(r[1], 0.2, 1e-12);
        assert_approx_eq!(r[2], 0.8, 1e-12);
        let a = sp.by_name("A").unwrap();
        assert_approx_eq!(a[0], 0.8, 1e-12);
        assert_approx_eq!(a[1], 0.2, 1e-12);
        for (_, dist) in sp.iter() {
            assert_approx_eq!(dist.iter().sum::<f64>(), 1.0, 1e-12);
        }
    }

    #[test]
    fn test_conditional_on_chance_state() {
        let d = used_car();
        let strategy = used_car_strategy(&d);
        let prior = StateProbabilities::new(&d, &strategy).unwrap();
        let sp = StateProbabilities::conditional(&d, &strategy, "O", "lemon", &prior).unwrap();
        assert_eq!(sp.fixed(), Some((0, 0)));
        assert_approx_eq!(sp.by_name("O").unwrap()[0], 1.0, 1e-12);
        assert_approx_eq!(sp.by_name("A").unwrap()[1], 1.0, 1e-12);
    }

    #[test]
    fn test_conditional_zero_prior_rejected() {
        let d = used_car();
        let strategy = used_car_strategy(&d);
        let prior = StateProbabilities::new(&d, &strategy).unwrap();
        // The car is always tested, so R = "no test" never happens.
        let err = StateProbabilities::conditional(&d, &strategy, "R", "no test", &prior)
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Diagram(DiagramError::InvalidFixedPath(_))
        ));
    }
}
