//! Decision strategies: one choice per information state of each decision node.

use crate::diagram::{InfluenceDiagram, NodeKind, State};
use crate::error::DiagramError;
use crate::paths::{Path, Paths};

/// Choices of a single decision node, stored row-major over its
/// information states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDecisionStrategy {
    node: usize,
    name: String,
    information_set: Vec<usize>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    choices: Vec<State>,
}

impl LocalDecisionStrategy {
    /// Build from a flat list of choices, one per information state in
    /// lexicographic order.
    pub fn new(
        diagram: &InfluenceDiagram,
        name: &str,
        choices: Vec<State>,
    ) -> Result<Self, DiagramError> {
        let node = diagram.index_of(name)?;
        let kind = diagram.nodes()[node].kind();
        if kind != NodeKind::Decision {
            return Err(DiagramError::WrongNodeKind {
                node: name.to_string(),
                expected: NodeKind::Decision,
                actual: kind,
            });
        }
        let information_set = diagram.information_set(node).to_vec();
        let shape: Vec<usize> = information_set
            .iter()
            .map(|&p| diagram.states()[p])
            .collect();
        let expected: usize = shape.iter().product();
        if choices.len() != expected {
            return Err(DiagramError::TensorSize {
                expected,
                actual: choices.len(),
            });
        }
        let own = diagram.states()[node];
        if let Some(&bad) = choices.iter().find(|&&c| c >= own) {
            return Err(DiagramError::UnknownState {
                node: name.to_string(),
                state: format!("#{bad}"),
            });
        }
        Ok(Self::from_parts(
            node,
            name.to_string(),
            information_set,
            shape,
            choices,
        ))
    }

    pub(crate) fn from_parts(
        node: usize,
        name: String,
        information_set: Vec<usize>,
        shape: Vec<usize>,
        choices: Vec<State>,
    ) -> Self {
        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        Self {
            node,
            name,
            information_set,
            shape,
            strides,
            choices,
        }
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn information_set(&self) -> &[usize] {
        &self.information_set
    }

    /// State counts of the information set.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Chosen state for an information state.
    pub fn choice(&self, information_state: &[State]) -> Option<State> {
        if information_state.len() != self.shape.len()
            || information_state
                .iter()
                .zip(&self.shape)
                .any(|(s, n)| s >= n)
        {
            return None;
        }
        let offset: usize = information_state
            .iter()
            .zip(&self.strides)
            .map(|(s, k)| s * k)
            .sum();
        self.choices.get(offset).copied()
    }

    /// Chosen state given a full path whose parent coordinates are set.
    pub(crate) fn choice_for_path(&self, path: &[State]) -> State {
        let offset: usize = self
            .information_set
            .iter()
            .zip(&self.strides)
            .map(|(&p, k)| path[p] * k)
            .sum();
        self.choices[offset]
    }

    /// `(information state, choice)` pairs in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (Path, State)> + '_ {
        Paths::new(&self.shape).zip(self.choices.iter().copied())
    }
}

/// A strategy for every decision node of a diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionStrategy {
    locals: Vec<LocalDecisionStrategy>,
}

impl DecisionStrategy {
    pub fn new(locals: Vec<LocalDecisionStrategy>) -> Self {
        Self { locals }
    }

    pub fn locals(&self) -> &[LocalDecisionStrategy] {
        &self.locals
    }

    /// Local strategy of a decision node by index.
    pub fn local(&self, node: usize) -> Option<&LocalDecisionStrategy> {
        self.locals.iter().find(|l| l.node == node)
    }

    pub fn by_name(&self, name: &str) -> Option<&LocalDecisionStrategy> {
        self.locals.iter().find(|l| l.name == name)
    }

    /// Chosen state of `node` at an information state.
    pub fn choice(&self, node: usize, information_state: &[State]) -> Option<State> {
        self.local(node)?.choice(information_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::used_car;

    #[test]
    fn test_local_strategy_lookup() {
        let d = used_car();
        let a = LocalDecisionStrategy::new(&d, "A", vec![2, 1, 0]).unwrap();
        assert_eq!(a.node(), 3);
        assert_eq!(a.shape(), &[3]);
        assert_eq!(a.choice(&[1]), Some(1));
        assert_eq!(a.choice(&[3]), None);
        assert_eq!(a.choice_for_path(&[0, 1, 2, 0]), 0);
        let rules: Vec<_> = a.iter().collect();
        assert_eq!(rules, vec![(vec![0], 2), (vec![1], 1), (vec![2], 0)]);
    }

    #[test]
    fn test_local_strategy_validation() {
        let d = used_car();
        assert!(matches!(
            LocalDecisionStrategy::new(&d, "O", vec![0]),
            Err(DiagramError::WrongNodeKind { .. })
        ));
        assert!(matches!(
            LocalDecisionStrategy::new(&d, "A", vec![0, 0]),
            Err(DiagramError::TensorSize { .. })
        ));
        assert!(matches!(
            LocalDecisionStrategy::new(&d, "A", vec![0, 0, 3]),
            Err(DiagramError::UnknownState { .. })
        ));
    }

    #[test]
    fn test_root_decision_has_single_rule() {
        let d = used_car();
        let t = LocalDecisionStrategy::new(&d, "T", vec![1]).unwrap();
        assert_eq!(t.choice(&[]), Some(1));
        let strategy = DecisionStrategy::new(vec![t]);
        assert_eq!(strategy.choice(1, &[]), Some(1));
        assert!(strategy.by_name("A").is_none());
    }
}
