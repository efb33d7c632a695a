//! Lazy enumeration of joint state paths.
//!
//! Paths are produced in lexicographic order with the rightmost coordinate
//! varying fastest. Fixed coordinates are never iterated: the odometer only
//! turns the free axes, so a fixed enumeration costs exactly as many steps
//! as it yields paths.

use std::collections::{BTreeMap, BTreeSet};

use crate::decision::DecisionStrategy;
use crate::diagram::{InfluenceDiagram, NodeKind, State, StateRef};
use crate::error::DiagramError;

/// One state per chance and decision node, in index order.
pub type Path = Vec<State>;

/// Node index to forced state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedPath(BTreeMap<usize, State>);

impl FixedPath {
    /// Build from raw indices. Ranges are checked by the enumerator.
    pub fn from_indices<I: IntoIterator<Item = (usize, State)>>(pairs: I) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Build from node names and state references.
    pub fn from_names<'n, I, R>(diagram: &InfluenceDiagram, pairs: I) -> Result<Self, DiagramError>
    where
        I: IntoIterator<Item = (&'n str, R)>,
        R: Into<StateRef>,
    {
        let mut fixed = BTreeMap::new();
        for (name, state) in pairs {
            let index = diagram.index_of(name)?;
            let node = &diagram.nodes()[index];
            if node.kind() == NodeKind::Value {
                return Err(DiagramError::InvalidFixedPath(format!(
                    "{name} is a value node and has no states"
                )));
            }
            let state = node.state(&state.into())?;
            if fixed.insert(index, state).is_some() {
                return Err(DiagramError::InvalidFixedPath(format!(
                    "{name} is fixed more than once"
                )));
            }
        }
        Ok(Self(fixed))
    }

    pub fn get(&self, index: usize) -> Option<State> {
        self.0.get(&index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, State)> + '_ {
        self.0.iter().map(|(&i, &s)| (i, s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, index: usize, state: State) {
        self.0.insert(index, state);
    }
}

/// Lexicographic path iterator over a state space.
#[derive(Debug, Clone)]
pub struct Paths {
    states: Vec<usize>,
    free: Vec<usize>,
    start: Path,
    next: Option<Path>,
}

impl Paths {
    /// All paths of the state space.
    pub fn new(states: &[usize]) -> Self {
        Self::build(states.to_vec(), vec![0; states.len()], (0..states.len()).collect())
    }

    /// Paths whose fixed coordinates take the given states.
    pub fn with_fixed(states: &[usize], fixed: &FixedPath) -> Result<Self, DiagramError> {
        let mut start = vec![0; states.len()];
        for (index, state) in fixed.iter() {
            let Some(&count) = states.get(index) else {
                return Err(DiagramError::InvalidFixedPath(format!(
                    "node index {index} is outside the path of length {}",
                    states.len()
                )));
            };
            if state >= count {
                return Err(DiagramError::InvalidFixedPath(format!(
                    "state {state} out of range for node index {index} with {count} states"
                )));
            }
            start[index] = state;
        }
        let free = (0..states.len()).filter(|i| fixed.get(*i).is_none()).collect();
        Ok(Self::build(states.to_vec(), start, free))
    }

    fn build(states: Vec<usize>, start: Path, free: Vec<usize>) -> Self {
        let empty = free.iter().any(|&i| states[i] == 0);
        let next = if empty { None } else { Some(start.clone()) };
        Self {
            states,
            free,
            start,
            next,
        }
    }

    /// Number of paths the iterator yields in total, `None` on overflow.
    pub fn path_count(&self) -> Option<u128> {
        self.free
            .iter()
            .try_fold(1u128, |acc, &i| acc.checked_mul(self.states[i] as u128))
    }

    /// Rewind to the first path.
    pub fn restart(&mut self) {
        let empty = self.free.iter().any(|&i| self.states[i] == 0);
        self.next = if empty { None } else { Some(self.start.clone()) };
    }

    fn advance(&mut self, path: &Path) -> Option<Path> {
        let mut next = path.clone();
        for &axis in self.free.iter().rev() {
            next[axis] += 1;
            if next[axis] < self.states[axis] {
                return Some(next);
            }
            next[axis] = 0;
        }
        None
    }
}

impl Iterator for Paths {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        let current = self.next.take()?;
        self.next = self.advance(&current);
        Some(current)
    }
}

/// A set of forbidden state combinations over a subset of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenPath {
    nodes: Vec<usize>,
    states: BTreeSet<Vec<State>>,
}

impl ForbiddenPath {
    /// Build from node names and tuples of state references.
    pub fn from_names<I, T, R>(
        diagram: &InfluenceDiagram,
        nodes: &[&str],
        combinations: I,
    ) -> Result<Self, DiagramError>
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = R>,
        R: Into<StateRef>,
    {
        if nodes.is_empty() {
            return Err(DiagramError::InvalidForbiddenPath(
                "at least one node is required".to_string(),
            ));
        }
        let mut indices = Vec::with_capacity(nodes.len());
        for name in nodes {
            let index = diagram.index_of(name)?;
            if diagram.nodes()[index].kind() == NodeKind::Value {
                return Err(DiagramError::InvalidForbiddenPath(format!(
                    "{name} is a value node"
                )));
            }
            if indices.contains(&index) {
                return Err(DiagramError::InvalidForbiddenPath(format!(
                    "{name} is listed more than once"
                )));
            }
            indices.push(index);
        }

        let mut states = BTreeSet::new();
        for combination in combinations {
            let refs: Vec<StateRef> = combination.into_iter().map(Into::into).collect();
            if refs.len() != indices.len() {
                return Err(DiagramError::InvalidForbiddenPath(format!(
                    "expected {} states per combination, got {}",
                    indices.len(),
                    refs.len()
                )));
            }
            let tuple = refs
                .iter()
                .zip(&indices)
                .map(|(state, &i)| diagram.nodes()[i].state(state))
                .collect::<Result<Vec<_>, _>>()?;
            states.insert(tuple);
        }
        Ok(Self {
            nodes: indices,
            states,
        })
    }

    /// Build from node indices and state tuples without name resolution.
    pub fn from_indices(nodes: Vec<usize>, states: BTreeSet<Vec<State>>) -> Self {
        Self { nodes, states }
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether the path takes one of the forbidden combinations.
    pub fn matches(&self, path: &[State]) -> bool {
        let projected: Vec<State> = self.nodes.iter().map(|&i| path[i]).collect();
        self.states.contains(&projected)
    }
}

/// Paths consistent with a decision strategy.
///
/// Only chance axes are iterated; each decision coordinate is read from the
/// strategy once its information state is known.
pub struct CompatiblePaths<'a> {
    strategy: &'a DecisionStrategy,
    decisions: Vec<usize>,
    inner: Paths,
}

impl<'a> CompatiblePaths<'a> {
    pub fn new(
        diagram: &InfluenceDiagram,
        strategy: &'a DecisionStrategy,
        fixed: Option<&FixedPath>,
    ) -> Result<Self, DiagramError> {
        let decisions = diagram.decision_nodes().to_vec();
        let mut all_fixed = fixed.cloned().unwrap_or_default();
        if let Some((index, _)) = all_fixed.iter().find(|(i, _)| decisions.contains(i)) {
            return Err(DiagramError::InvalidFixedPath(format!(
                "decision node {} cannot be fixed when following a strategy",
                diagram.nodes()[index].name()
            )));
        }
        for &d in &decisions {
            if strategy.local(d).is_none() {
                return Err(DiagramError::InvalidOption(format!(
                    "strategy has no entry for decision node {}",
                    diagram.nodes()[d].name()
                )));
            }
            all_fixed.insert(d, 0);
        }
        let inner = Paths::with_fixed(diagram.states(), &all_fixed)?;
        Ok(Self {
            strategy,
            decisions,
            inner,
        })
    }
}

impl Iterator for CompatiblePaths<'_> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        let mut path = self.inner.next()?;
        for &d in &self.decisions {
            if let Some(local) = self.strategy.local(d) {
                path[d] = local.choice_for_path(&path);
            }
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{used_car, used_car_strategy};

    #[test]
    fn test_enumeration_order() {
        let paths: Vec<Path> = Paths::new(&[2, 3]).collect();
        assert_eq!(
            paths,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn test_empty_state_space() {
        assert_eq!(Paths::new(&[]).collect::<Vec<_>>(), vec![Vec::<State>::new()]);
        assert_eq!(Paths::new(&[2, 0, 3]).count(), 0);
        assert_eq!(Paths::new(&[2, 0, 3]).path_count(), Some(0));
    }

    #[test]
    fn test_fixed_axis_is_skipped() {
        let fixed = FixedPath::from_indices([(1, 2)]);
        let paths: Vec<Path> = Paths::with_fixed(&[2, 3, 2], &fixed).unwrap().collect();
        assert_eq!(
            paths,
            vec![vec![0, 2, 0], vec![0, 2, 1], vec![1, 2, 0], vec![1, 2, 1]]
        );
    }

    #[test]
    fn test_fixed_out_of_range() {
        let fixed = FixedPath::from_indices([(0, 5)]);
        assert!(matches!(
            Paths::with_fixed(&[2, 3], &fixed),
            Err(DiagramError::InvalidFixedPath(_))
        ));
        let fixed = FixedPath::from_indices([(4, 0)]);
        assert!(Paths::with_fixed(&[2, 3], &fixed).is_err());
    }

    #[test]
    fn test_restart_and_count() {
        let mut paths = Paths::new(&[2, 2, 2]);
        assert_eq!(paths.path_count(), Some(8));
        assert_eq!(paths.by_ref().count(), 8);
        assert!(paths.next().is_none());
        paths.restart();
        assert_eq!(paths.next(), Some(vec![0, 0, 0]));
    }

    #[test]
    fn test_count_overflow() {
        let states = vec![usize::MAX; 4];
        assert_eq!(Paths::new(&states).path_count(), None);
    }

    #[test]
    fn test_fixed_from_names() {
        let d = used_car();
        let fixed = FixedPath::from_names(&d, [("O", StateRef::from("peach"))]).unwrap();
        assert_eq!(fixed.get(0), Some(1));
        assert!(matches!(
            FixedPath::from_names(&d, [("V1", StateRef::from(0usize))]),
            Err(DiagramError::InvalidFixedPath(_))
        ));
        assert!(matches!(
            FixedPath::from_names(&d, [("O", StateRef::from("plum"))]),
            Err(DiagramError::UnknownState { .. })
        ));
    }

    #[test]
    fn test_forbidden_matches() {
        let d = used_car();
        let forbidden =
            ForbiddenPath::from_names(&d, &["T", "A"], [["test", "buy without guarantee"]])
                .unwrap();
        assert!(forbidden.matches(&[0, 1, 0, 0]));
        assert!(!forbidden.matches(&[0, 0, 0, 0]));
        assert!(!forbidden.matches(&[0, 1, 0, 1]));
        let matching = Paths::new(d.states()).filter(|p| forbidden.matches(p)).count();
        assert_eq!(matching, 2 * 3);
    }

    #[test]
    fn test_forbidden_arity_checked() {
        let d = used_car();
        let err = ForbiddenPath::from_names(&d, &["T", "A"], [vec!["test"]]).unwrap_err();
        assert!(matches!(err, DiagramError::InvalidForbiddenPath(_)));
    }

    #[test]
    fn test_compatible_paths_follow_strategy() {
        let d = used_car();
        let strategy = used_car_strategy(&d);
        let paths: Vec<Path> = CompatiblePaths::new(&d, &strategy, None).unwrap().collect();
        // O and R vary; T and A come from the strategy.
        assert_eq!(paths.len(), 2 * 3);
        for path in &paths {
            assert_eq!(path[1], 1, "always test");
            match path[2] {
                1 => assert_eq!(path[3], 1),
                2 => assert_eq!(path[3], 0),
                _ => {}
            }
        }
    }

    #[test]
    fn test_compatible_paths_reject_fixed_decision() {
        let d = used_car();
        let strategy = used_car_strategy(&d);
        let fixed = FixedPath::from_indices([(1, 0)]);
        assert!(matches!(
            CompatiblePaths::new(&d, &strategy, Some(&fixed)),
            Err(DiagramError::InvalidFixedPath(_))
        ));
    }
}
