//! Influence diagram assembly and path evaluation.
//!
//! A diagram moves through three phases:
//!
//! 1. nodes are added by name (`add_node`);
//! 2. `generate_arcs` orders them topologically and resolves information
//!    sets to indices; tensors can now be attached;
//! 3. `generate` fills defaults, fixes the path utility and its translation.
//!
//! Chance and decision nodes get indices `0..n` and every path is a vector
//! of `n` states in that order. Value nodes are indexed after them.

pub mod node;
pub mod tensor;

pub use node::{Node, NodeKind, State, StateRef};
pub use tensor::{StateMatrix, Tensor, TensorSource};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dp_math::{approx_eq, stable_sum, PROBABILITY_TOL};
use serde::Serialize;
use tracing::debug;

use crate::error::DiagramError;
use crate::paths::Paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Building,
    Assembled,
    Generated,
}

/// Guarantee on the sign of translated path utilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilitySign {
    /// Every path utility is at least 1.
    Positive,
    /// Every path utility is at most -1.
    Negative,
    Unrestricted,
}

/// Options for [`InfluenceDiagram::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Fill chance nodes without a tensor with a uniform distribution.
    pub default_probability: bool,
    /// Fill value nodes without a tensor with zeros and use the additive
    /// path utility. When false the path utility must be set explicitly.
    pub default_utility: bool,
    pub positive_path_utility: bool,
    pub negative_path_utility: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            default_probability: true,
            default_utility: true,
            positive_path_utility: false,
            negative_path_utility: false,
        }
    }
}

impl From<&dp_config::GenerateSpec> for GenerateOptions {
    fn from(spec: &dp_config::GenerateSpec) -> Self {
        Self {
            default_probability: spec.default_probability,
            default_utility: spec.default_utility,
            positive_path_utility: spec.positive_path_utility,
            negative_path_utility: spec.negative_path_utility,
        }
    }
}

/// Utility of a complete path, before translation.
#[derive(Clone)]
pub enum PathUtility {
    /// Sum of the value-node utilities along the path.
    Additive,
    /// Arbitrary function of the path.
    Custom(Arc<dyn Fn(&[State]) -> f64 + Send + Sync>),
}

impl PathUtility {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[State]) -> f64 + Send + Sync + 'static,
    {
        PathUtility::Custom(Arc::new(f))
    }
}

impl std::fmt::Debug for PathUtility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathUtility::Additive => write!(f, "Additive"),
            PathUtility::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// An influence diagram.
#[derive(Debug, Clone)]
pub struct InfluenceDiagram {
    nodes: Vec<Node>,
    positions: HashMap<String, usize>,
    phase: Phase,
    strict: bool,
    information_sets: Vec<Vec<usize>>,
    states: Vec<usize>,
    chance: Vec<usize>,
    decision: Vec<usize>,
    value: Vec<usize>,
    /// Probability tables for chance nodes, utility tables for value nodes.
    tensors: Vec<Option<Tensor>>,
    path_utility: Option<PathUtility>,
    translation: f64,
    sign: UtilitySign,
}

impl Default for InfluenceDiagram {
    fn default() -> Self {
        Self::new()
    }
}

impl InfluenceDiagram {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            positions: HashMap::new(),
            phase: Phase::Building,
            strict: true,
            information_sets: Vec::new(),
            states: Vec::new(),
            chance: Vec::new(),
            decision: Vec::new(),
            value: Vec::new(),
            tensors: Vec::new(),
            path_utility: None,
            translation: 0.0,
            sign: UtilitySign::Unrestricted,
        }
    }

    /// Toggle the row-sum check on probability tables (on by default).
    ///
    /// Negative and non-finite probabilities are rejected either way.
    pub fn with_strict_probabilities(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    /// Register a node. Fails on duplicate names and after `generate_arcs`.
    pub fn add_node(&mut self, node: Node) -> Result<(), DiagramError> {
        if self.phase != Phase::Building {
            return Err(DiagramError::AlreadyAssembled);
        }
        node.validate()?;
        if self.positions.contains_key(node.name()) {
            return Err(DiagramError::DuplicateNode {
                name: node.name().to_string(),
            });
        }
        self.positions
            .insert(node.name().to_string(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Order nodes topologically and resolve information sets.
    ///
    /// Chance and decision nodes are ordered with Kahn's algorithm, breaking
    /// ties by insertion order; value nodes follow in insertion order.
    pub fn generate_arcs(&mut self) -> Result<(), DiagramError> {
        if self.phase != Phase::Building {
            return Err(DiagramError::AlreadyAssembled);
        }

        let count = self.nodes.len();
        let mut parents: Vec<Vec<usize>> = Vec::with_capacity(count);
        for node in &self.nodes {
            let mut resolved = Vec::with_capacity(node.information_set().len());
            for parent in node.information_set() {
                let &pos = self
                    .positions
                    .get(parent)
                    .ok_or_else(|| DiagramError::UnknownNode {
                        name: parent.clone(),
                    })?;
                if self.nodes[pos].kind() == NodeKind::Value {
                    return Err(DiagramError::InvalidNode {
                        name: node.name().to_string(),
                        reason: format!("value node {parent} cannot appear in an information set"),
                    });
                }
                resolved.push(pos);
            }
            parents.push(resolved);
        }

        let is_value = |pos: usize| self.nodes[pos].kind() == NodeKind::Value;
        let mut indegree: Vec<usize> = parents.iter().map(Vec::len).collect();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (child, ps) in parents.iter().enumerate() {
            for &p in ps {
                children[p].push(child);
            }
        }

        let mut ready: BTreeSet<usize> = (0..count)
            .filter(|&pos| !is_value(pos) && indegree[pos] == 0)
            .collect();
        let mut order = Vec::with_capacity(count);
        while let Some(pos) = ready.pop_first() {
            order.push(pos);
            for &child in &children[pos] {
                indegree[child] -= 1;
                if indegree[child] == 0 && !is_value(child) {
                    ready.insert(child);
                }
            }
        }

        let non_value = (0..count).filter(|&pos| !is_value(pos)).count();
        if order.len() < non_value {
            let placed: BTreeSet<usize> = order.iter().copied().collect();
            let nodes = (0..count)
                .filter(|pos| !is_value(*pos) && !placed.contains(pos))
                .map(|pos| self.nodes[pos].name().to_string())
                .collect();
            return Err(DiagramError::CyclicGraph { nodes });
        }
        order.extend((0..count).filter(|&pos| is_value(pos)));

        let mut index_of_pos = vec![0; count];
        for (index, &pos) in order.iter().enumerate() {
            index_of_pos[pos] = index;
        }

        let mut slots: Vec<Option<Node>> = std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        self.nodes = order
            .iter()
            .filter_map(|&pos| slots[pos].take())
            .collect();
        self.information_sets = order
            .iter()
            .map(|&pos| parents[pos].iter().map(|&p| index_of_pos[p]).collect())
            .collect();
        self.positions = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name().to_string(), i))
            .collect();

        self.states = self.nodes[..non_value]
            .iter()
            .map(Node::num_states)
            .collect();
        self.chance.clear();
        self.decision.clear();
        self.value.clear();
        for (i, node) in self.nodes.iter().enumerate() {
            match node.kind() {
                NodeKind::Chance => self.chance.push(i),
                NodeKind::Decision => self.decision.push(i),
                NodeKind::Value => self.value.push(i),
            }
        }
        self.tensors = vec![None; count];
        self.phase = Phase::Assembled;

        debug!(
            chance = self.chance.len(),
            decision = self.decision.len(),
            value = self.value.len(),
            "arcs generated"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Index of a node after `generate_arcs`.
    pub fn index_of(&self, name: &str) -> Result<usize, DiagramError> {
        if self.phase == Phase::Building {
            return Err(DiagramError::NotAssembled);
        }
        self.positions
            .get(name)
            .copied()
            .ok_or_else(|| DiagramError::UnknownNode {
                name: name.to_string(),
            })
    }

    /// Number of states of a chance or decision node.
    pub fn num_states(&self, name: &str) -> Result<usize, DiagramError> {
        let node = self.node_by_name(name)?;
        if node.kind() == NodeKind::Value {
            return Err(DiagramError::WrongNodeKind {
                node: name.to_string(),
                expected: NodeKind::Chance,
                actual: NodeKind::Value,
            });
        }
        Ok(node.num_states())
    }

    pub fn node_by_name(&self, name: &str) -> Result<&Node, DiagramError> {
        self.positions
            .get(name)
            .map(|&pos| &self.nodes[pos])
            .ok_or_else(|| DiagramError::UnknownNode {
                name: name.to_string(),
            })
    }

    /// Node at an index (insertion position before `generate_arcs`).
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// State counts of the chance and decision nodes, in index order.
    pub fn states(&self) -> &[usize] {
        &self.states
    }

    pub fn chance_nodes(&self) -> &[usize] {
        &self.chance
    }

    pub fn decision_nodes(&self) -> &[usize] {
        &self.decision
    }

    pub fn value_nodes(&self) -> &[usize] {
        &self.value
    }

    /// Parent indices of a node.
    pub fn information_set(&self, index: usize) -> &[usize] {
        self.information_sets
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Arcs `(parent, child)` in child index order.
    pub fn arcs(&self) -> Vec<(usize, usize)> {
        self.information_sets
            .iter()
            .enumerate()
            .flat_map(|(child, parents)| parents.iter().map(move |&p| (p, child)))
            .collect()
    }

    pub fn is_generated(&self) -> bool {
        self.phase == Phase::Generated
    }

    pub fn translation(&self) -> f64 {
        self.translation
    }

    pub fn utility_sign(&self) -> UtilitySign {
        self.sign
    }

    pub fn path_utility_function(&self) -> Option<&PathUtility> {
        self.path_utility.as_ref()
    }

    /// Probability table of a chance node, once set.
    pub fn probabilities(&self, index: usize) -> Option<&Tensor> {
        match self.nodes.get(index)?.kind() {
            NodeKind::Chance => self.tensors.get(index)?.as_ref(),
            _ => None,
        }
    }

    /// Utility table of a value node, once set.
    pub fn utilities(&self, index: usize) -> Option<&Tensor> {
        match self.nodes.get(index)?.kind() {
            NodeKind::Value => self.tensors.get(index)?.as_ref(),
            _ => None,
        }
    }

    /// Shape a node's table must have: parent state counts, followed by
    /// the node's own state count for chance nodes.
    pub fn expected_shape(&self, index: usize) -> Vec<usize> {
        let mut shape: Vec<usize> = self
            .information_set(index)
            .iter()
            .map(|&p| self.states[p])
            .collect();
        if let Some(node) = self.nodes.get(index) {
            if node.kind() != NodeKind::Value {
                shape.push(node.num_states());
            }
        }
        shape
    }

    fn assembled_node(&self, name: &str, expected: NodeKind) -> Result<usize, DiagramError> {
        match self.phase {
            Phase::Building => return Err(DiagramError::NotAssembled),
            Phase::Generated => return Err(DiagramError::AlreadyGenerated),
            Phase::Assembled => {}
        }
        let index = self.index_of(name)?;
        let actual = self.nodes[index].kind();
        if actual != expected {
            return Err(DiagramError::WrongNodeKind {
                node: name.to_string(),
                expected,
                actual,
            });
        }
        Ok(index)
    }

    fn matrix_axes(&self, index: usize) -> Vec<(String, Vec<String>)> {
        let mut axes: Vec<(String, Vec<String>)> = self
            .information_set(index)
            .iter()
            .map(|&p| {
                let parent = &self.nodes[p];
                (parent.name().to_string(), parent.states().to_vec())
            })
            .collect();
        let node = &self.nodes[index];
        if node.kind() != NodeKind::Value {
            axes.push((node.name().to_string(), node.states().to_vec()));
        }
        axes
    }

    // ------------------------------------------------------------------
    // Tensors
    // ------------------------------------------------------------------

    /// Zero-filled probability matrix for a chance node.
    pub fn probability_matrix(&self, name: &str) -> Result<StateMatrix, DiagramError> {
        let index = self.assembled_node(name, NodeKind::Chance)?;
        Ok(StateMatrix::new(
            name.to_string(),
            NodeKind::Chance,
            self.matrix_axes(index),
            0.0,
        ))
    }

    /// Utility matrix for a value node with every entry unset.
    pub fn utility_matrix(&self, name: &str) -> Result<StateMatrix, DiagramError> {
        let index = self.assembled_node(name, NodeKind::Value)?;
        Ok(StateMatrix::new(
            name.to_string(),
            NodeKind::Value,
            self.matrix_axes(index),
            f64::NEG_INFINITY,
        ))
    }

    fn unpack(&self, name: &str, index: usize, source: TensorSource) -> Result<Tensor, DiagramError> {
        let tensor = match source {
            TensorSource::Raw(t) => t,
            TensorSource::Matrix(m) if m.node() == name => m.into_tensor(),
            TensorSource::Matrix(m) => {
                return Err(DiagramError::InvalidOption(format!(
                    "matrix built for {} cannot be attached to {}",
                    m.node(),
                    name
                )))
            }
        };
        let expected = self.expected_shape(index);
        if tensor.shape() != expected.as_slice() {
            return Err(DiagramError::DimensionMismatch {
                node: name.to_string(),
                expected,
                actual: tensor.shape().to_vec(),
            });
        }
        Ok(tensor)
    }

    /// Attach the conditional probability table of a chance node.
    pub fn set_probabilities(
        &mut self,
        name: &str,
        source: impl Into<TensorSource>,
    ) -> Result<(), DiagramError> {
        let index = self.assembled_node(name, NodeKind::Chance)?;
        let tensor = self.unpack(name, index, source.into())?;

        if let Some(&value) = tensor.data().iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(DiagramError::NegativeProbability {
                node: name.to_string(),
                value,
            });
        }
        if self.strict {
            for (leading, row) in tensor.rows() {
                let sum = stable_sum(row.iter().copied());
                if !approx_eq(sum, 1.0, PROBABILITY_TOL) {
                    return Err(DiagramError::UnnormalizedProbability {
                        node: name.to_string(),
                        index: leading,
                        sum,
                    });
                }
            }
        }
        self.tensors[index] = Some(tensor);
        Ok(())
    }

    /// Attach the utility table of a value node.
    pub fn set_utility(
        &mut self,
        name: &str,
        source: impl Into<TensorSource>,
    ) -> Result<(), DiagramError> {
        let index = self.assembled_node(name, NodeKind::Value)?;
        let tensor = self.unpack(name, index, source.into())?;
        if tensor.data().iter().any(|v| !v.is_finite()) {
            return Err(DiagramError::NonFiniteUtility {
                node: name.to_string(),
            });
        }
        self.tensors[index] = Some(tensor);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Finalize the diagram.
    pub fn generate(&mut self, options: GenerateOptions) -> Result<(), DiagramError> {
        match self.phase {
            Phase::Building => return Err(DiagramError::NotAssembled),
            Phase::Generated => return Err(DiagramError::AlreadyGenerated),
            Phase::Assembled => {}
        }
        if options.positive_path_utility && options.negative_path_utility {
            return Err(DiagramError::InvalidOption(
                "positive_path_utility and negative_path_utility are exclusive".to_string(),
            ));
        }
        if (options.positive_path_utility || options.negative_path_utility)
            && !options.default_utility
        {
            return Err(DiagramError::InvalidOption(
                "path utility translation requires default_utility".to_string(),
            ));
        }

        for &j in &self.chance {
            if self.tensors[j].is_none() {
                if !options.default_probability {
                    return Err(DiagramError::MissingProbabilities {
                        node: self.nodes[j].name().to_string(),
                    });
                }
                let shape = self.expected_shape(j);
                let uniform = 1.0 / self.nodes[j].num_states() as f64;
                self.tensors[j] = Some(Tensor::filled(shape, uniform));
            }
        }

        if options.default_utility {
            for &v in &self.value {
                if self.tensors[v].is_none() {
                    self.tensors[v] = Some(Tensor::zeros(self.expected_shape(v)));
                }
            }
            self.path_utility = Some(PathUtility::Additive);
        } else {
            self.path_utility = None;
        }

        self.translation = 0.0;
        self.sign = UtilitySign::Unrestricted;
        if options.positive_path_utility || options.negative_path_utility {
            let (min, max) = Paths::new(&self.states)
                .filter_map(|path| self.utility_of(&path))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), u| {
                    (lo.min(u), hi.max(u))
                });
            if options.positive_path_utility {
                self.translation = 1.0 - min;
                self.sign = UtilitySign::Positive;
            } else {
                self.translation = -1.0 - max;
                self.sign = UtilitySign::Negative;
            }
        }

        self.phase = Phase::Generated;
        debug!(
            translation = self.translation,
            sign = ?self.sign,
            "diagram generated"
        );
        Ok(())
    }

    /// Replace the path utility after generation.
    ///
    /// Resets the translation; the new function is used as is.
    pub fn set_path_utility(&mut self, utility: PathUtility) -> Result<(), DiagramError> {
        if self.phase != Phase::Generated {
            return Err(DiagramError::NotGenerated);
        }
        self.path_utility = Some(utility);
        self.translation = 0.0;
        self.sign = UtilitySign::Unrestricted;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Path evaluation
    // ------------------------------------------------------------------

    fn check_path(&self, path: &[State]) -> Result<(), DiagramError> {
        if self.phase != Phase::Generated {
            return Err(DiagramError::NotGenerated);
        }
        if path.len() != self.states.len() || path.iter().zip(&self.states).any(|(s, n)| s >= n) {
            return Err(DiagramError::IndexOutOfRange {
                index: path.to_vec(),
                shape: self.states.clone(),
            });
        }
        Ok(())
    }

    /// Product of the chance-node probabilities along a path.
    pub fn path_probability(&self, path: &[State]) -> Result<f64, DiagramError> {
        self.check_path(path)?;
        Ok(self.probability_of(path))
    }

    /// Path utility without translation.
    pub fn raw_path_utility(&self, path: &[State]) -> Result<f64, DiagramError> {
        self.check_path(path)?;
        self.utility_of(path).ok_or(DiagramError::PathUtilityUnset)
    }

    /// Path utility including the translation applied by `generate`.
    pub fn path_utility(&self, path: &[State]) -> Result<f64, DiagramError> {
        Ok(self.raw_path_utility(path)? + self.translation)
    }

    /// Probability of a path known to be in range.
    pub(crate) fn probability_of(&self, path: &[State]) -> f64 {
        self.chance
            .iter()
            .map(|&j| match &self.tensors[j] {
                Some(table) => table.at(
                    self.information_sets[j]
                        .iter()
                        .map(|&p| path[p])
                        .chain(std::iter::once(path[j])),
                ),
                None => 0.0,
            })
            .product()
    }

    /// Untranslated utility of a path known to be in range.
    pub(crate) fn utility_of(&self, path: &[State]) -> Option<f64> {
        match self.path_utility.as_ref()? {
            PathUtility::Additive => Some(
                self.value
                    .iter()
                    .filter_map(|&v| {
                        self.tensors[v]
                            .as_ref()
                            .map(|t| t.at(self.information_sets[v].iter().map(|&p| path[p])))
                    })
                    .sum(),
            ),
            PathUtility::Custom(f) => Some(f(path)),
        }
    }
}
