//! Error types for diagram assembly and model building.

use thiserror::Error;

use crate::diagram::NodeKind;

/// Errors raised while assembling, generating or evaluating a diagram.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagramError {
    #[error("duplicate node name: {name}")]
    DuplicateNode { name: String },

    #[error("invalid node {name}: {reason}")]
    InvalidNode { name: String, reason: String },

    #[error("unknown node: {name}")]
    UnknownNode { name: String },

    #[error("unknown state {state} for node {node}")]
    UnknownState { node: String, state: String },

    #[error("information sets form a cycle through: {}", nodes.join(", "))]
    CyclicGraph { nodes: Vec<String> },

    #[error("node {node} is a {actual} node, expected a {expected} node")]
    WrongNodeKind {
        node: String,
        expected: NodeKind,
        actual: NodeKind,
    },

    #[error("dimension mismatch for {node}: expected shape {expected:?}, got {actual:?}")]
    DimensionMismatch {
        node: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("tensor data has {actual} values, shape requires {expected}")]
    TensorSize { expected: usize, actual: usize },

    #[error("probabilities of {node} sum to {sum} at {index:?}, expected 1")]
    UnnormalizedProbability {
        node: String,
        index: Vec<usize>,
        sum: f64,
    },

    #[error("invalid probability {value} for {node}: must be finite and non-negative")]
    NegativeProbability { node: String, value: f64 },

    #[error("non-finite utility for {node}: every entry must be set")]
    NonFiniteUtility { node: String },

    #[error("index {index:?} out of range for shape {shape:?}")]
    IndexOutOfRange { index: Vec<usize>, shape: Vec<usize> },

    #[error("no probabilities set for chance node {node}")]
    MissingProbabilities { node: String },

    #[error("path utility has not been set")]
    PathUtilityUnset,

    #[error("arcs have not been generated")]
    NotAssembled,

    #[error("arcs have already been generated")]
    AlreadyAssembled,

    #[error("diagram has not been generated")]
    NotGenerated,

    #[error("diagram has already been generated")]
    AlreadyGenerated,

    #[error("invalid fixed path: {0}")]
    InvalidFixedPath(String),

    #[error("invalid forbidden path: {0}")]
    InvalidForbiddenPath(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl DiagramError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            DiagramError::DuplicateNode { .. } => 100,
            DiagramError::InvalidNode { .. } => 101,
            DiagramError::UnknownNode { .. } => 102,
            DiagramError::UnknownState { .. } => 103,
            DiagramError::CyclicGraph { .. } => 104,
            DiagramError::WrongNodeKind { .. } => 105,
            DiagramError::DimensionMismatch { .. } => 110,
            DiagramError::TensorSize { .. } => 111,
            DiagramError::UnnormalizedProbability { .. } => 112,
            DiagramError::NegativeProbability { .. } => 113,
            DiagramError::NonFiniteUtility { .. } => 114,
            DiagramError::IndexOutOfRange { .. } => 115,
            DiagramError::MissingProbabilities { .. } => 120,
            DiagramError::PathUtilityUnset => 121,
            DiagramError::NotAssembled => 122,
            DiagramError::AlreadyAssembled => 123,
            DiagramError::NotGenerated => 124,
            DiagramError::AlreadyGenerated => 125,
            DiagramError::InvalidFixedPath(_) => 130,
            DiagramError::InvalidForbiddenPath(_) => 131,
            DiagramError::InvalidOption(_) => 132,
        }
    }
}

/// Errors raised while building a model or reading results back from it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("decision {node} at information state {information_state:?} has {active} active states, expected exactly 1")]
    InfeasibleStrategy {
        node: String,
        information_state: Vec<usize>,
        active: usize,
    },

    #[error("invalid alpha: must be in {range}, got {alpha}")]
    InvalidAlpha { alpha: f64, range: &'static str },

    #[error("utility distribution is empty")]
    EmptyDistribution,

    #[error("unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("solution has {actual} values, model has {expected} variables")]
    SolutionSize { expected: usize, actual: usize },

    #[error("solution parse error at line {line}: {message}")]
    SolutionParse { line: usize, message: String },

    #[error("variable name already in use: {name}")]
    DuplicateVariable { name: String },

    #[error(transparent)]
    Diagram(#[from] DiagramError),
}

impl ModelError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ModelError::InfeasibleStrategy { .. } => 200,
            ModelError::InvalidAlpha { .. } => 201,
            ModelError::EmptyDistribution => 202,
            ModelError::UnknownVariable { .. } => 210,
            ModelError::SolutionSize { .. } => 211,
            ModelError::SolutionParse { .. } => 212,
            ModelError::DuplicateVariable { .. } => 213,
            ModelError::Diagram(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            DiagramError::DuplicateNode { name: "A".into() }.code(),
            DiagramError::CyclicGraph { nodes: vec![] }.code(),
            DiagramError::PathUtilityUnset.code(),
            DiagramError::InvalidOption(String::new()).code(),
            ModelError::EmptyDistribution.code(),
        ];
        let mut sorted = errors.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), errors.len());
    }

    #[test]
    fn test_cycle_message_lists_nodes() {
        let err = DiagramError::CyclicGraph {
            nodes: vec!["A".into(), "B".into()],
        };
        assert_eq!(err.to_string(), "information sets form a cycle through: A, B");
    }

    #[test]
    fn test_model_error_wraps_diagram_code() {
        let err: ModelError = DiagramError::NotGenerated.into();
        assert_eq!(err.code(), 124);
        assert_eq!(err.to_string(), "diagram has not been generated");
    }
}
