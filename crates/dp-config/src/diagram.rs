//! Influence diagram definition files.
//!
//! A definition file declares the nodes of a diagram, the probability and
//! utility tensors attached to them, how the diagram is generated, and the
//! options used when the decision model is built. JSON and TOML encodings
//! share the same structure.

use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, ValidationResult};

/// Complete diagram definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramFile {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Nodes in declaration order.
    pub nodes: Vec<NodeSpec>,

    /// Probability tensors keyed by chance node name.
    #[serde(default)]
    pub probabilities: BTreeMap<String, TensorValue>,

    /// Utility tensors keyed by value node name.
    #[serde(default)]
    pub utilities: BTreeMap<String, TensorValue>,

    #[serde(default)]
    pub generate: GenerateSpec,

    #[serde(default)]
    pub model: ModelSpec,
}

/// Node kind as written in definition files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindSpec {
    Chance,
    Decision,
    Value,
}

/// A single node declaration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NodeSpec {
    pub name: String,
    pub kind: NodeKindSpec,

    /// Names of the nodes this node observes (or depends on).
    #[serde(default)]
    pub information_set: Vec<String>,

    /// State names; empty for value nodes.
    #[serde(default)]
    pub states: Vec<String>,
}

/// Dense nested numeric array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TensorValue {
    Scalar(f64),
    Array(Vec<TensorValue>),
}

impl TensorValue {
    /// Flatten into `(shape, row-major data)`.
    ///
    /// Fails when sibling sub-arrays have different shapes.
    pub fn flatten(&self) -> Result<(Vec<usize>, Vec<f64>), String> {
        let mut data = Vec::new();
        let shape = flatten_into(self, &mut data, 0)?;
        Ok((shape, data))
    }
}

fn flatten_into(value: &TensorValue, data: &mut Vec<f64>, depth: usize) -> Result<Vec<usize>, String> {
    match value {
        TensorValue::Scalar(x) => {
            data.push(*x);
            Ok(Vec::new())
        }
        TensorValue::Array(items) => {
            let mut inner: Option<Vec<usize>> = None;
            for (i, item) in items.iter().enumerate() {
                let shape = flatten_into(item, data, depth + 1)?;
                match &inner {
                    None => inner = Some(shape),
                    Some(expected) if *expected != shape => {
                        return Err(format!(
                            "ragged array at depth {depth}: element {i} has shape {shape:?}, expected {expected:?}"
                        ));
                    }
                    Some(_) => {}
                }
            }
            let mut shape = vec![items.len()];
            shape.extend(inner.unwrap_or_default());
            Ok(shape)
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}

/// Options for filling in unset tensors and translating path utilities.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateSpec {
    /// Use a uniform distribution for chance nodes without a tensor.
    #[serde(default = "default_true")]
    pub default_probability: bool,

    /// Use zero utilities for value nodes without a tensor.
    #[serde(default = "default_true")]
    pub default_utility: bool,

    /// Translate path utilities so that every one is at least 1.
    #[serde(default)]
    pub positive_path_utility: bool,

    /// Translate path utilities so that every one is at most -1.
    #[serde(default)]
    pub negative_path_utility: bool,

    /// Require every row of a probability table to sum to 1.
    #[serde(default = "default_true")]
    pub strict_probabilities: bool,
}

impl Default for GenerateSpec {
    fn default() -> Self {
        Self {
            default_probability: true,
            default_utility: true,
            positive_path_utility: false,
            negative_path_utility: false,
            strict_probabilities: true,
        }
    }
}

/// A state reference by name or by 0-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StateRefSpec {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for StateRefSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateRefSpec::Index(i) => write!(f, "#{i}"),
            StateRefSpec::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Forbidden combinations of states over a subset of nodes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForbiddenPathSpec {
    pub nodes: Vec<String>,
    /// Each entry lists one state per node in `nodes`.
    pub states: Vec<Vec<StateRefSpec>>,
}

/// Objective kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    #[default]
    ExpectedValue,
    ConditionalValueAtRisk,
}

/// Objective selection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObjectiveSpec {
    #[serde(default)]
    pub kind: ObjectiveKind,

    /// Maximize (default) or minimize the objective.
    #[serde(default = "default_true")]
    pub maximize: bool,

    /// Probability level for the CVaR objective.
    #[serde(default)]
    pub alpha: Option<f64>,
}

impl Default for ObjectiveSpec {
    fn default() -> Self {
        Self {
            kind: ObjectiveKind::ExpectedValue,
            maximize: true,
            alpha: None,
        }
    }
}

/// Options used when the decision model is built.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelSpec {
    /// Give variables readable names (useful for LP export).
    #[serde(default = "default_true")]
    pub names: bool,

    /// Add the probability cut over path-compatibility variables.
    #[serde(default = "default_true")]
    pub probability_cut: bool,

    /// Emit the probability cut as a lazy constraint instead.
    #[serde(default)]
    pub lazy_probability_cut: bool,

    #[serde(default = "default_scale")]
    pub probability_scale_factor: f64,

    /// Add the linking lower bound `x >= sum(z) - (|D| - 1)`. When unset
    /// it is added unless path utilities have a guaranteed sign.
    #[serde(default)]
    pub lower_bound: Option<bool>,

    #[serde(default)]
    pub forbidden_paths: Vec<ForbiddenPathSpec>,

    /// Chance or decision node name to forced state.
    #[serde(default)]
    pub fixed: BTreeMap<String, StateRefSpec>,

    #[serde(default)]
    pub objective: ObjectiveSpec,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            names: true,
            probability_cut: true,
            lazy_probability_cut: false,
            probability_scale_factor: 1.0,
            lower_bound: None,
            forbidden_paths: Vec::new(),
            fixed: BTreeMap::new(),
            objective: ObjectiveSpec::default(),
        }
    }
}

impl DiagramFile {
    /// Parse from JSON text.
    pub fn from_json_str(text: &str) -> ValidationResult<Self> {
        serde_json::from_str(text).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> ValidationResult<Self> {
        toml::from_str(text).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Look up a node declaration by name.
    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Number of chance and decision paths, or `None` on overflow.
    pub fn path_count(&self) -> Option<u128> {
        self.nodes
            .iter()
            .filter(|n| n.kind != NodeKindSpec::Value)
            .try_fold(1u128, |acc, n| acc.checked_mul(n.states.len() as u128))
    }
}

/// Load a diagram file, choosing the format from the extension.
///
/// `.toml` files are parsed as TOML; everything else as JSON.
pub fn load_diagram_file(path: &Path) -> ValidationResult<DiagramFile> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    if is_toml {
        DiagramFile::from_toml_str(&text)
    } else {
        DiagramFile::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "schema_version": "1.0.0",
        "nodes": [
            {"name": "D", "kind": "decision", "states": ["a", "b"]},
            {"name": "O", "kind": "chance", "states": ["x", "y"]},
            {"name": "V", "kind": "value", "information_set": ["D", "O"]}
        ],
        "probabilities": {"O": [0.5, 0.5]},
        "utilities": {"V": [[1, 0], [0, 1]]}
    }"#;

    #[test]
    fn test_parse_minimal_json() {
        let file = DiagramFile::from_json_str(MINIMAL).unwrap();
        assert_eq!(file.nodes.len(), 3);
        assert_eq!(file.nodes[2].kind, NodeKindSpec::Value);
        assert!(file.generate.default_probability);
        assert!(file.model.probability_cut);
        assert_eq!(file.model.probability_scale_factor, 1.0);
        assert_eq!(file.model.objective.kind, ObjectiveKind::ExpectedValue);
        assert!(file.model.objective.maximize);
        assert_eq!(file.path_count(), Some(4));
    }

    #[test]
    fn test_strict_probabilities_toggle() {
        let file = DiagramFile::from_json_str(MINIMAL).unwrap();
        assert!(file.generate.strict_probabilities);

        let lax = MINIMAL.replacen(
            r#""probabilities""#,
            r#""generate": {"strict_probabilities": false}, "probabilities""#,
            1,
        );
        let file = DiagramFile::from_json_str(&lax).unwrap();
        assert!(!file.generate.strict_probabilities);
        assert!(file.generate.default_utility);
    }

    #[test]
    fn test_flatten_matrix() {
        let file = DiagramFile::from_json_str(MINIMAL).unwrap();
        let (shape, data) = file.utilities["V"].flatten().unwrap();
        assert_eq!(shape, vec![2, 2]);
        assert_eq!(data, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_flatten_ragged_fails() {
        let value: TensorValue = serde_json::from_str("[[1, 2], [3]]").unwrap();
        let err = value.flatten().unwrap_err();
        assert!(err.contains("ragged"), "unexpected message: {err}");
    }

    #[test]
    fn test_flatten_scalar() {
        let (shape, data) = TensorValue::Scalar(2.5).flatten().unwrap();
        assert!(shape.is_empty());
        assert_eq!(data, vec![2.5]);
    }

    #[test]
    fn test_state_ref_untagged() {
        let refs: Vec<StateRefSpec> = serde_json::from_str(r#"[1, "peach"]"#).unwrap();
        assert_eq!(refs[0], StateRefSpec::Index(1));
        assert_eq!(refs[1], StateRefSpec::Name("peach".to_string()));
        assert_eq!(refs[0].to_string(), "#1");
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
schema_version = "1.0.0"

[[nodes]]
name = "O"
kind = "chance"
states = ["lemon", "peach"]

[[nodes]]
name = "V"
kind = "value"
information_set = ["O"]

[probabilities]
O = [0.2, 0.8]

[utilities]
V = [-10, 10]

[model.objective]
kind = "conditional_value_at_risk"
alpha = 0.2
"#;
        let file = DiagramFile::from_toml_str(text).unwrap();
        assert_eq!(file.nodes.len(), 2);
        let (shape, data) = file.utilities["V"].flatten().unwrap();
        assert_eq!(shape, vec![2]);
        assert_eq!(data, vec![-10.0, 10.0]);
        assert_eq!(
            file.model.objective.kind,
            ObjectiveKind::ConditionalValueAtRisk
        );
        assert_eq!(file.model.objective.alpha, Some(0.2));
    }

    #[test]
    fn test_parse_error_reported() {
        let err = DiagramFile::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code(), 61);
    }
}
