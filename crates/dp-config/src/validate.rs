//! Configuration validation errors and semantic validation.
//!
//! These checks cover what can be decided from the file alone (names,
//! references, option ranges). Tensor shapes depend on the assembled graph
//! and are checked when the diagram is built.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::diagram::{DiagramFile, NodeKindSpec, ObjectiveKind, StateRefSpec};
use crate::settings::Settings;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Unknown node referenced by {field}: {name}")]
    UnknownNode { field: String, name: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::UnknownNode { .. } => 64,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

fn check_version(actual: &str) -> ValidationResult<()> {
    if actual != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Validate a diagram file semantically.
pub fn validate_diagram_file(file: &DiagramFile) -> ValidationResult<()> {
    check_version(&file.schema_version)?;

    if file.nodes.is_empty() {
        return Err(ValidationError::SemanticError(
            "diagram declares no nodes".to_string(),
        ));
    }

    let mut kinds: HashMap<&str, NodeKindSpec> = HashMap::new();
    for node in &file.nodes {
        if node.name.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "nodes.name".to_string(),
                message: "node names must be non-empty".to_string(),
            });
        }
        if kinds.insert(node.name.as_str(), node.kind).is_some() {
            return Err(ValidationError::SemanticError(format!(
                "duplicate node name '{}'",
                node.name
            )));
        }
    }

    for node in &file.nodes {
        validate_node_states(&node.name, node.kind, &node.states)?;

        let mut seen = BTreeSet::new();
        for parent in &node.information_set {
            let field = format!("nodes.{}.information_set", node.name);
            match kinds.get(parent.as_str()) {
                None => {
                    return Err(ValidationError::UnknownNode {
                        field,
                        name: parent.clone(),
                    })
                }
                Some(NodeKindSpec::Value) => {
                    return Err(ValidationError::InvalidValue {
                        field,
                        message: format!("value node '{parent}' cannot be observed"),
                    })
                }
                Some(_) => {}
            }
            if parent == &node.name || !seen.insert(parent.as_str()) {
                return Err(ValidationError::InvalidValue {
                    field,
                    message: format!("'{parent}' listed twice or refers to the node itself"),
                });
            }
        }
    }

    for name in file.probabilities.keys() {
        expect_kind(&kinds, "probabilities", name, NodeKindSpec::Chance)?;
    }
    for name in file.utilities.keys() {
        expect_kind(&kinds, "utilities", name, NodeKindSpec::Value)?;
    }

    if file.generate.positive_path_utility && file.generate.negative_path_utility {
        return Err(ValidationError::InvalidValue {
            field: "generate".to_string(),
            message: "positive_path_utility and negative_path_utility are exclusive".to_string(),
        });
    }

    let model = &file.model;
    if !(model.probability_scale_factor.is_finite() && model.probability_scale_factor > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "model.probability_scale_factor".to_string(),
            message: format!("Must be positive, got {}", model.probability_scale_factor),
        });
    }

    for (i, forbidden) in model.forbidden_paths.iter().enumerate() {
        let field = format!("model.forbidden_paths[{i}]");
        for name in &forbidden.nodes {
            let kind = kinds.get(name.as_str()).copied();
            if kind.is_none() || kind == Some(NodeKindSpec::Value) {
                return Err(ValidationError::UnknownNode {
                    field: field.clone(),
                    name: name.clone(),
                });
            }
        }
        for states in &forbidden.states {
            if states.len() != forbidden.nodes.len() {
                return Err(ValidationError::InvalidValue {
                    field: field.clone(),
                    message: format!(
                        "state tuple has {} entries for {} nodes",
                        states.len(),
                        forbidden.nodes.len()
                    ),
                });
            }
            for (node, state) in forbidden.nodes.iter().zip(states) {
                check_state_ref(file, &field, node, state)?;
            }
        }
    }

    for (name, state) in &model.fixed {
        let kind = kinds.get(name.as_str()).copied();
        if kind.is_none() || kind == Some(NodeKindSpec::Value) {
            return Err(ValidationError::UnknownNode {
                field: "model.fixed".to_string(),
                name: name.clone(),
            });
        }
        check_state_ref(file, "model.fixed", name, state)?;
    }

    if model.objective.kind == ObjectiveKind::ConditionalValueAtRisk {
        match model.objective.alpha {
            Some(alpha) if alpha > 0.0 && alpha <= 1.0 => {}
            other => {
                return Err(ValidationError::InvalidValue {
                    field: "model.objective.alpha".to_string(),
                    message: format!("Must be in (0, 1], got {other:?}"),
                })
            }
        }
    }

    Ok(())
}

fn validate_node_states(name: &str, kind: NodeKindSpec, states: &[String]) -> ValidationResult<()> {
    let field = format!("nodes.{name}.states");
    match kind {
        NodeKindSpec::Value if !states.is_empty() => Err(ValidationError::InvalidValue {
            field,
            message: "value nodes have no states".to_string(),
        }),
        NodeKindSpec::Value => Ok(()),
        _ if states.is_empty() => Err(ValidationError::InvalidValue {
            field,
            message: "at least one state is required".to_string(),
        }),
        _ => {
            let unique: BTreeSet<&str> = states.iter().map(String::as_str).collect();
            if unique.len() != states.len() {
                return Err(ValidationError::InvalidValue {
                    field,
                    message: "state names must be unique".to_string(),
                });
            }
            Ok(())
        }
    }
}

fn expect_kind(
    kinds: &HashMap<&str, NodeKindSpec>,
    field: &str,
    name: &str,
    expected: NodeKindSpec,
) -> ValidationResult<()> {
    match kinds.get(name) {
        None => Err(ValidationError::UnknownNode {
            field: field.to_string(),
            name: name.to_string(),
        }),
        Some(kind) if *kind != expected => Err(ValidationError::InvalidValue {
            field: format!("{field}.{name}"),
            message: format!("expected a {expected:?} node, found {kind:?}"),
        }),
        Some(_) => Ok(()),
    }
}

fn check_state_ref(
    file: &DiagramFile,
    field: &str,
    node: &str,
    state: &StateRefSpec,
) -> ValidationResult<()> {
    let Some(spec) = file.node(node) else {
        return Err(ValidationError::UnknownNode {
            field: field.to_string(),
            name: node.to_string(),
        });
    };
    let ok = match state {
        StateRefSpec::Index(i) => *i < spec.states.len(),
        StateRefSpec::Name(s) => spec.states.iter().any(|x| x == s),
    };
    if !ok {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("node '{node}' has no state {state}"),
        });
    }
    Ok(())
}

/// Validate settings semantically.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    check_version(&settings.schema_version)?;

    if settings.solver.max_assignments == 0 {
        return Err(ValidationError::InvalidValue {
            field: "solver.max_assignments".to_string(),
            message: "Must be positive".to_string(),
        });
    }
    if !(settings.solver.tolerance.is_finite() && settings.solver.tolerance >= 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "solver.tolerance".to_string(),
            message: format!("Must be non-negative, got {}", settings.solver.tolerance),
        });
    }
    for level in &settings.analysis.risk_levels {
        if !(0.0..=1.0).contains(level) {
            return Err(ValidationError::InvalidValue {
                field: "analysis.risk_levels".to_string(),
                message: format!("Must be in [0, 1], got {level}"),
            });
        }
    }
    Ok(())
}
