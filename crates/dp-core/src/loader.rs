//! Build diagrams and model options from definition files.
//!
//! `dp-config` checks names and option ranges; everything that depends on
//! the assembled graph (tensor shapes, normalization, state references) is
//! checked here while the diagram is built.

use dp_config::{DiagramFile, NodeKindSpec, TensorValue};
use tracing::debug;

use crate::decision::PathCompatibilityOptions;
use crate::diagram::{GenerateOptions, InfluenceDiagram, Node, NodeKind, StateRef, Tensor};
use crate::error::DiagramError;
use crate::paths::{FixedPath, ForbiddenPath};

impl From<NodeKindSpec> for NodeKind {
    fn from(kind: NodeKindSpec) -> Self {
        match kind {
            NodeKindSpec::Chance => NodeKind::Chance,
            NodeKindSpec::Decision => NodeKind::Decision,
            NodeKindSpec::Value => NodeKind::Value,
        }
    }
}

/// Assemble, fill in and generate the diagram a file describes.
///
/// Probability tables are checked for normalization unless the file turns
/// `generate.strict_probabilities` off.
pub fn build_diagram(file: &DiagramFile) -> Result<InfluenceDiagram, DiagramError> {
    let mut diagram = assemble(file)?;
    diagram.generate(GenerateOptions::from(&file.generate))?;
    Ok(diagram)
}

/// Assemble the diagram and attach its tables without generating it.
pub fn assemble(file: &DiagramFile) -> Result<InfluenceDiagram, DiagramError> {
    let mut diagram =
        InfluenceDiagram::new().with_strict_probabilities(file.generate.strict_probabilities);
    for node in &file.nodes {
        let information_set: Vec<&str> = node.information_set.iter().map(String::as_str).collect();
        let states: Vec<&str> = node.states.iter().map(String::as_str).collect();
        diagram.add_node(Node::new(&node.name, node.kind.into(), &information_set, &states))?;
    }
    diagram.generate_arcs()?;

    for (name, value) in &file.probabilities {
        let tensor = to_tensor(&diagram, name, value)?;
        diagram.set_probabilities(name, tensor)?;
    }
    for (name, value) in &file.utilities {
        let tensor = to_tensor(&diagram, name, value)?;
        diagram.set_utility(name, tensor)?;
    }
    debug!(
        nodes = diagram.nodes().len(),
        probability_tables = file.probabilities.len(),
        utility_tables = file.utilities.len(),
        "diagram assembled"
    );
    Ok(diagram)
}

fn to_tensor(diagram: &InfluenceDiagram, name: &str, value: &TensorValue) -> Result<Tensor, DiagramError> {
    let index = diagram.index_of(name)?;
    let (shape, data) = value.flatten().map_err(|_| DiagramError::DimensionMismatch {
        node: name.to_string(),
        expected: diagram.expected_shape(index),
        actual: Vec::new(),
    })?;
    Tensor::new(shape, data)
}

/// Path-compatibility options from the file's `model` section.
pub fn compatibility_options(
    file: &DiagramFile,
    diagram: &InfluenceDiagram,
) -> Result<PathCompatibilityOptions, DiagramError> {
    let opts = &file.model;
    let mut forbidden_paths = Vec::with_capacity(opts.forbidden_paths.len());
    for forbidden in &opts.forbidden_paths {
        let nodes: Vec<&str> = forbidden.nodes.iter().map(String::as_str).collect();
        let combinations = forbidden
            .states
            .iter()
            .map(|combination| combination.iter().map(StateRef::from));
        forbidden_paths.push(ForbiddenPath::from_names(diagram, &nodes, combinations)?);
    }
    let fixed = FixedPath::from_names(
        diagram,
        opts.fixed
            .iter()
            .map(|(name, state)| (name.as_str(), StateRef::from(state))),
    )?;

    Ok(PathCompatibilityOptions {
        names: opts.names,
        forbidden_paths,
        fixed,
        probability_cut: opts.probability_cut && !opts.lazy_probability_cut,
        probability_scale_factor: opts.probability_scale_factor,
        lower_bound: opts.lower_bound,
    })
}
