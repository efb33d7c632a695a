//! Node definitions.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::DiagramError;

/// A 0-based state index.
pub type State = usize;

/// Node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Uncertain event with a conditional probability table.
    Chance,
    /// Choice made by the decision maker.
    Decision,
    /// Consequence with a utility table; has no states.
    Value,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeKind::Chance => "chance",
            NodeKind::Decision => "decision",
            NodeKind::Value => "value",
        };
        write!(f, "{}", s)
    }
}

/// A node of an influence diagram before assembly.
///
/// The information set lists the names of the nodes this node depends on
/// (chance and value nodes) or observes (decision nodes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    kind: NodeKind,
    information_set: Vec<String>,
    states: Vec<String>,
}

impl Node {
    pub fn chance(name: &str, information_set: &[&str], states: &[&str]) -> Self {
        Self::new(name, NodeKind::Chance, information_set, states)
    }

    pub fn decision(name: &str, information_set: &[&str], states: &[&str]) -> Self {
        Self::new(name, NodeKind::Decision, information_set, states)
    }

    pub fn value(name: &str, information_set: &[&str]) -> Self {
        Self::new(name, NodeKind::Value, information_set, &[])
    }

    pub fn new(name: &str, kind: NodeKind, information_set: &[&str], states: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            information_set: information_set.iter().map(|s| s.to_string()).collect(),
            states: states.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn information_set(&self) -> &[String] {
        &self.information_set
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Resolve a state reference against this node's states.
    pub fn state(&self, state: &StateRef) -> Result<State, DiagramError> {
        match state {
            StateRef::Index(i) if *i < self.states.len() => Ok(*i),
            StateRef::Name(name) => {
                self.states
                    .iter()
                    .position(|s| s == name)
                    .ok_or_else(|| DiagramError::UnknownState {
                        node: self.name.clone(),
                        state: name.clone(),
                    })
            }
            StateRef::Index(i) => Err(DiagramError::UnknownState {
                node: self.name.clone(),
                state: format!("#{i}"),
            }),
        }
    }

    /// Structural checks that do not depend on other nodes.
    pub(crate) fn validate(&self) -> Result<(), DiagramError> {
        let invalid = |reason: &str| DiagramError::InvalidNode {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name must be non-empty"));
        }
        match self.kind {
            NodeKind::Value if !self.states.is_empty() => {
                return Err(invalid("value nodes have no states"))
            }
            NodeKind::Chance | NodeKind::Decision if self.states.is_empty() => {
                return Err(invalid("at least one state is required"))
            }
            _ => {}
        }
        let unique: BTreeSet<&String> = self.states.iter().collect();
        if unique.len() != self.states.len() {
            return Err(invalid("state names must be unique"));
        }
        let parents: BTreeSet<&String> = self.information_set.iter().collect();
        if parents.len() != self.information_set.len() {
            return Err(invalid("information set lists a node twice"));
        }
        if parents.contains(&self.name) {
            return Err(invalid("information set contains the node itself"));
        }
        Ok(())
    }
}

/// Reference to a state by name or by index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateRef {
    Index(State),
    Name(String),
}

impl From<State> for StateRef {
    fn from(value: State) -> Self {
        StateRef::Index(value)
    }
}

impl From<&str> for StateRef {
    fn from(value: &str) -> Self {
        StateRef::Name(value.to_string())
    }
}

impl From<String> for StateRef {
    fn from(value: String) -> Self {
        StateRef::Name(value)
    }
}

impl From<&dp_config::StateRefSpec> for StateRef {
    fn from(value: &dp_config::StateRefSpec) -> Self {
        match value {
            dp_config::StateRefSpec::Index(i) => StateRef::Index(*i),
            dp_config::StateRefSpec::Name(s) => StateRef::Name(s.clone()),
        }
    }
}

impl std::fmt::Display for StateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateRef::Index(i) => write!(f, "#{}", i),
            StateRef::Name(s) => write!(f, "{}", s),
        }
    }
}
