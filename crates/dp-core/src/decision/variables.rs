//! Binary decision variables and strategy extraction.

use tracing::debug;

use super::strategy::{DecisionStrategy, LocalDecisionStrategy};
use crate::diagram::{InfluenceDiagram, State};
use crate::error::{DiagramError, ModelError};
use crate::model::{LinearExpr, Model, Sense, Solution, VarId};
use crate::paths::Paths;

/// Threshold above which a binary counts as active in a solution.
pub const ACTIVE_THRESHOLD: f64 = 0.5;

/// Replace characters that are not valid in LP identifiers.
pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Binaries `z[d, I(d), s]` of one decision node, row-major over
/// `(information state..., own state)`.
#[derive(Debug, Clone)]
pub struct LocalDecisionVariables {
    node: usize,
    name: String,
    information_set: Vec<usize>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    states: usize,
    vars: Vec<VarId>,
}

impl LocalDecisionVariables {
    pub fn node(&self) -> usize {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }

    fn group_offset<I: IntoIterator<Item = usize>>(&self, information_state: I) -> usize {
        information_state
            .into_iter()
            .zip(&self.strides)
            .map(|(s, k)| s * k)
            .sum::<usize>()
            * self.states
    }

    /// The one-hot group of an information state.
    pub fn group(&self, information_state: &[State]) -> &[VarId] {
        let start = self.group_offset(information_state.iter().copied());
        &self.vars[start..start + self.states]
    }

    /// Variable selected by a path: its information state and own state.
    pub fn variable(&self, path: &[State]) -> VarId {
        let start = self.group_offset(self.information_set.iter().map(|&p| path[p]));
        self.vars[start + path[self.node]]
    }
}

/// Decision variables of every decision node.
#[derive(Debug, Clone)]
pub struct DecisionVariables {
    locals: Vec<LocalDecisionVariables>,
}

impl DecisionVariables {
    /// Create one binary per (decision node, information state, state) and
    /// a `Σ z = 1` constraint per information state.
    ///
    /// Names are `z<index>_<label>_<information state...>_<state>`. The node
    /// index keeps them unique when sanitized labels coincide.
    pub fn new(model: &mut Model, diagram: &InfluenceDiagram, names: bool) -> Result<Self, ModelError> {
        if !diagram.is_generated() {
            return Err(DiagramError::NotGenerated.into());
        }
        let mut locals = Vec::with_capacity(diagram.decision_nodes().len());
        for &d in diagram.decision_nodes() {
            let node = &diagram.nodes()[d];
            let information_set = diagram.information_set(d).to_vec();
            let shape: Vec<usize> = information_set
                .iter()
                .map(|&p| diagram.states()[p])
                .collect();
            let states = diagram.states()[d];
            let label = sanitize(node.name());

            let mut vars = Vec::new();
            for information_state in Paths::new(&shape) {
                let group = (0..states)
                    .map(|s| {
                        let name = names.then(|| {
                            let mut parts = vec![format!("z{d}_{label}")];
                            parts.extend(information_state.iter().map(|i| i.to_string()));
                            parts.push(s.to_string());
                            parts.join("_")
                        });
                        model.add_binary(name)
                    })
                    .collect::<Result<Vec<VarId>, _>>()?;
                let one_hot: LinearExpr = group.iter().map(|&v| LinearExpr::from(v)).sum();
                model.add_constraint(one_hot, Sense::Eq, 1.0);
                vars.extend(group);
            }

            let mut strides = vec![1; shape.len()];
            for i in (0..shape.len().saturating_sub(1)).rev() {
                strides[i] = strides[i + 1] * shape[i + 1];
            }
            debug!(node = node.name(), variables = vars.len(), "decision variables");
            locals.push(LocalDecisionVariables {
                node: d,
                name: node.name().to_string(),
                information_set,
                shape,
                strides,
                states,
                vars,
            });
        }
        Ok(Self { locals })
    }

    pub fn locals(&self) -> &[LocalDecisionVariables] {
        &self.locals
    }

    pub fn local(&self, node: usize) -> Option<&LocalDecisionVariables> {
        self.locals.iter().find(|l| l.node == node)
    }

    /// Variable of decision node `node` selected by a full path.
    pub fn variable(&self, node: usize, path: &[State]) -> Option<VarId> {
        self.local(node).map(|l| l.variable(path))
    }

    /// Total number of binaries.
    pub fn len(&self) -> usize {
        self.locals.iter().map(|l| l.vars.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the chosen state of every information state from a solution.
    pub fn decision_strategy(&self, solution: &Solution) -> Result<DecisionStrategy, ModelError> {
        let mut locals = Vec::with_capacity(self.locals.len());
        for local in &self.locals {
            let mut choices = Vec::new();
            for information_state in Paths::new(&local.shape) {
                let group = local.group(&information_state);
                let active: Vec<State> = group
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| solution.value(**v) >= ACTIVE_THRESHOLD)
                    .map(|(s, _)| s)
                    .collect();
                if active.len() != 1 {
                    return Err(ModelError::InfeasibleStrategy {
                        node: local.name.clone(),
                        information_state,
                        active: active.len(),
                    });
                }
                choices.push(active[0]);
            }
            locals.push(LocalDecisionStrategy::from_parts(
                local.node,
                local.name.clone(),
                local.information_set.clone(),
                local.shape.clone(),
                choices,
            ));
        }
        Ok(DecisionStrategy::new(locals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{GenerateOptions, Node};
    use crate::test_utils::used_car;

    #[test]
    fn test_variable_counts() {
        let d = used_car();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, true).unwrap();
        // T: 1 group of 2; A: 3 groups of 3
        assert_eq!(z.len(), 2 + 9);
        assert_eq!(model.constraints().len(), 4);
        assert_eq!(model.num_binaries(), 11);
        assert!(model.find("z1_T_1").is_some());
        assert!(model.find("z3_A_2_1").is_some());
    }

    #[test]
    fn test_variable_for_path() {
        let d = used_car();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, true).unwrap();
        let var = z.variable(3, &[0, 1, 2, 1]).unwrap();
        assert_eq!(model.export_name(var), "z3_A_2_1");
        assert!(z.variable(0, &[0, 0, 0, 0]).is_none());
    }

    #[test]
    fn test_requires_generated_diagram() {
        let mut d = InfluenceDiagram::new();
        d.add_node(crate::diagram::Node::decision("D", &[], &["a"])).unwrap();
        d.generate_arcs().unwrap();
        let mut model = Model::new();
        assert!(matches!(
            DecisionVariables::new(&mut model, &d, false),
            Err(ModelError::Diagram(DiagramError::NotGenerated))
        ));
    }

    #[test]
    fn test_strategy_extraction() {
        let d = used_car();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, false).unwrap();
        let mut values = vec![0.0; model.num_variables()];
        values[z.local(1).unwrap().group(&[])[1].index()] = 1.0;
        for (r, a) in [(0, 2), (1, 1), (2, 0)] {
            values[z.local(3).unwrap().group(&[r])[a].index()] = 1.0;
        }
        let solution = Solution::from_values(&model, values).unwrap();
        let strategy = z.decision_strategy(&solution).unwrap();
        assert_eq!(strategy.choice(1, &[]), Some(1));
        assert_eq!(strategy.choice(3, &[1]), Some(1));
        assert_eq!(strategy.choice(3, &[2]), Some(0));
    }

    #[test]
    fn test_strategy_extraction_rejects_double_choice() {
        let d = used_car();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, false).unwrap();
        let mut values = vec![0.0; model.num_variables()];
        for &v in z.local(1).unwrap().group(&[]) {
            values[v.index()] = 1.0;
        }
        let solution = Solution::from_values(&model, values).unwrap();
        let err = z.decision_strategy(&solution).unwrap_err();
        assert_eq!(
            err,
            ModelError::InfeasibleStrategy {
                node: "T".into(),
                information_state: vec![],
                active: 2
            }
        );
    }

    #[test]
    fn test_strategy_extraction_rejects_missing_choice() {
        let d = used_car();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, false).unwrap();
        let mut values = vec![0.0; model.num_variables()];
        values[z.local(1).unwrap().group(&[])[0].index()] = 1.0;
        for &v in z.local(3).unwrap().group(&[1]) {
            values[v.index()] = 0.4;
        }
        let solution = Solution::from_values(&model, values).unwrap();
        let err = z.decision_strategy(&solution).unwrap_err();
        assert_eq!(
            err,
            ModelError::InfeasibleStrategy {
                node: "A".into(),
                information_state: vec![0],
                active: 0
            }
        );
    }

    #[test]
    fn test_names_unique_when_labels_collide() {
        let mut d = InfluenceDiagram::new();
        d.add_node(Node::chance("C", &[], &["a", "b", "c"])).unwrap();
        d.add_node(Node::decision("A", &["C"], &["no", "yes"])).unwrap();
        d.add_node(Node::decision("A_2", &[], &["no", "yes"])).unwrap();
        d.add_node(Node::decision("A 2", &[], &["no", "yes"])).unwrap();
        d.generate_arcs().unwrap();
        d.generate(GenerateOptions::default()).unwrap();

        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, true).unwrap();
        let nested = z.local(d.index_of("A").unwrap()).unwrap().group(&[2])[1];
        let flat = z.local(d.index_of("A_2").unwrap()).unwrap().group(&[])[1];
        let spaced = z.local(d.index_of("A 2").unwrap()).unwrap().group(&[])[1];
        let names = [nested, flat, spaced].map(|v| model.export_name(v));
        assert_ne!(names[0], names[1]);
        assert_ne!(names[1], names[2]);
        assert_eq!(model.find(&names[1]), Some(flat));
        assert_eq!(model.find(&names[2]), Some(spaced));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("buy car?"), "buy_car_");
    }
}
