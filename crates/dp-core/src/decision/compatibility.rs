//! Path-compatibility variables linking paths to decisions.

use std::collections::BTreeMap;

use tracing::debug;

use super::variables::DecisionVariables;
use crate::diagram::{InfluenceDiagram, NodeKind, UtilitySign};
use crate::error::{DiagramError, ModelError};
use crate::model::{LinearExpr, Model, Sense, Solution, VarId};
use crate::paths::{FixedPath, ForbiddenPath, Path, Paths};

/// Options for [`PathCompatibilityVariables::new`].
#[derive(Debug, Clone)]
pub struct PathCompatibilityOptions {
    /// Name variables `x_<path>` in the model.
    pub names: bool,
    /// Paths matching any of these get no variable.
    pub forbidden_paths: Vec<ForbiddenPath>,
    /// Only paths agreeing with this assignment get a variable.
    pub fixed: FixedPath,
    /// Add `Σ P(s)·x_s·f = f`, or `≤ f` when a chance node is fixed.
    pub probability_cut: bool,
    /// Scale factor `f` applied to probability terms.
    pub probability_scale_factor: f64,
    /// Add `x_s ≥ Σ z − (|D| − 1)`. When unset, the bound is added unless
    /// the diagram's path utilities have a guaranteed sign.
    pub lower_bound: Option<bool>,
}

impl Default for PathCompatibilityOptions {
    fn default() -> Self {
        Self {
            names: true,
            forbidden_paths: Vec::new(),
            fixed: FixedPath::default(),
            probability_cut: true,
            probability_scale_factor: 1.0,
            lower_bound: None,
        }
    }
}

/// One continuous `x_s ∈ [0, 1]` per admissible path.
///
/// Zero-probability paths and forbidden paths get no variable. The
/// probability cut is an equality, so a strategy whose compatible paths
/// include a forbidden one leaves mass uncovered and is infeasible. Fixing a
/// chance node makes the attainable mass depend on the strategy, and the cut
/// is relaxed to an upper bound.
#[derive(Debug, Clone)]
pub struct PathCompatibilityVariables {
    vars: BTreeMap<Path, VarId>,
    scale: f64,
    cut_sense: Sense,
    probability_cut: Option<usize>,
}

impl PathCompatibilityVariables {
    pub fn new(
        model: &mut Model,
        diagram: &InfluenceDiagram,
        z: &DecisionVariables,
        options: &PathCompatibilityOptions,
    ) -> Result<Self, ModelError> {
        if !diagram.is_generated() {
            return Err(DiagramError::NotGenerated.into());
        }
        let f = options.probability_scale_factor;
        if !(f.is_finite() && f > 0.0) {
            return Err(DiagramError::InvalidOption(format!(
                "probability_scale_factor must be positive, got {f}"
            ))
            .into());
        }
        let chance_fixed = options
            .fixed
            .iter()
            .any(|(i, _)| diagram.nodes()[i].kind() == NodeKind::Chance);
        let cut_sense = if chance_fixed { Sense::Le } else { Sense::Eq };
        let lower_bound = options
            .lower_bound
            .unwrap_or(diagram.utility_sign() == UtilitySign::Unrestricted);
        let decisions = diagram.decision_nodes();

        let mut vars = BTreeMap::new();
        let mut pruned = 0usize;
        let mut forbidden = 0usize;
        for path in Paths::with_fixed(diagram.states(), &options.fixed)? {
            if diagram.probability_of(&path) == 0.0 {
                pruned += 1;
                continue;
            }
            if options.forbidden_paths.iter().any(|fp| fp.matches(&path)) {
                forbidden += 1;
                continue;
            }

            let name = options.names.then(|| {
                let states: Vec<String> = path.iter().map(|s| s.to_string()).collect();
                format!("x_{}", states.join("_"))
            });
            let x = model.add_continuous(0.0, 1.0, name)?;
            let mut linked = LinearExpr::from(x);
            for &d in decisions {
                let zd = z
                    .variable(d, &path)
                    .ok_or_else(|| DiagramError::InvalidOption(format!(
                        "no decision variables for {}",
                        diagram.nodes()[d].name()
                    )))?;
                model.add_constraint(LinearExpr::from(x) - zd, Sense::Le, 0.0);
                linked -= LinearExpr::from(zd);
            }
            if lower_bound && !decisions.is_empty() {
                model.add_constraint(linked, Sense::Ge, 1.0 - decisions.len() as f64);
            }
            vars.insert(path, x);
        }

        let mut out = Self {
            vars,
            scale: f,
            cut_sense,
            probability_cut: None,
        };
        if options.probability_cut {
            out.probability_cut =
                Some(model.add_constraint(out.probability_mass(diagram), cut_sense, f));
        }
        debug!(
            paths = out.vars.len(),
            pruned,
            forbidden,
            lower_bound,
            probability_cut = options.probability_cut,
            "path compatibility variables"
        );
        Ok(out)
    }

    /// `Σ P(s)·f·x_s` over all variables.
    pub fn probability_mass(&self, diagram: &InfluenceDiagram) -> LinearExpr {
        self.vars
            .iter()
            .map(|(path, &x)| LinearExpr::term(x, diagram.probability_of(path) * self.scale))
            .sum()
    }

    pub fn get(&self, path: &[usize]) -> Option<VarId> {
        self.vars.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, VarId)> + '_ {
        self.vars.iter().map(|(p, &x)| (p, x))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    /// Sense of the probability cut: `Eq` unless a chance node is fixed.
    pub fn cut_sense(&self) -> Sense {
        self.cut_sense
    }

    /// Position of the eager probability cut, if one was added.
    pub fn probability_cut(&self) -> Option<usize> {
        self.probability_cut
    }

    /// Paths whose variable is at least one half in a solution.
    pub fn active_paths<'a>(&'a self, solution: &'a Solution) -> impl Iterator<Item = &'a Path> + 'a {
        self.vars
            .iter()
            .filter(move |(_, x)| solution.value(**x) >= super::variables::ACTIVE_THRESHOLD)
            .map(|(p, _)| p)
    }
}

/// Add the probability cut as a lazy constraint.
pub fn lazy_probability_cut(
    model: &mut Model,
    diagram: &InfluenceDiagram,
    x: &PathCompatibilityVariables,
) -> usize {
    model.add_lazy_constraint(x.probability_mass(diagram), x.cut_sense(), x.scale_factor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::UtilityDistribution;
    use crate::assert_approx_eq;
    use crate::decision::expected_value;
    use crate::diagram::{GenerateOptions, Node, Tensor};
    use crate::model::{BruteForceSolver, Direction, Solver};
    use crate::test_utils::used_car;

    fn build(options: &PathCompatibilityOptions) -> (Model, DecisionVariables, PathCompatibilityVariables) {
        let d = used_car();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, true).unwrap();
        let x = PathCompatibilityVariables::new(&mut model, &d, &z, options).unwrap();
        (model, z, x)
    }

    #[test]
    fn test_zero_probability_paths_pruned() {
        let (_, _, x) = build(&PathCompatibilityOptions::default());
        // Without a test R is "no test"; with a test R matches O.
        // Positive paths: 2 (O) * 1 (R) * 3 (A) for each T.
        assert_eq!(x.len(), 12);
        assert!(x.get(&[0, 0, 0, 0]).is_some());
        assert!(x.get(&[0, 0, 1, 0]).is_none());
    }

    #[test]
    fn test_constraints_added() {
        let (model, _, x) = build(&PathCompatibilityOptions {
            lower_bound: Some(true),
            ..Default::default()
        });
        // 4 one-hot + 12 * (2 links + 1 lower bound) + 1 cut
        assert_eq!(model.constraints().len(), 4 + 36 + 1);
        let cut = &model.constraints()[x.probability_cut().unwrap()];
        assert_eq!(cut.sense, Sense::Eq);
        assert_eq!(cut.rhs, 1.0);
        assert!(model.find("x_1_1_2_0").is_some());
    }

    #[test]
    fn test_lower_bound_skipped_when_requested() {
        let (model, _, _) = build(&PathCompatibilityOptions {
            lower_bound: Some(false),
            probability_cut: false,
            ..Default::default()
        });
        assert_eq!(model.constraints().len(), 4 + 24);
    }

    #[test]
    fn test_forbidden_paths_skipped() {
        let d = used_car();
        let forbidden =
            ForbiddenPath::from_names(&d, &["T", "A"], [["test", "buy without guarantee"]])
                .unwrap();
        let (_, _, x) = build(&PathCompatibilityOptions {
            forbidden_paths: vec![forbidden.clone()],
            ..Default::default()
        });
        assert_eq!(x.len(), 12 - 2);
        assert!(x.iter().all(|(p, _)| !forbidden.matches(p)));
    }

    #[test]
    fn test_fixed_paths() {
        let d = used_car();
        let fixed = FixedPath::from_names(&d, [("O", "peach")]).unwrap();
        let (_, _, x) = build(&PathCompatibilityOptions {
            fixed,
            ..Default::default()
        });
        assert_eq!(x.len(), 6);
        assert!(x.iter().all(|(p, _)| p[0] == 1));
        assert_eq!(x.cut_sense(), Sense::Le);
    }

    #[test]
    fn test_scale_factor_validated() {
        let d = used_car();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, false).unwrap();
        let err = PathCompatibilityVariables::new(
            &mut model,
            &d,
            &z,
            &PathCompatibilityOptions {
                probability_scale_factor: 0.0,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Diagram(DiagramError::InvalidOption(_))));
    }

    #[test]
    fn test_lazy_cut() {
        let d = used_car();
        let (mut model, _, x) = build(&PathCompatibilityOptions {
            probability_cut: false,
            probability_scale_factor: 10.0,
            ..Default::default()
        });
        let i = lazy_probability_cut(&mut model, &d, &x);
        let cut = &model.constraints()[i];
        assert!(cut.lazy);
        assert_eq!(cut.sense, Sense::Eq);
        assert_eq!(cut.rhs, 10.0);
    }

    /// D ∈ {safe, risky} with utilities -10 and -100, risky forbidden.
    fn forbidden_loss() -> (InfluenceDiagram, ForbiddenPath) {
        let mut d = InfluenceDiagram::new();
        d.add_node(Node::decision("D", &[], &["safe", "risky"])).unwrap();
        d.add_node(Node::value("V", &["D"])).unwrap();
        d.generate_arcs().unwrap();
        d.set_utility("V", Tensor::new(vec![2], vec![-10.0, -100.0]).unwrap())
            .unwrap();
        d.generate(GenerateOptions::default()).unwrap();
        let forbidden = ForbiddenPath::from_names(&d, &["D"], [["risky"]]).unwrap();
        (d, forbidden)
    }

    #[test]
    fn test_forbidden_decision_not_chosen_with_losses() {
        let (d, forbidden) = forbidden_loss();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, true).unwrap();
        let x = PathCompatibilityVariables::new(
            &mut model,
            &d,
            &z,
            &PathCompatibilityOptions {
                forbidden_paths: vec![forbidden],
                ..Default::default()
            },
        )
        .unwrap();
        let ev = expected_value(&d, &x).unwrap();
        model.set_objective(Direction::Maximize, ev.expr().clone());

        let solution = BruteForceSolver::default().solve(&model).unwrap();
        let strategy = z.decision_strategy(&solution).unwrap();
        assert_eq!(strategy.choice(0, &[]), Some(0));
        assert_approx_eq!(ev.value(&solution), -10.0, 1e-9);
        let mean = UtilityDistribution::new(&d, &strategy)
            .unwrap()
            .expected_value()
            .unwrap();
        assert_approx_eq!(mean, ev.value(&solution), 1e-9);
    }

    #[test]
    fn test_forbidden_strategy_violates_cut() {
        let (d, forbidden) = forbidden_loss();
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, &d, false).unwrap();
        PathCompatibilityVariables::new(
            &mut model,
            &d,
            &z,
            &PathCompatibilityOptions {
                forbidden_paths: vec![forbidden],
                ..Default::default()
            },
        )
        .unwrap();
        // z_safe, z_risky, x_safe
        assert!(model.is_feasible(&[1.0, 0.0, 1.0], 1e-9));
        assert!(!model.is_feasible(&[0.0, 1.0, 0.0], 1e-9));
    }
}
