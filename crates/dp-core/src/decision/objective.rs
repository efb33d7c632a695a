//! Objective expressions: expected utility and conditional value-at-risk.

use tracing::debug;

use super::compatibility::PathCompatibilityVariables;
use crate::diagram::InfluenceDiagram;
use crate::error::{DiagramError, ModelError};
use crate::model::{LinearExpr, Model, Sense, Solution, VarId};

/// `Σ P(s)·U(s)·f·x_s` with `U` the translated path utility.
#[derive(Debug, Clone)]
pub struct ExpectedValue {
    expr: LinearExpr,
    mass: LinearExpr,
    translation: f64,
    scale: f64,
}

impl ExpectedValue {
    /// Expression to hand to [`Model::set_objective`].
    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn into_expr(self) -> LinearExpr {
        self.expr
    }

    /// Expected utility of a solution with the translation removed.
    pub fn value(&self, solution: &Solution) -> f64 {
        let raw = self.expr.evaluate(solution.values());
        let mass = self.mass.evaluate(solution.values());
        (raw - self.translation * mass) / self.scale
    }
}

/// Build the expected-utility objective over the compatibility variables.
pub fn expected_value(
    diagram: &InfluenceDiagram,
    x: &PathCompatibilityVariables,
) -> Result<ExpectedValue, DiagramError> {
    let f = x.scale_factor();
    let mut expr = LinearExpr::new();
    for (path, var) in x.iter() {
        let p = diagram.probability_of(path);
        let u = diagram.path_utility(path)?;
        expr.add_term(var, p * u * f);
    }
    Ok(ExpectedValue {
        expr,
        mass: x.probability_mass(diagram),
        translation: diagram.translation(),
        scale: f,
    })
}

/// Lower-tail CVaR of the path utility under the chosen strategy.
///
/// The expression equals `α·f·CVaR` of the translated utility; `value`
/// removes the scaling and the translation.
#[derive(Debug, Clone)]
pub struct ConditionalValueAtRisk {
    expr: LinearExpr,
    alpha: f64,
    translation: f64,
    scale: f64,
    eta: Option<VarId>,
}

impl ConditionalValueAtRisk {
    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn into_expr(self) -> LinearExpr {
        self.expr
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Value-at-risk variable, absent when every path has the same utility.
    pub fn eta(&self) -> Option<VarId> {
        self.eta
    }

    pub fn value(&self, solution: &Solution) -> f64 {
        self.expr.evaluate(solution.values()) / (self.alpha * self.scale) - self.translation
    }
}

/// Add the CVaR linearization for level `alpha ∈ (0, 1]`.
///
/// Per path `s` with utility `u_s`, binaries `λ_s` (`u_s < η`) and `λ'_s`
/// (`u_s ≤ η`) select the tail, `ρ_s` carries the full mass of strictly worse
/// paths and `ρ'_s` the mass counted towards the tail, with `Σ ρ' = α·f`.
pub fn conditional_value_at_risk(
    model: &mut Model,
    diagram: &InfluenceDiagram,
    x: &PathCompatibilityVariables,
    alpha: f64,
) -> Result<ConditionalValueAtRisk, ModelError> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(ModelError::InvalidAlpha {
            alpha,
            range: "(0, 1]",
        });
    }
    let f = x.scale_factor();
    let mut utilities = Vec::with_capacity(x.len());
    for (path, var) in x.iter() {
        utilities.push((var, diagram.probability_of(path), diagram.path_utility(path)?));
    }
    if utilities.is_empty() {
        return Err(ModelError::EmptyDistribution);
    }

    let mut sorted: Vec<f64> = utilities.iter().map(|(_, _, u)| *u).collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    let (u_min, u_max) = (sorted[0], sorted[sorted.len() - 1]);
    let translation = diagram.translation();

    let min_gap = sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    if !min_gap.is_finite() {
        debug!(utility = u_min, "cvar over a constant utility");
        return Ok(ConditionalValueAtRisk {
            expr: LinearExpr::constant(u_min * alpha * f),
            alpha,
            translation,
            scale: f,
            eta: None,
        });
    }
    let big_m = u_max - u_min;
    let epsilon = min_gap / 2.0;

    let eta = model.add_continuous(f64::NEG_INFINITY, f64::INFINITY, Some("eta".to_string()))?;
    let mut tail_mass = LinearExpr::new();
    let mut expr = LinearExpr::new();
    for (k, &(x_s, p, u)) in utilities.iter().enumerate() {
        let lambda = model.add_binary(Some(format!("lambda_{k}")))?;
        let lambda_bar = model.add_binary(Some(format!("lambda_bar_{k}")))?;
        let rho = model.add_continuous(0.0, f64::INFINITY, Some(format!("rho_{k}")))?;
        let rho_bar = model.add_continuous(0.0, f64::INFINITY, Some(format!("rho_bar_{k}")))?;

        // λ = 1 exactly when u < η
        model.add_constraint(LinearExpr::from(eta) - big_m * lambda, Sense::Le, u);
        model.add_constraint(
            LinearExpr::from(eta) - (big_m + epsilon) * lambda,
            Sense::Ge,
            u - big_m,
        );
        // λ' = 1 exactly when u ≤ η
        model.add_constraint(
            LinearExpr::from(eta) - (big_m + epsilon) * lambda_bar,
            Sense::Le,
            u - epsilon,
        );
        model.add_constraint(LinearExpr::from(eta) - big_m * lambda_bar, Sense::Ge, u - big_m);

        model.add_constraint(LinearExpr::from(rho) - rho_bar, Sense::Le, 0.0);
        model.add_constraint(LinearExpr::from(rho_bar) - (p * f) * x_s, Sense::Le, 0.0);
        model.add_constraint((p * f) * x_s + f * lambda - LinearExpr::from(rho), Sense::Le, f);
        model.add_constraint(LinearExpr::from(rho) - f * lambda, Sense::Le, 0.0);
        model.add_constraint(LinearExpr::from(rho_bar) - f * lambda_bar, Sense::Le, 0.0);

        tail_mass += LinearExpr::from(rho_bar);
        expr.add_term(rho_bar, u);
    }
    model.add_constraint(tail_mass, Sense::Eq, alpha * f);

    debug!(alpha, big_m, epsilon, paths = utilities.len(), "cvar constraints");
    Ok(ConditionalValueAtRisk {
        expr,
        alpha,
        translation,
        scale: f,
        eta: Some(eta),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::decision::{DecisionVariables, PathCompatibilityOptions};
    use crate::diagram::{GenerateOptions, InfluenceDiagram, Node};
    use crate::model::{BruteForceSolver, Direction, Solver};
    use crate::test_utils::{used_car, used_car_with};

    fn compile(diagram: &InfluenceDiagram) -> (Model, PathCompatibilityVariables) {
        let mut model = Model::new();
        let z = DecisionVariables::new(&mut model, diagram, true).unwrap();
        let x = PathCompatibilityVariables::new(
            &mut model,
            diagram,
            &z,
            &PathCompatibilityOptions::default(),
        )
        .unwrap();
        (model, x)
    }

    #[test]
    fn test_expected_value_used_car() {
        let d = used_car();
        let (mut model, x) = compile(&d);
        let ev = expected_value(&d, &x).unwrap();
        model.set_objective(Direction::Maximize, ev.expr().clone());
        let solution = BruteForceSolver::default().solve(&model).unwrap();
        assert_approx_eq!(ev.value(&solution), 31.0, 1e-9);
    }

    #[test]
    fn test_expected_value_removes_translation() {
        let d = used_car_with(GenerateOptions {
            positive_path_utility: true,
            ..Default::default()
        });
        let (mut model, x) = compile(&d);
        let ev = expected_value(&d, &x).unwrap();
        model.set_objective(Direction::Maximize, ev.expr().clone());
        let solution = BruteForceSolver::default().solve(&model).unwrap();
        assert_approx_eq!(solution.objective(), 31.0 + d.translation(), 1e-9);
        assert_approx_eq!(ev.value(&solution), 31.0, 1e-9);
    }

    #[test]
    fn test_cvar_alpha_range() {
        let d = used_car();
        let (mut model, x) = compile(&d);
        for alpha in [0.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                conditional_value_at_risk(&mut model, &d, &x, alpha),
                Err(ModelError::InvalidAlpha { .. })
            ));
        }
    }

    #[test]
    fn test_cvar_constant_utility() {
        let mut d = InfluenceDiagram::new();
        d.add_node(Node::decision("D", &[], &["a", "b"])).unwrap();
        d.add_node(Node::value("V", &["D"])).unwrap();
        d.generate_arcs().unwrap();
        d.set_utility("V", crate::diagram::Tensor::filled(vec![2], 4.0))
            .unwrap();
        d.generate(GenerateOptions::default()).unwrap();
        let (mut model, x) = compile(&d);
        let before = model.num_variables();
        let cvar = conditional_value_at_risk(&mut model, &d, &x, 0.3).unwrap();
        assert!(cvar.eta().is_none());
        assert_eq!(model.num_variables(), before);
        let solution = Solution::from_values(&model, vec![0.0; before]).unwrap();
        assert_approx_eq!(cvar.value(&solution), 4.0, 1e-12);
    }

    #[test]
    fn test_cvar_variable_counts() {
        let d = used_car();
        let (mut model, x) = compile(&d);
        let before_vars = model.num_variables();
        let before_rows = model.constraints().len();
        conditional_value_at_risk(&mut model, &d, &x, 0.2).unwrap();
        assert_eq!(model.num_variables(), before_vars + 1 + 4 * x.len());
        assert_eq!(model.constraints().len(), before_rows + 9 * x.len() + 1);
        assert!(model.find("eta").is_some());
    }

    /// Hand-built tail of the optimal used-car strategy at `eta`: outcome 15
    /// with probability 0.2 fills the tail fully, outcome 35 covers the rest.
    fn tail_assignment(
        model: &Model,
        d: &InfluenceDiagram,
        x: &PathCompatibilityVariables,
        strategy: &Solution,
        eta: f64,
    ) -> Vec<f64> {
        let f = x.scale_factor();
        let mut values = strategy.values().to_vec();
        values.resize(model.num_variables(), 0.0);
        values[model.find("eta").unwrap().index()] = eta;

        let compatible = |path: &[usize], var: VarId| d.probability_of(path) * f * strategy.value(var);
        let (mut below, mut at) = (0.0, 0.0);
        for (path, var) in x.iter() {
            let u = d.path_utility(path).unwrap();
            if u < eta - 1e-9 {
                below += compatible(path, var);
            } else if (u - eta).abs() <= 1e-9 {
                at += compatible(path, var);
            }
        }
        assert_approx_eq!(below, 0.2 * f, 1e-9);
        assert_approx_eq!(at, 0.8 * f, 1e-9);
        let share = (0.5 * f - below) / at;

        for (k, (path, var)) in x.iter().enumerate() {
            let u = d.path_utility(path).unwrap();
            let mass = compatible(path, var);
            let (lambda, lambda_bar, rho, rho_bar) = if u < eta - 1e-9 {
                (1.0, 1.0, mass, mass)
            } else if (u - eta).abs() <= 1e-9 {
                (0.0, 1.0, 0.0, mass * share)
            } else {
                (0.0, 0.0, 0.0, 0.0)
            };
            values[model.find(&format!("lambda_{k}")).unwrap().index()] = lambda;
            values[model.find(&format!("lambda_bar_{k}")).unwrap().index()] = lambda_bar;
            values[model.find(&format!("rho_{k}")).unwrap().index()] = rho;
            values[model.find(&format!("rho_bar_{k}")).unwrap().index()] = rho_bar;
        }
        values
    }

    fn used_car_cvar() -> (InfluenceDiagram, Model, PathCompatibilityVariables, Solution) {
        let d = used_car();
        let (mut model, x) = compile(&d);
        let ev = expected_value(&d, &x).unwrap();
        model.set_objective(Direction::Maximize, ev.expr().clone());
        let strategy = BruteForceSolver::default().solve(&model).unwrap();
        assert_approx_eq!(ev.value(&strategy), 31.0, 1e-9);
        (d, model, x, strategy)
    }

    #[test]
    fn test_cvar_of_optimal_strategy() {
        let (d, mut model, x, strategy) = used_car_cvar();
        let cvar = conditional_value_at_risk(&mut model, &d, &x, 0.5).unwrap();
        let values = tail_assignment(&model, &d, &x, &strategy, 35.0);
        assert!(model.is_feasible(&values, 1e-6));
        let solution = Solution::from_values(&model, values).unwrap();
        assert_approx_eq!(cvar.value(&solution), 27.0, 1e-9);
        assert_approx_eq!(solution.value(cvar.eta().unwrap()), 35.0, 1e-12);
    }

    #[test]
    fn test_cvar_rejects_wrong_threshold() {
        let (d, mut model, x, strategy) = used_car_cvar();
        conditional_value_at_risk(&mut model, &d, &x, 0.5).unwrap();
        let mut values = tail_assignment(&model, &d, &x, &strategy, 35.0);
        values[model.find("eta").unwrap().index()] = 30.0;
        assert!(!model.is_feasible(&values, 1e-6));
    }

    #[test]
    fn test_cvar_rejects_wrong_tail_mass() {
        let (d, mut model, x, strategy) = used_car_cvar();
        conditional_value_at_risk(&mut model, &d, &x, 0.5).unwrap();
        let mut values = tail_assignment(&model, &d, &x, &strategy, 35.0);
        let mut scaled = 0;
        for k in 0..x.len() {
            let var = model.find(&format!("rho_bar_{k}")).unwrap();
            let lambda = model.find(&format!("lambda_{k}")).unwrap();
            if values[var.index()] > 0.0 && values[lambda.index()] == 0.0 {
                values[var.index()] *= 2.0;
                scaled += 1;
            }
        }
        assert!(scaled > 0);
        assert!(!model.is_feasible(&values, 1e-6));
    }
}
