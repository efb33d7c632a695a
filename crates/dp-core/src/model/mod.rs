//! In-crate mixed-integer linear program.
//!
//! The model only records variables, constraints and an objective. Solving
//! happens behind the [`Solver`] trait, either with the bundled
//! [`BruteForceSolver`] or by exporting the model with [`write_lp`] and
//! reading an external solution back with [`Solution::from_sol`].

pub mod brute_force;
pub mod expr;
pub mod lp;
pub mod solution;
pub mod solver;

pub use brute_force::BruteForceSolver;
pub use expr::{LinearExpr, VarId};
pub use lp::write_lp;
pub use solution::Solution;
pub use solver::{Solver, SolverError};

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ModelError;

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
    pub name: Option<String>,
}

/// Constraint sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl Sense {
    pub fn symbol(self) -> &'static str {
        match self {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "=",
        }
    }
}

/// `expr (sense) rhs`. The expression's constant is folded into `rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
    pub lazy: bool,
}

impl Constraint {
    /// Left-hand side minus right-hand side.
    pub fn slack(&self, values: &[f64]) -> f64 {
        self.expr.evaluate(values) - self.rhs
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let slack = self.slack(values);
        match self.sense {
            Sense::Le => slack <= tolerance,
            Sense::Ge => slack >= -tolerance,
            Sense::Eq => slack.abs() <= tolerance,
        }
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Maximize,
    Minimize,
}

/// A MILP instance.
#[derive(Debug, Clone, Default)]
pub struct Model {
    variables: Vec<Variable>,
    names: HashMap<String, VarId>,
    constraints: Vec<Constraint>,
    direction: Direction,
    objective: LinearExpr,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, variable: Variable) -> Result<VarId, ModelError> {
        let id = VarId(self.variables.len());
        if let Some(name) = &variable.name {
            if self.names.contains_key(name) {
                return Err(ModelError::DuplicateVariable { name: name.clone() });
            }
            self.names.insert(name.clone(), id);
        }
        self.variables.push(variable);
        Ok(id)
    }

    /// Add a continuous variable. Names must be unique within the model.
    pub fn add_continuous(
        &mut self,
        lower: f64,
        upper: f64,
        name: Option<String>,
    ) -> Result<VarId, ModelError> {
        self.push(Variable {
            kind: VarKind::Continuous,
            lower,
            upper,
            name,
        })
    }

    /// Add a binary variable. Names must be unique within the model.
    pub fn add_binary(&mut self, name: Option<String>) -> Result<VarId, ModelError> {
        self.push(Variable {
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
            name,
        })
    }

    fn constrain(&mut self, expr: LinearExpr, sense: Sense, rhs: f64, lazy: bool) -> usize {
        let constant = expr.constant_term();
        let mut expr = expr.compact();
        expr.add_constant(-constant);
        self.constraints.push(Constraint {
            expr,
            sense,
            rhs: rhs - constant,
            lazy,
        });
        self.constraints.len() - 1
    }

    /// Add `expr (sense) rhs` and return its position.
    pub fn add_constraint(&mut self, expr: LinearExpr, sense: Sense, rhs: f64) -> usize {
        self.constrain(expr, sense, rhs, false)
    }

    /// Add a constraint that solvers may enforce lazily.
    pub fn add_lazy_constraint(&mut self, expr: LinearExpr, sense: Sense, rhs: f64) -> usize {
        self.constrain(expr, sense, rhs, true)
    }

    pub fn set_objective(&mut self, direction: Direction, expr: LinearExpr) {
        self.direction = direction;
        self.objective = expr.compact();
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Position of a named variable.
    pub fn find(&self, name: &str) -> Option<VarId> {
        self.names.get(name).copied()
    }

    /// Name used for a variable in exported files.
    pub fn export_name(&self, var: VarId) -> String {
        match &self.variables[var.0].name {
            Some(name) => name.clone(),
            None => format!("v{}", var.0),
        }
    }

    /// Indices of violated constraints and out-of-domain variables.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<Violation> {
        let mut out = Vec::new();
        for (i, v) in self.variables.iter().enumerate() {
            let x = values.get(i).copied().unwrap_or(f64::NAN);
            let integral = v.kind == VarKind::Continuous || (x - x.round()).abs() <= tolerance;
            if !(x >= v.lower - tolerance && x <= v.upper + tolerance && integral) {
                out.push(Violation::Bound(VarId(i)));
            }
        }
        for (i, c) in self.constraints.iter().enumerate() {
            if !c.is_satisfied(values, tolerance) {
                out.push(Violation::Constraint(i));
            }
        }
        out
    }

    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.variables.len() && self.violations(values, tolerance).is_empty()
    }
}

/// A failed feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Bound(VarId),
    Constraint(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_constant_folded_into_rhs() {
        let mut m = Model::new();
        let x = m.add_continuous(0.0, 1.0, None).unwrap();
        m.add_constraint(LinearExpr::from(x) + 2.0, Sense::Le, 3.0);
        let c = &m.constraints()[0];
        assert_eq!(c.rhs, 1.0);
        assert_eq!(c.expr.constant_term(), 0.0);
        assert!(c.is_satisfied(&[1.0], 1e-9));
        assert!(!c.is_satisfied(&[1.5], 1e-9));
    }

    #[test]
    fn test_violations() {
        let mut m = Model::new();
        let z = m.add_binary(Some("z".into())).unwrap();
        let x = m.add_continuous(0.0, 1.0, Some("x".into())).unwrap();
        m.add_constraint(LinearExpr::from(x) - z, Sense::Le, 0.0);
        assert!(m.is_feasible(&[1.0, 1.0], 1e-9));
        assert_eq!(m.violations(&[0.0, 1.0], 1e-9), vec![Violation::Constraint(0)]);
        assert_eq!(m.violations(&[0.5, 0.0], 1e-9), vec![Violation::Bound(z)]);
        assert!(!m.is_feasible(&[1.0], 1e-9));
    }

    #[test]
    fn test_names() {
        let mut m = Model::new();
        let a = m.add_binary(None).unwrap();
        let b = m.add_binary(Some("z_T_1".into())).unwrap();
        assert_eq!(m.export_name(a), "v0");
        assert_eq!(m.export_name(b), "z_T_1");
        assert_eq!(m.find("z_T_1"), Some(b));
        assert_eq!(m.num_binaries(), 2);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut m = Model::new();
        m.add_binary(Some("z1_A_2_1".into())).unwrap();
        let err = m.add_continuous(0.0, 1.0, Some("z1_A_2_1".into())).unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateVariable {
                name: "z1_A_2_1".into()
            }
        );
        assert_eq!(m.num_variables(), 1);
        m.add_binary(None).unwrap();
        m.add_binary(None).unwrap();
        assert_eq!(m.num_variables(), 3);
    }

    #[test]
    fn test_objective_keeps_constant() {
        let mut m = Model::new();
        let x = m.add_continuous(0.0, 1.0, None).unwrap();
        m.set_objective(Direction::Minimize, 2.0 * x + 5.0);
        assert_eq!(m.objective().evaluate(&[1.0]), 7.0);
        assert_eq!(m.direction(), Direction::Minimize);
    }
}
