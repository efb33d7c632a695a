//! Variable assignments produced by a solver.

use std::fmt::Write as _;

use super::{Model, VarId};
use crate::error::ModelError;

/// A complete assignment of model variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    values: Vec<f64>,
    objective: f64,
}

impl Solution {
    /// Wrap a dense assignment, evaluating the model's objective.
    pub fn from_values(model: &Model, values: Vec<f64>) -> Result<Self, ModelError> {
        if values.len() != model.num_variables() {
            return Err(ModelError::SolutionSize {
                expected: model.num_variables(),
                actual: values.len(),
            });
        }
        let objective = model.objective().evaluate(&values);
        Ok(Self { values, objective })
    }

    /// Parse a solution file with one `name value` pair per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. Variables that
    /// do not appear are taken to be zero.
    pub fn from_sol(model: &Model, text: &str) -> Result<Self, ModelError> {
        let mut values = vec![0.0; model.num_variables()];
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(name), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(ModelError::SolutionParse {
                    line: i + 1,
                    message: format!("expected `name value`, got `{line}`"),
                });
            };
            let value: f64 = value.parse().map_err(|e| ModelError::SolutionParse {
                line: i + 1,
                message: format!("invalid value for {name}: {e}"),
            })?;
            let var = model
                .find(name)
                .or_else(|| anonymous(name).filter(|v| v.0 < values.len()))
                .ok_or_else(|| ModelError::UnknownVariable {
                    name: name.to_string(),
                })?;
            values[var.0] = value;
        }
        Self::from_values(model, values)
    }

    /// Render in the format read by [`Solution::from_sol`].
    pub fn to_sol(&self, model: &Model) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Objective value = {}", self.objective);
        for (i, value) in self.values.iter().enumerate() {
            let _ = writeln!(out, "{} {}", model.export_name(VarId(i)), value);
        }
        out
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.0]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Objective value of the assignment, including its constant.
    pub fn objective(&self) -> f64 {
        self.objective
    }
}

/// `v{k}` names given to unnamed variables on export.
fn anonymous(name: &str) -> Option<VarId> {
    name.strip_prefix('v')?.parse().ok().map(VarId)
}
