//! Exhaustive reference solver for small models.
//!
//! Binary variables are enumerated group by group: every non-lazy equality
//! `Σ z = 1` over binaries with unit coefficients is a one-hot group and
//! contributes one choice per member; remaining binaries contribute two.
//! For each binary assignment the continuous variables are bounded by the
//! constraints that mention exactly one of them and then pushed to whichever
//! bound the objective prefers; variables the objective ignores take their
//! upper bound when it is finite. The assignment is kept only if every
//! constraint holds.
//!
//! This is exact for models whose continuous variables interact only through
//! constraints that the bound choice already satisfies, which covers the
//! expected-value formulation. Models that need a real LP relaxation, such
//! as the CVaR formulation, should be exported with `write_lp` instead.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::{Direction, Model, Sense, Solution, Solver, SolverError, VarKind};
use crate::paths::Paths;

/// Default cap on the number of binary assignments.
pub const DEFAULT_MAX_ASSIGNMENTS: u64 = 1 << 20;

#[derive(Debug, Clone)]
pub struct BruteForceSolver {
    max_assignments: u64,
    tolerance: f64,
}

impl Default for BruteForceSolver {
    fn default() -> Self {
        Self {
            max_assignments: DEFAULT_MAX_ASSIGNMENTS,
            tolerance: 1e-9,
        }
    }
}

impl BruteForceSolver {
    pub fn new(max_assignments: u64, tolerance: f64) -> Self {
        Self {
            max_assignments,
            tolerance,
        }
    }

    pub fn from_settings(settings: &dp_config::SolverSettings) -> Self {
        Self::new(settings.max_assignments, settings.tolerance)
    }
}

/// Constraint that bounds a single continuous variable once binaries are set.
struct SingleBound {
    constraint: usize,
    var: usize,
    coefficient: f64,
}

fn one_hot_groups(model: &Model) -> Vec<Vec<usize>> {
    let mut grouped = vec![false; model.num_variables()];
    let mut groups = Vec::new();
    for c in model.constraints() {
        if c.lazy || c.sense != Sense::Eq || c.rhs != 1.0 || c.expr.is_empty() {
            continue;
        }
        let members: Vec<usize> = c.expr.terms().iter().map(|(v, _)| v.index()).collect();
        let unit_binaries = c.expr.terms().iter().all(|(v, coefficient)| {
            *coefficient == 1.0 && model.variable(*v).kind == VarKind::Binary
        });
        if unit_binaries && members.iter().all(|&m| !grouped[m]) {
            for &m in &members {
                grouped[m] = true;
            }
            groups.push(members);
        }
    }
    groups
}

impl BruteForceSolver {
    fn bound_continuous(
        &self,
        model: &Model,
        singles: &HashMap<usize, Vec<SingleBound>>,
        preference: &[f64],
        values: &mut [f64],
    ) -> Result<bool, SolverError> {
        for (var, v) in model.variables().iter().enumerate() {
            if v.kind != VarKind::Continuous {
                continue;
            }
            let (mut lo, mut hi) = (v.lower, v.upper);
            for bound in singles.get(&var).into_iter().flatten() {
                let c = &model.constraints()[bound.constraint];
                let rest: f64 = c
                    .expr
                    .terms()
                    .iter()
                    .filter(|(other, _)| other.index() != bound.var)
                    .map(|(other, k)| k * values[other.index()])
                    .sum();
                let limit = (c.rhs - rest) / bound.coefficient;
                let upper = match c.sense {
                    Sense::Eq => {
                        lo = lo.max(limit);
                        hi = hi.min(limit);
                        continue;
                    }
                    Sense::Le => bound.coefficient > 0.0,
                    Sense::Ge => bound.coefficient < 0.0,
                };
                if upper {
                    hi = hi.min(limit);
                } else {
                    lo = lo.max(limit);
                }
            }
            if lo > hi + self.tolerance {
                return Ok(false);
            }
            values[var] = match preference[var] {
                p if p > 0.0 && hi.is_finite() => hi,
                p if p < 0.0 && lo.is_finite() => lo,
                p if p != 0.0 => {
                    return Err(SolverError::Unsupported(format!(
                        "objective is unbounded in {}",
                        model.export_name(super::VarId(var))
                    )))
                }
                _ if hi.is_finite() => hi,
                _ if lo.is_finite() => lo,
                _ => 0.0,
            };
        }
        Ok(true)
    }
}

impl Solver for BruteForceSolver {
    fn name(&self) -> &str {
        "brute-force"
    }

    fn solve(&mut self, model: &Model) -> Result<Solution, SolverError> {
        let groups = one_hot_groups(model);
        let mut grouped = vec![false; model.num_variables()];
        for &m in groups.iter().flatten() {
            grouped[m] = true;
        }
        let free: Vec<usize> = model
            .variables()
            .iter()
            .enumerate()
            .filter(|(i, v)| v.kind == VarKind::Binary && !grouped[*i])
            .map(|(i, _)| i)
            .collect();

        let dims: Vec<usize> = groups
            .iter()
            .map(Vec::len)
            .chain(free.iter().map(|_| 2))
            .collect();
        let assignments = Paths::new(&dims);
        let count = assignments.path_count().unwrap_or(u128::MAX);
        debug!(
            groups = groups.len(),
            free_binaries = free.len(),
            assignments = %count,
            "brute force enumeration"
        );
        if count > self.max_assignments as u128 {
            return Err(SolverError::TooLarge {
                assignments: count,
                limit: self.max_assignments,
            });
        }

        let mut singles: HashMap<usize, Vec<SingleBound>> = HashMap::new();
        for (i, c) in model.constraints().iter().enumerate() {
            let mut continuous = c
                .expr
                .terms()
                .iter()
                .filter(|(v, _)| model.variable(*v).kind == VarKind::Continuous);
            if let (Some((v, k)), None) = (continuous.next(), continuous.next()) {
                singles.entry(v.index()).or_default().push(SingleBound {
                    constraint: i,
                    var: v.index(),
                    coefficient: *k,
                });
            }
        }

        let sign = match model.direction() {
            Direction::Maximize => 1.0,
            Direction::Minimize => -1.0,
        };
        let mut preference = vec![0.0; model.num_variables()];
        for (v, k) in model.objective().terms() {
            preference[v.index()] += sign * k;
        }

        let mut best: Option<(f64, Vec<f64>)> = None;
        let mut values = vec![0.0; model.num_variables()];
        for choice in assignments {
            for (group, &pick) in groups.iter().zip(&choice) {
                for (k, &member) in group.iter().enumerate() {
                    values[member] = if k == pick { 1.0 } else { 0.0 };
                }
            }
            for (&b, &bit) in free.iter().zip(&choice[groups.len()..]) {
                values[b] = bit as f64;
            }
            if !self.bound_continuous(model, &singles, &preference, &mut values)? {
                continue;
            }
            if !model
                .constraints()
                .iter()
                .all(|c| c.is_satisfied(&values, self.tolerance))
            {
                continue;
            }
            let score = sign * model.objective().evaluate(&values);
            trace!(?choice, score, "feasible assignment");
            if best
                .as_ref()
                .map_or(true, |(top, _)| score > top + self.tolerance)
            {
                best = Some((score, values.clone()));
            }
        }

        let (_, values) = best.ok_or(SolverError::Infeasible)?;
        Solution::from_values(model, values).map_err(|e| SolverError::Unsupported(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearExpr;

    #[test]
    fn test_one_hot_choice() {
        let mut m = Model::new();
        let z: Vec<_> = (0..3).map(|i| m.add_binary(Some(format!("z{i}"))).unwrap()).collect();
        m.add_constraint(z.iter().map(|&v| LinearExpr::from(v)).sum(), Sense::Eq, 1.0);
        m.set_objective(Direction::Maximize, 1.0 * z[0] + 5.0 * z[1] + 2.0 * z[2]);
        let s = BruteForceSolver::default().solve(&m).unwrap();
        assert_eq!(s.values(), &[0.0, 1.0, 0.0]);
        assert_eq!(s.objective(), 5.0);
    }

    #[test]
    fn test_continuous_follows_binary_bound() {
        let mut m = Model::new();
        let z = m.add_binary(None).unwrap();
        let x = m.add_continuous(0.0, 1.0, None).unwrap();
        m.add_constraint(LinearExpr::from(x) - z, Sense::Le, 0.0);
        m.set_objective(Direction::Maximize, 3.0 * x - LinearExpr::from(z));
        let s = BruteForceSolver::default().solve(&m).unwrap();
        assert_eq!(s.value(x), 1.0);
        assert_eq!(s.value(z), 1.0);
        assert_eq!(s.objective(), 2.0);
    }

    #[test]
    fn test_minimize() {
        let mut m = Model::new();
        let z = m.add_binary(None).unwrap();
        let x = m.add_continuous(0.0, 10.0, None).unwrap();
        m.add_constraint(LinearExpr::from(x) + 4.0 * z, Sense::Ge, 3.0);
        m.set_objective(Direction::Minimize, LinearExpr::from(x) + 2.0 * z);
        let s = BruteForceSolver::default().solve(&m).unwrap();
        assert_eq!(s.value(z), 1.0);
        assert_eq!(s.value(x), 0.0);
    }

    #[test]
    fn test_infeasible() {
        let mut m = Model::new();
        let z = m.add_binary(None).unwrap();
        m.add_constraint(LinearExpr::from(z), Sense::Ge, 2.0);
        assert_eq!(
            BruteForceSolver::default().solve(&m).unwrap_err(),
            SolverError::Infeasible
        );
    }

    #[test]
    fn test_too_large() {
        let mut m = Model::new();
        for _ in 0..12 {
            m.add_binary(None).unwrap();
        }
        let err = BruteForceSolver::new(1000, 1e-9).solve(&m).unwrap_err();
        assert_eq!(
            err,
            SolverError::TooLarge {
                assignments: 4096,
                limit: 1000
            }
        );
    }

    #[test]
    fn test_unbounded() {
        let mut m = Model::new();
        let x = m.add_continuous(0.0, f64::INFINITY, None).unwrap();
        m.set_objective(Direction::Maximize, LinearExpr::from(x));
        assert!(matches!(
            BruteForceSolver::default().solve(&m),
            Err(SolverError::Unsupported(_))
        ));
    }

    #[test]
    fn test_unpriced_continuous_meets_equality() {
        let mut m = Model::new();
        let z: Vec<_> = (0..2).map(|_| m.add_binary(None).unwrap()).collect();
        let x: Vec<_> = (0..2).map(|_| m.add_continuous(0.0, 1.0, None).unwrap()).collect();
        m.add_constraint(LinearExpr::from(z[0]) + z[1], Sense::Eq, 1.0);
        for k in 0..2 {
            m.add_constraint(LinearExpr::from(x[k]) - z[k], Sense::Le, 0.0);
        }
        m.add_constraint(LinearExpr::from(x[0]) + x[1], Sense::Eq, 1.0);
        m.set_objective(Direction::Maximize, 2.0 * z[1]);
        let s = BruteForceSolver::default().solve(&m).unwrap();
        assert_eq!(s.values(), &[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(s.objective(), 2.0);
    }
}
