//! Solving boundary.

use thiserror::Error;

use super::{Model, Solution};

/// Failures reported by a solver backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("model is infeasible")]
    Infeasible,

    #[error("model too large for this solver: {assignments} binary assignments exceed the limit of {limit}")]
    TooLarge { assignments: u128, limit: u64 },

    #[error("model not supported by this solver: {0}")]
    Unsupported(String),
}

impl SolverError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            SolverError::Infeasible => 300,
            SolverError::TooLarge { .. } => 301,
            SolverError::Unsupported(_) => 302,
        }
    }
}

/// A MILP solver backend.
pub trait Solver {
    /// Backend name for logs and reports.
    fn name(&self) -> &str;

    /// Find an optimal assignment of the model's variables.
    fn solve(&mut self, model: &Model) -> Result<Solution, SolverError>;
}
