//! Decision model construction: variables, objectives and strategies.
//!
//! Building a model from a generated diagram:
//!
//! ```ignore
//! let mut model = Model::new();
//! let z = DecisionVariables::new(&mut model, &diagram, true)?;
//! let x = PathCompatibilityVariables::new(&mut model, &diagram, &z, &options)?;
//! let ev = expected_value(&diagram, &x)?;
//! model.set_objective(Direction::Maximize, ev.expr().clone());
//! let solution = solver.solve(&model)?;
//! let strategy = z.decision_strategy(&solution)?;
//! ```

pub mod compatibility;
pub mod expressions;
pub mod objective;
pub mod strategy;
pub mod variables;

pub use compatibility::{lazy_probability_cut, PathCompatibilityOptions, PathCompatibilityVariables};
pub use expressions::PathExpressions;
pub use objective::{conditional_value_at_risk, expected_value, ConditionalValueAtRisk, ExpectedValue};
pub use strategy::{DecisionStrategy, LocalDecisionStrategy};
pub use variables::{DecisionVariables, LocalDecisionVariables, ACTIVE_THRESHOLD};
