//! Decision Programming Core Library
//!
//! This library turns influence diagrams into mixed-integer linear programs:
//! - Influence diagram assembly, validation and generation
//! - Path enumeration with fixed and forbidden states
//! - Decision and path-compatibility variables over an in-crate model
//! - Expected-value and CVaR objectives
//! - LP export, solution import and an exhaustive reference solver
//! - Post-solve analysis: state probabilities, utility distributions, risk
//!
//! The binary entry point is in `main.rs`.

pub mod analysis;
pub mod decision;
pub mod diagram;
pub mod error;
pub mod exit_codes;
pub mod loader;
pub mod logging;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod schema;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use diagram::{GenerateOptions, InfluenceDiagram, Node, NodeKind, PathUtility, State, StateRef};
pub use error::{DiagramError, ModelError};
pub use model::{BruteForceSolver, Model, Solution, Solver, SolverError};
