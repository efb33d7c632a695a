//! JSON Schema generation for input files and report payloads.
//!
//! ```bash
//! dp-core schema --list
//! dp-core schema DiagramFile
//! dp-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::analysis::report::{
    LocalStrategyReport, NodeDistribution, StateProbability, StrategyRule, UtilityPoint,
};
pub use crate::analysis::{
    ModelSummary, ObjectiveReport, RiskMeasure, SolveReport, StateProbabilityReport,
    StrategyReport, UtilityReport, UtilityStatistics,
};
pub use crate::pipeline::CheckReport;
pub use dp_config::{DiagramFile, Settings};

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Inputs
        ("DiagramFile", "Influence diagram definition file"),
        ("Settings", "Solver and analysis settings file"),
        // Reports
        ("CheckReport", "Validation summary of a diagram and its model"),
        ("SolveReport", "Strategy, state probabilities and risk of a solution"),
        ("ModelSummary", "Variable and constraint counts of a model"),
        ("ObjectiveReport", "Objective kind and value"),
        ("StrategyReport", "Decision strategy with state names"),
        ("StateProbabilityReport", "Marginal state distributions under a strategy"),
        ("UtilityReport", "Utility distribution, statistics and risk measures"),
        ("UtilityStatistics", "Moments and range of a utility distribution"),
        ("RiskMeasure", "Value-at-risk and CVaR at one level"),
    ]
}

/// Generate JSON Schema for a type by name.
///
/// Returns `None` if the type is unknown.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "DiagramFile" => schema_for!(DiagramFile),
        "Settings" => schema_for!(Settings),
        "CheckReport" => schema_for!(CheckReport),
        "SolveReport" => schema_for!(SolveReport),
        "ModelSummary" => schema_for!(ModelSummary),
        "ObjectiveReport" => schema_for!(ObjectiveReport),
        "StrategyReport" => schema_for!(StrategyReport),
        "StateProbabilityReport" => schema_for!(StateProbabilityReport),
        "UtilityReport" => schema_for!(UtilityReport),
        "UtilityStatistics" => schema_for!(UtilityStatistics),
        "RiskMeasure" => schema_for!(RiskMeasure),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}

/// Generate all schemas as a map from type name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    available_schemas()
        .into_iter()
        .filter_map(|(name, _)| generate_schema(name).map(|s| (name.to_string(), s)))
        .collect()
}
