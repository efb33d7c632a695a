//! Post-solve analysis of a decision strategy.

pub mod report;
pub mod risk;
pub mod state_probabilities;
pub mod utility_distribution;

pub use report::{
    ModelSummary, ObjectiveReport, SolveReport, StateProbabilityReport, StrategyReport,
    UtilityReport, REPORT_SCHEMA_VERSION,
};
pub use risk::{RiskMeasure, UtilityStatistics};
pub use state_probabilities::StateProbabilities;
pub use utility_distribution::UtilityDistribution;
