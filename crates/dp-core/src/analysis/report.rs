//! Serializable reports of solved models.
//!
//! These types are the JSON payloads of the CLI and are published as JSON
//! Schemas through `dp-core schema`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{RiskMeasure, StateProbabilities, UtilityDistribution, UtilityStatistics};
use crate::decision::DecisionStrategy;
use crate::diagram::{InfluenceDiagram, NodeKind};
use crate::error::ModelError;

/// Schema version of report payloads.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// One rule of a local strategy: observed parent states and the choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StrategyRule {
    pub information_state: Vec<String>,
    pub choice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LocalStrategyReport {
    pub node: String,
    pub information_set: Vec<String>,
    pub rules: Vec<StrategyRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StrategyReport {
    pub decisions: Vec<LocalStrategyReport>,
}

impl StrategyReport {
    /// Render a strategy with state names.
    pub fn new(diagram: &InfluenceDiagram, strategy: &DecisionStrategy) -> Self {
        let decisions = strategy
            .locals()
            .iter()
            .map(|local| {
                let parents: Vec<_> = local
                    .information_set()
                    .iter()
                    .map(|&p| &diagram.nodes()[p])
                    .collect();
                let own = &diagram.nodes()[local.node()];
                LocalStrategyReport {
                    node: local.name().to_string(),
                    information_set: parents.iter().map(|n| n.name().to_string()).collect(),
                    rules: local
                        .iter()
                        .map(|(information_state, choice)| StrategyRule {
                            information_state: information_state
                                .iter()
                                .zip(&parents)
                                .map(|(&s, n)| n.states()[s].clone())
                                .collect(),
                            choice: own.states()[choice].clone(),
                        })
                        .collect(),
                }
            })
            .collect();
        Self { decisions }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StateProbability {
    pub state: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodeDistribution {
    pub node: String,
    pub kind: NodeKind,
    pub states: Vec<StateProbability>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StateProbabilityReport {
    pub nodes: Vec<NodeDistribution>,
}

impl StateProbabilityReport {
    pub fn new(diagram: &InfluenceDiagram, probabilities: &StateProbabilities) -> Self {
        let nodes = probabilities
            .iter()
            .zip(diagram.nodes())
            .map(|((name, dist), node)| NodeDistribution {
                node: name.to_string(),
                kind: node.kind(),
                states: node
                    .states()
                    .iter()
                    .zip(dist)
                    .map(|(state, &probability)| StateProbability {
                        state: state.clone(),
                        probability,
                    })
                    .collect(),
            })
            .collect();
        Self { nodes }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UtilityPoint {
    pub utility: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UtilityReport {
    pub outcomes: Vec<UtilityPoint>,
    pub statistics: UtilityStatistics,
    pub risk: Vec<RiskMeasure>,
}

impl UtilityReport {
    pub fn new(distribution: &UtilityDistribution, risk_levels: &[f64]) -> Result<Self, ModelError> {
        Ok(Self {
            outcomes: distribution
                .iter()
                .map(|(utility, probability)| UtilityPoint {
                    utility,
                    probability,
                })
                .collect(),
            statistics: distribution.statistics()?,
            risk: distribution.risk_measures(risk_levels)?,
        })
    }
}

/// Size of a compiled model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelSummary {
    pub variables: usize,
    pub binaries: usize,
    pub constraints: usize,
    pub decision_variables: usize,
    pub compatibility_variables: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectiveReport {
    /// `expected_value` or `conditional_value_at_risk`.
    pub kind: String,
    pub maximize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    /// Objective value with translation and scaling removed.
    pub value: f64,
}

/// Full result of `dp-core solve` and `dp-core analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SolveReport {
    pub schema_version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    /// Combined hash of the diagram and settings inputs.
    pub config_id: String,
    pub solver: String,
    pub model: ModelSummary,
    pub objective: ObjectiveReport,
    pub strategy: StrategyReport,
    pub state_probabilities: StateProbabilityReport,
    pub utility: UtilityReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{used_car, used_car_strategy};

    #[test]
    fn test_strategy_report_uses_state_names() {
        let d = used_car();
        let report = StrategyReport::new(&d, &used_car_strategy(&d));
        assert_eq!(report.decisions.len(), 2);
        let t = &report.decisions[0];
        assert_eq!(t.node, "T");
        assert!(t.information_set.is_empty());
        assert_eq!(t.rules[0].choice, "test");
        let a = &report.decisions[1];
        assert_eq!(a.information_set, vec!["R"]);
        assert_eq!(a.rules[1].information_state, vec!["lemon"]);
        assert_eq!(a.rules[1].choice, "buy with guarantee");
        assert_eq!(a.rules[2].choice, "buy without guarantee");
    }

    #[test]
    fn test_state_probability_report() {
        let d = used_car();
        let sp = StateProbabilities::new(&d, &used_car_strategy(&d)).unwrap();
        let report = StateProbabilityReport::new(&d, &sp);
        assert_eq!(report.nodes.len(), 4);
        assert_eq!(report.nodes[1].kind, NodeKind::Decision);
        assert_eq!(report.nodes[1].states[1].state, "test");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["nodes"][0]["node"], "O");
    }

    #[test]
    fn test_utility_report() {
        let dist = UtilityDistribution::from_points(vec![(15.0, 0.2), (35.0, 0.8)]);
        let report = UtilityReport::new(&dist, &[0.2]).unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.risk[0].value_at_risk, 15.0);
        assert!(UtilityReport::new(&dist, &[2.0]).is_err());
    }
}
