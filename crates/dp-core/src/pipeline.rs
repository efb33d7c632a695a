//! End-to-end runs: definition file to model, model to report.

use chrono::Utc;
use dp_config::{AnalysisSettings, DiagramFile, ObjectiveKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{
    ModelSummary, ObjectiveReport, SolveReport, StateProbabilities, StateProbabilityReport,
    StrategyReport, UtilityDistribution, UtilityReport, REPORT_SCHEMA_VERSION,
};
use crate::decision::{
    conditional_value_at_risk, expected_value, lazy_probability_cut, ConditionalValueAtRisk,
    DecisionStrategy, DecisionVariables, ExpectedValue, PathCompatibilityVariables,
};
use crate::diagram::InfluenceDiagram;
use crate::error::ModelError;
use crate::loader::compatibility_options;
use crate::model::{Direction, LinearExpr, Model, Solution};

/// Objective attached to a compiled model.
#[derive(Debug, Clone)]
pub enum Objective {
    ExpectedValue(ExpectedValue),
    ConditionalValueAtRisk(ConditionalValueAtRisk),
}

impl Objective {
    pub fn kind(&self) -> ObjectiveKind {
        match self {
            Objective::ExpectedValue(_) => ObjectiveKind::ExpectedValue,
            Objective::ConditionalValueAtRisk(_) => ObjectiveKind::ConditionalValueAtRisk,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Objective::ExpectedValue(_) => "expected_value",
            Objective::ConditionalValueAtRisk(_) => "conditional_value_at_risk",
        }
    }

    pub fn expr(&self) -> &LinearExpr {
        match self {
            Objective::ExpectedValue(ev) => ev.expr(),
            Objective::ConditionalValueAtRisk(cvar) => cvar.expr(),
        }
    }

    pub fn alpha(&self) -> Option<f64> {
        match self {
            Objective::ExpectedValue(_) => None,
            Objective::ConditionalValueAtRisk(cvar) => Some(cvar.alpha()),
        }
    }

    /// Objective value in the diagram's own utility units.
    pub fn value(&self, solution: &Solution) -> f64 {
        match self {
            Objective::ExpectedValue(ev) => ev.value(solution),
            Objective::ConditionalValueAtRisk(cvar) => cvar.value(solution),
        }
    }
}

/// A decision model built from a generated diagram.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    pub model: Model,
    pub decision_variables: DecisionVariables,
    pub compatibility_variables: PathCompatibilityVariables,
    pub objective: Objective,
    pub maximize: bool,
}

impl CompiledModel {
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            variables: self.model.num_variables(),
            binaries: self.model.num_binaries(),
            constraints: self.model.constraints().len(),
            decision_variables: self.decision_variables.len(),
            compatibility_variables: self.compatibility_variables.len(),
        }
    }

    /// Read the strategy a solution encodes.
    pub fn strategy(&self, solution: &Solution) -> Result<DecisionStrategy, ModelError> {
        self.decision_variables.decision_strategy(solution)
    }
}

/// Build decision variables, path-compatibility variables and the objective
/// the file's `model` section asks for.
pub fn compile(file: &DiagramFile, diagram: &InfluenceDiagram) -> Result<CompiledModel, ModelError> {
    let opts = &file.model;
    let options = compatibility_options(file, diagram)?;

    let mut model = Model::new();
    let z = DecisionVariables::new(&mut model, diagram, options.names)?;
    let x = PathCompatibilityVariables::new(&mut model, diagram, &z, &options)?;
    if opts.lazy_probability_cut {
        lazy_probability_cut(&mut model, diagram, &x);
    }

    let objective = match opts.objective.kind {
        ObjectiveKind::ExpectedValue => Objective::ExpectedValue(expected_value(diagram, &x)?),
        ObjectiveKind::ConditionalValueAtRisk => {
            let alpha = opts.objective.alpha.ok_or(ModelError::InvalidAlpha {
                alpha: f64::NAN,
                range: "(0, 1]",
            })?;
            Objective::ConditionalValueAtRisk(conditional_value_at_risk(&mut model, diagram, &x, alpha)?)
        }
    };
    let direction = if opts.objective.maximize {
        Direction::Maximize
    } else {
        Direction::Minimize
    };
    model.set_objective(direction, objective.expr().clone());

    info!(
        variables = model.num_variables(),
        binaries = model.num_binaries(),
        constraints = model.constraints().len(),
        paths = x.len(),
        objective = objective.name(),
        "model compiled"
    );
    Ok(CompiledModel {
        model,
        decision_variables: z,
        compatibility_variables: x,
        objective,
        maximize: opts.objective.maximize,
    })
}

/// Identifiers stamped onto a report.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: String,
    pub config_id: String,
    pub solver: String,
}

/// Strategy, state probabilities and utility distribution of a solution.
pub fn analyze(
    diagram: &InfluenceDiagram,
    compiled: &CompiledModel,
    solution: &Solution,
    settings: &AnalysisSettings,
    run: RunInfo,
) -> Result<SolveReport, ModelError> {
    let strategy = compiled.strategy(solution)?;
    let probabilities = StateProbabilities::new(diagram, &strategy)?;
    let mut distribution = UtilityDistribution::new(diagram, &strategy)?;
    if let Some(decimals) = settings.precision {
        distribution = distribution.with_precision(decimals);
    }

    Ok(SolveReport {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        run_id: run.run_id,
        generated_at: Utc::now(),
        config_id: run.config_id,
        solver: run.solver,
        model: compiled.summary(),
        objective: ObjectiveReport {
            kind: compiled.objective.name().to_string(),
            maximize: compiled.maximize,
            alpha: compiled.objective.alpha(),
            value: compiled.objective.value(solution),
        },
        strategy: StrategyReport::new(diagram, &strategy),
        state_probabilities: StateProbabilityReport::new(diagram, &probabilities),
        utility: UtilityReport::new(&distribution, &settings.risk_levels)?,
    })
}

/// Result of `dp-core check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CheckReport {
    pub schema_version: String,
    pub config_id: String,
    pub chance_nodes: usize,
    pub decision_nodes: usize,
    pub value_nodes: usize,
    /// Size of the full path space, or `None` on overflow.
    pub path_count: Option<u128>,
    /// Translation added to every path utility.
    pub translation: f64,
    pub model: ModelSummary,
}

impl CheckReport {
    pub fn new(diagram: &InfluenceDiagram, compiled: &CompiledModel, config_id: String) -> Self {
        let path_count = diagram
            .states()
            .iter()
            .try_fold(1u128, |acc, &n| acc.checked_mul(n as u128));
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            config_id,
            chance_nodes: diagram.chance_nodes().len(),
            decision_nodes: diagram.decision_nodes().len(),
            value_nodes: diagram.value_nodes().len(),
            path_count,
            translation: diagram.translation(),
            model: compiled.summary(),
        }
    }
}
