//! Event vocabulary: pipeline stages, event names and the per-run context.

use serde::{Deserialize, Serialize};

/// Stages of a `dp-core` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and settings resolution.
    Init,
    /// Reading and building the diagram.
    Assemble,
    /// Building the decision model.
    Compile,
    Solve,
    /// Reading a strategy out of a solution.
    Extract,
    Analyze,
    /// Writing LP files and reports.
    Export,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Init,
        Stage::Assemble,
        Stage::Compile,
        Stage::Solve,
        Stage::Extract,
        Stage::Analyze,
        Stage::Export,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Assemble => "assemble",
            Stage::Compile => "compile",
            Stage::Solve => "solve",
            Stage::Extract => "extract",
            Stage::Analyze => "analyze",
            Stage::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable event names, `<stage>.<what>`.
///
/// Scripts filter JSONL output on these; renaming one is a breaking change.
pub mod event_names {
    pub const RUN_STARTED: &str = "init.run_started";
    pub const RUN_FINISHED: &str = "init.run_finished";

    pub const CONFIG_LOADED: &str = "init.settings_loaded";
    pub const CONFIG_DEFAULT_USED: &str = "init.settings_default";
    pub const CONFIG_ERROR: &str = "init.config_error";

    pub const DIAGRAM_LOADED: &str = "assemble.diagram_loaded";
    pub const DIAGRAM_GENERATED: &str = "assemble.diagram_generated";

    pub const MODEL_COMPILED: &str = "compile.model_compiled";

    pub const SOLVE_STARTED: &str = "solve.started";
    pub const SOLVE_FINISHED: &str = "solve.finished";

    pub const SOLUTION_LOADED: &str = "extract.solution_loaded";
    pub const STRATEGY_EXTRACTED: &str = "extract.strategy";

    pub const ANALYSIS_FINISHED: &str = "analyze.finished";

    pub const LP_WRITTEN: &str = "export.lp_written";
    pub const REPORT_WRITTEN: &str = "export.report_written";

    pub const INTERNAL_ERROR: &str = "init.internal_error";

    /// Every name above.
    pub const ALL: [&str; 16] = [
        RUN_STARTED,
        RUN_FINISHED,
        CONFIG_LOADED,
        CONFIG_DEFAULT_USED,
        CONFIG_ERROR,
        DIAGRAM_LOADED,
        DIAGRAM_GENERATED,
        MODEL_COMPILED,
        SOLVE_STARTED,
        SOLVE_FINISHED,
        SOLUTION_LOADED,
        STRATEGY_EXTRACTED,
        ANALYSIS_FINISHED,
        LP_WRITTEN,
        REPORT_WRITTEN,
        INTERNAL_ERROR,
    ];
}

/// Identity of one CLI invocation, attached to its events.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    /// Span carrying the run ID, so that events logged inside library code
    /// are correlated with the run as well.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("dp_core", run_id = %self.run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }

    #[test]
    fn test_event_names_start_with_a_stage() {
        let stages: HashSet<&str> = Stage::ALL.iter().map(|s| s.as_str()).collect();
        for name in event_names::ALL {
            let (prefix, rest) = name.split_once('.').unwrap();
            assert!(stages.contains(prefix), "{name}");
            assert!(!rest.is_empty());
        }
    }

    #[test]
    fn test_event_names_unique() {
        let unique: HashSet<_> = event_names::ALL.iter().collect();
        assert_eq!(unique.len(), event_names::ALL.len());
    }

    #[test]
    fn test_context_keeps_run_id() {
        let ctx = LogContext::new("run-abc");
        assert_eq!(ctx.run_id, "run-abc");
    }
}
