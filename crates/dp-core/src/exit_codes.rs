//! Exit codes for the dp-core CLI.
//!
//! Exit code ranges:
//! - 0-2: Outcomes of a completed run (parse outcome from code, not output)
//! - 10-19: Input errors (recoverable by fixing the diagram, settings or flags)
//! - 20-29: Internal errors (bugs, should be reported)

use dp_config::ValidationError;

use crate::error::{DiagramError, ModelError};
use crate::model::SolverError;

/// Exit codes for dp-core commands.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Outcomes (0-2)
    // ========================================================================
    /// Success: diagram valid, model written or solved
    Clean = 0,

    /// The model has no feasible assignment
    Infeasible = 1,

    /// The bundled solver declined the model (too large or unsupported)
    SolverLimit = 2,

    // ========================================================================
    // Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Diagram or settings file could not be parsed or failed validation
    ConfigError = 11,

    /// Diagram rejected while being built (shapes, cycles, probabilities)
    DiagramError = 12,

    /// Model options or solution file rejected
    ModelError = 13,

    /// Schema version mismatch
    VersionError = 14,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 0-2 describe how a run ended rather than a failure.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::Infeasible => "ERR_INFEASIBLE",
            ExitCode::SolverLimit => "ERR_SOLVER_LIMIT",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DiagramError => "ERR_DIAGRAM",
            ExitCode::ModelError => "ERR_MODEL",
            ExitCode::VersionError => "ERR_VERSION",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

impl From<&ValidationError> for ExitCode {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::IoError(_) => ExitCode::IoError,
            ValidationError::VersionMismatch { .. } => ExitCode::VersionError,
            _ => ExitCode::ConfigError,
        }
    }
}

impl From<&DiagramError> for ExitCode {
    fn from(_: &DiagramError) -> Self {
        ExitCode::DiagramError
    }
}

impl From<&ModelError> for ExitCode {
    fn from(err: &ModelError) -> Self {
        match err {
            ModelError::Diagram(e) => e.into(),
            _ => ExitCode::ModelError,
        }
    }
}

impl From<&SolverError> for ExitCode {
    fn from(err: &SolverError) -> Self {
        match err {
            SolverError::Infeasible => ExitCode::Infeasible,
            SolverError::TooLarge { .. } | SolverError::Unsupported(_) => ExitCode::SolverLimit,
        }
    }
}
