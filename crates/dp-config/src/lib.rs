//! Decision programming configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for diagram definition files (JSON or TOML)
//! - Solver and analysis settings with resolution (CLI → env → XDG → defaults)
//! - Semantic validation of diagram files and settings
//! - Config snapshots that pin the exact inputs of a run

pub mod diagram;
pub mod resolve;
pub mod settings;
pub mod snapshot;
pub mod validate;

pub use diagram::{
    load_diagram_file, DiagramFile, ForbiddenPathSpec, GenerateSpec, ModelSpec, NodeKindSpec,
    NodeSpec, ObjectiveKind, ObjectiveSpec, StateRefSpec, TensorValue,
};
pub use resolve::{resolve_settings, ConfigSource, SettingsPath};
pub use settings::{load_settings, AnalysisSettings, Settings, SolverSettings};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_diagram_file, validate_settings, ValidationError, ValidationResult};

/// Schema version for diagram and settings files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
