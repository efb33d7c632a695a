//! Solver and analysis settings.
//!
//! Settings are independent of any particular diagram: they bound how much
//! work the reference solver may do and which risk levels reports include.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::resolve::SettingsPath;
use crate::validate::{validate_settings, ValidationError, ValidationResult};

/// Complete settings file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    pub schema_version: String,

    #[serde(default)]
    pub solver: SolverSettings,

    #[serde(default)]
    pub analysis: AnalysisSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            solver: SolverSettings::default(),
            analysis: AnalysisSettings::default(),
        }
    }
}

fn default_max_assignments() -> u64 {
    1 << 20
}

fn default_tolerance() -> f64 {
    1e-9
}

/// Limits for the enumerating reference solver.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SolverSettings {
    /// Maximum number of binary assignments to enumerate.
    #[serde(default = "default_max_assignments")]
    pub max_assignments: u64,

    /// Feasibility tolerance for constraint checks.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_assignments: default_max_assignments(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_risk_levels() -> Vec<f64> {
    vec![0.05, 0.1, 0.2]
}

/// Options for post-solve reports.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisSettings {
    /// Probability levels at which VaR and CVaR are reported.
    #[serde(default = "default_risk_levels")]
    pub risk_levels: Vec<f64>,

    /// Round utilities to this many decimals before grouping.
    #[serde(default)]
    pub precision: Option<u32>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            risk_levels: default_risk_levels(),
            precision: None,
        }
    }
}

/// Load settings from a resolved path, falling back to defaults.
///
/// Returns the settings together with the raw text (for snapshot hashing).
pub fn load_settings(resolved: &SettingsPath) -> ValidationResult<(Settings, Option<String>)> {
    let Some(path) = resolved.path.as_deref() else {
        return Ok((Settings::default(), None));
    };
    let (settings, text) = read_settings(path)?;
    validate_settings(&settings)?;
    Ok((settings, Some(text)))
}

fn read_settings(path: &Path) -> ValidationResult<(Settings, String)> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
    let settings = if path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
    {
        toml::from_str(&text).map_err(|e| ValidationError::ParseError(e.to_string()))?
    } else {
        serde_json::from_str(&text).map_err(|e| ValidationError::ParseError(e.to_string()))?
    };
    Ok((settings, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ConfigSource;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.schema_version, crate::CONFIG_SCHEMA_VERSION);
        assert_eq!(s.solver.max_assignments, 1 << 20);
        assert_eq!(s.analysis.risk_levels, vec![0.05, 0.1, 0.2]);
        assert!(s.analysis.precision.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"schema_version": "1.0.0", "solver": {"tolerance": 1e-6}}"#)
                .unwrap();
        assert_eq!(s.solver.tolerance, 1e-6);
        assert_eq!(s.solver.max_assignments, 1 << 20);
        assert_eq!(s.analysis.risk_levels.len(), 3);
    }

    #[test]
    fn test_load_without_path_is_default() {
        let (s, text) = load_settings(&SettingsPath::default()).unwrap();
        assert!(text.is_none());
        assert_eq!(s.solver.max_assignments, 1 << 20);
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "schema_version = \"1.0.0\"\n[analysis]\nrisk_levels = [0.25]").unwrap();

        let resolved = SettingsPath {
            path: Some(path),
            source: ConfigSource::CliArgument,
        };
        let (s, text) = load_settings(&resolved).unwrap();
        assert_eq!(s.analysis.risk_levels, vec![0.25]);
        assert!(text.unwrap().contains("risk_levels"));
    }

    #[test]
    fn test_load_rejects_bad_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"schema_version": "1.0.0", "analysis": {"risk_levels": [1.5]}}"#,
        )
        .unwrap();
        let resolved = SettingsPath {
            path: Some(path),
            source: ConfigSource::CliArgument,
        };
        let err = load_settings(&resolved).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }
}
