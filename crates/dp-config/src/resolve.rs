//! Settings resolution and path discovery.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths → defaults.

use std::path::{Path, PathBuf};

/// A discovered settings file.
#[derive(Debug, Clone, Default)]
pub struct SettingsPath {
    /// Path to the settings file (or None if not found).
    pub path: Option<PathBuf>,

    /// Where the path came from (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_SETTINGS_PATH: &str = "DP_SETTINGS";
pub const ENV_CONFIG_DIR: &str = "DP_CONFIG_DIR";

/// Candidate file names inside a config directory, in preference order.
const SETTINGS_FILENAMES: [&str; 2] = ["settings.json", "settings.toml"];

/// Application name for XDG directories.
const APP_NAME: &str = "decision-programming";

/// Resolve the settings file path.
///
/// Resolution order:
/// 1. Explicit CLI path (if it exists)
/// 2. `DP_SETTINGS` environment variable
/// 3. `DP_CONFIG_DIR` environment variable + file name
/// 4. XDG config directory (~/.config/decision-programming/)
/// 5. Built-in defaults (None)
pub fn resolve_settings(cli_path: Option<&Path>) -> SettingsPath {
    resolve_with(
        cli_path,
        std::env::var(ENV_SETTINGS_PATH).ok().map(PathBuf::from),
        std::env::var(ENV_CONFIG_DIR).ok().map(PathBuf::from),
        xdg_config_dir(),
    )
}

fn resolve_with(
    cli_path: Option<&Path>,
    env_path: Option<PathBuf>,
    env_dir: Option<PathBuf>,
    xdg_dir: Option<PathBuf>,
) -> SettingsPath {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.exists() {
            return SettingsPath {
                path: Some(path.to_path_buf()),
                source: ConfigSource::CliArgument,
            };
        }
    }

    // 2. Environment variable (direct path)
    if let Some(path) = env_path {
        if path.exists() {
            return SettingsPath {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    // 3. Environment variable (config dir)
    if let Some(path) = env_dir.as_deref().and_then(find_in_dir) {
        return SettingsPath {
            path: Some(path),
            source: ConfigSource::Environment,
        };
    }

    // 4. XDG config directory
    if let Some(path) = xdg_dir.as_deref().and_then(find_in_dir) {
        return SettingsPath {
            path: Some(path),
            source: ConfigSource::XdgConfig,
        };
    }

    // 5. Built-in default
    SettingsPath::default()
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    SETTINGS_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Get the XDG config directory for decision-programming.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
