//! Where log output goes and how much of it there is.
//!
//! Precedence, lowest first: built-in defaults, `DP_LOG` / `DP_LOG_FORMAT`,
//! then command-line flags. `RUST_LOG` bypasses all of this and is read
//! directly by the filter in [`super::init_logging`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Environment variable holding the level name.
pub const LEVEL_ENV: &str = "DP_LOG";
/// Environment variable holding the format name.
pub const FORMAT_ENV: &str = "DP_LOG_FORMAT";

/// Rendering of log records on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact text for terminals.
    #[default]
    #[value(alias = "pretty")]
    Human,
    /// One JSON object per line.
    #[value(alias = "json")]
    Jsonl,
}

/// Verbosity threshold.
///
/// Ordered from most to least verbose; `Warn` is the default because
/// stdout already carries the command's payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    #[value(alias = "warning")]
    Warn,
    Error,
    #[value(alias = "quiet")]
    Off,
}

impl LogLevel {
    /// Level selected by `-q` and repeated `-v` flags, if any.
    pub fn from_flags(verbose: u8, quiet: bool) -> Option<Self> {
        match (quiet, verbose) {
            (true, _) => Some(LogLevel::Error),
            (false, 0) => None,
            (false, 1) => Some(LogLevel::Info),
            (false, 2) => Some(LogLevel::Debug),
            (false, _) => Some(LogLevel::Trace),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

/// Parse a level or format name case-insensitively, accepting aliases.
fn parse_name<T: ValueEnum>(raw: &str) -> Option<T> {
    T::from_str(raw.trim(), true).ok()
}

/// Resolved logging setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Prefix human output with a timestamp.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Human,
            level: LogLevel::Warn,
            timestamps: false,
        }
    }
}

impl LogConfig {
    /// Read `DP_LOG` and `DP_LOG_FORMAT`, then apply flag overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// Resolve against an arbitrary variable lookup.
    ///
    /// Unrecognized variable values fall back to the defaults instead of
    /// failing the run.
    pub fn resolve<F>(lookup: F, cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let level = cli_level
            .or_else(|| lookup(LEVEL_ENV).as_deref().and_then(parse_name))
            .unwrap_or(defaults.level);
        let format = cli_format
            .or_else(|| lookup(FORMAT_ENV).as_deref().and_then(parse_name))
            .unwrap_or(defaults.format);
        Self {
            format,
            level,
            // Timestamps help when reading a scrollback, less so for one-shot runs.
            timestamps: level <= LogLevel::Debug,
        }
    }
}
