//! Logging for the `dp-core` binary.
//!
//! Logs go to stderr, either as compact text or as JSON lines; stdout is
//! left to the command's report. Pipeline code logs through [`log_event!`],
//! which stamps every record with a stable event name, the run ID and the
//! pipeline stage:
//!
//! ```ignore
//! let ctx = LogContext::new(generate_run_id());
//! log_event!(ctx, INFO, event_names::SOLVE_FINISHED, Stage::Solve, "solved",
//!     objective = 31.0);
//! ```

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter directive limiting output to this workspace's crates.
pub fn filter_directive(level: LogLevel) -> String {
    format!("dp_core={level},dp_config={level}")
}

fn output_layer(config: &LogConfig) -> OutputLayer {
    match config.format {
        LogFormat::Jsonl => JsonlLayer::stderr().boxed(),
        LogFormat::Human => {
            let human = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                human.boxed()
            } else {
                human.without_time().boxed()
            }
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the level from `config`. Only the first
/// call has an effect.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.level)));
    let installed = tracing_subscriber::registry()
        .with(output_layer(config).with_filter(filter))
        .try_init();
    if installed.is_err() {
        tracing::debug!("subscriber already installed");
    }
}

/// `run-` followed by 12 hex digits.
pub fn generate_run_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &id[..12])
}

/// Log a named pipeline event with the context's run ID and a stage.
///
/// The level is one of `TRACE`, `DEBUG`, `INFO`, `WARN` or `ERROR`. The name
/// travels as the `event` field rather than as the target, so the
/// crate-scoped filter keeps working.
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, $level:ident, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)* $(,)?) => {
        tracing::event!(
            tracing::Level::$level,
            event = $event,
            run_id = %$ctx.run_id,
            stage = %$stage,
            $($key = $val,)*
            message = $msg,
        )
    };
}
