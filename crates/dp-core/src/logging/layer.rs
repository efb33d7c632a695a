//! JSONL rendering of tracing events.
//!
//! Each event becomes one line:
//!
//! ```text
//! {"ts":"…","level":"info","event":"solve.finished","run_id":"run-…","stage":"solve","message":"solved","fields":{"objective":31.0}}
//! ```
//!
//! `run_id` and `stage` come from the event itself or, failing that, from
//! the closest enclosing span that recorded them. The record name is the
//! event's `event` field, or its target when the field is absent.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record as SpanValues};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Field names lifted out of `fields` into the top level of a record.
const RUN_ID: &str = "run_id";
const STAGE: &str = "stage";
const EVENT: &str = "event";
const MESSAGE: &str = "message";

#[derive(Serialize)]
struct LogRecord {
    ts: String,
    level: &'static str,
    event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    fields: Map<String, Value>,
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Field values as JSON.
#[derive(Default)]
struct Fields(Map<String, Value>);

impl Fields {
    fn take_string(&mut self, name: &str) -> Option<String> {
        match self.0.remove(name)? {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::String(format!("{value:?}")));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // Utilities may be infinite; JSON numbers cannot be.
        let json = Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.0.insert(field.name().to_string(), json);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::Bool(value));
    }
}

/// Correlation values remembered on a span.
#[derive(Default)]
struct Correlation {
    run_id: Option<String>,
    stage: Option<String>,
}

impl Correlation {
    fn absorb(&mut self, mut fields: Fields) {
        if let Some(id) = fields.take_string(RUN_ID) {
            self.run_id = Some(id);
        }
        if let Some(stage) = fields.take_string(STAGE) {
            self.stage = Some(stage);
        }
    }
}

/// Tracing layer that writes one JSON object per event.
pub struct JsonlLayer<W = io::Stderr> {
    out: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        let mut correlation = Correlation::default();
        correlation.absorb(fields);
        span.extensions_mut().insert(correlation);
    }

    fn on_record(&self, id: &Id, values: &SpanValues<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Fields::default();
        values.record(&mut fields);
        let mut extensions = span.extensions_mut();
        if let Some(correlation) = extensions.get_mut::<Correlation>() {
            correlation.absorb(fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);

        let mut run_id = fields.take_string(RUN_ID);
        let mut stage = fields.take_string(STAGE);
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if run_id.is_some() && stage.is_some() {
                    break;
                }
                if let Some(c) = span.extensions().get::<Correlation>() {
                    if run_id.is_none() {
                        run_id.clone_from(&c.run_id);
                    }
                    if stage.is_none() {
                        stage.clone_from(&c.stage);
                    }
                }
            }
        }

        let metadata = event.metadata();
        let record = LogRecord {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level_name(metadata.level()),
            event: fields
                .take_string(EVENT)
                .unwrap_or_else(|| metadata.target().to_string()),
            run_id,
            stage,
            message: fields.take_string(MESSAGE),
            fields: fields.0,
        };
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
        }
    }
}
