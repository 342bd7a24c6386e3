use std::time::Duration;
use tracing::{Span, field};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Correlation id carried by every log line of one batch run.
#[derive(Clone, Debug)]
pub struct TraceId(String);

impl TraceId {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { LogFormat::Json } else { LogFormat::Pretty }
    }
}

pub fn init_tracing(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Span close events carry the per-lead timing.
    let base = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(base.json().flatten_event(true))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(base.compact())
            .init(),
    }
}

pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "root",
        name = %name,
        trace_id = %trace_id.as_str(),
        source_file = field::Empty
    )
}

pub fn child_span(name: &'static str, lead_index: usize) -> Span {
    tracing::info_span!(
        "child",
        name = %name,
        lead_index = lead_index,
        category = field::Empty
    )
}

/// Record whichever of these fields the current span declares.
pub fn annotate_span(source_file: Option<&str>, category: Option<&str>) {
    let span = Span::current();
    if let Some(file) = source_file {
        span.record("source_file", field::display(file));
    }
    if let Some(cat) = category {
        span.record("category", field::display(cat));
    }
}

pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = std::time::Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
