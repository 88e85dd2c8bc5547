//! Tracing setup shared by the service binary.
//!
//! One fmt layer renders events from the workspace crates with RFC3339 UTC
//! timestamps and source locations; everything else (hyper, reqwest, tower)
//! goes through the plain global layer filtered by `RUST_LOG`.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Targets (crate names) rendered by [`layer`].
pub const WORKSPACE_TARGETS: &[&str] = &[
    "ai_llm_service",
    "rag_store",
    "web_search",
    "contextor",
    "api",
    "aven_chat_backend",
];

/// RFC3339 UTC timer, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

fn is_workspace_target(target: &str) -> bool {
    WORKSPACE_TARGETS.iter().any(|p| target.starts_with(p))
}

/// Formatting layer for events emitted by the workspace crates only.
///
/// Compact single-line output with `file:line`, span close durations and
/// ANSI colours only when stdout is a terminal.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();
    let only_ours = filter::filter_fn(|meta| is_workspace_target(meta.target()));

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_ours)
}

/// Level directive for one target, e.g. `contextor=debug`.
///
/// Returns `None` if the target is not a valid directive.
pub fn level_directive(target: &str, level: Level) -> Option<Directive> {
    Directive::from_str(&format!("{target}={}", level.as_str().to_lowercase())).ok()
}

/// `RUST_LOG` if set, otherwise `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global subscriber: env filter, workspace layer and a
/// target-less layer for third-party crates.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init(default_filter: &str) -> Result<(), TryInitError> {
    let others = fmt::layer()
        .with_target(true)
        .with_filter(filter::filter_fn(|meta| !is_workspace_target(meta.target())));

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(layer())
        .with(others)
        .try_init()
}
