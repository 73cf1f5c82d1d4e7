//! Log output of the deployer binaries.
//!
//! Logs and the report share a terminal, so log lines always go to stderr
//! and stdout stays reserved for the summary. `RUST_LOG` overrides the level
//! picked from `--verbose`.

use std::io::IsTerminal;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Level filter from `RUST_LOG`, or `fallback` when it is unset or invalid.
pub fn level_filter(fallback: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback.as_str()))
}

/// Subscriber writing human-readable or newline-delimited JSON lines to
/// `writer`. Targets are omitted; every event already carries its pipeline.
pub fn build_subscriber<W>(
    json: bool,
    ansi: bool,
    filter: EnvFilter,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_target(false)
        .with_ansi(ansi && !json)
        .with_writer(writer);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        Box::new(registry.with(layer.json()))
    } else {
        Box::new(registry.with(layer))
    }
}

/// Install the process-wide subscriber writing to stderr.
///
/// Only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let ansi = std::io::stderr().is_terminal();
    let subscriber = build_subscriber(json, ansi, level_filter(level), std::io::stderr);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
