//! Tracing setup.
//!
//! Mirrors `arti-relay`'s pre-config stderr logger: an `EnvFilter` seeded
//! from the configured [`LogLevel`], overridable on the command line, writing
//! plain formatted spans to stderr. Unlike `arti`'s own `trace::setup_logging`
//! this never reaches for journald or rotating log files — a single
//! operator-facing stream is all this server's ambient observability
//! needs.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use panorama_config::LogLevel;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber. `cli_override`, if present, wins
/// over the configured [`LogLevel`].
pub(crate) fn init(configured: LogLevel, cli_override: Option<&str>) -> Result<()> {
    let directive = match cli_override {
        Some(level) => level.to_string(),
        None => configured.as_tracing_level().to_string(),
    };
    let filter = EnvFilter::builder()
        .with_default_directive(configured.as_tracing_level().into())
        .parse(&directive)
        .with_context(|| format!("parsing log level {directive:?}"))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing the global tracing subscriber")
}
