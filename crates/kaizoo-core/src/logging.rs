//! Tracing subscriber setup.

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogConfig, paths};

/// Environment variable overriding `[log] filter`.
pub const LOG_ENV: &str = "KAIZOO_LOG";

/// Picks the filter directive: env > config > default.
fn filter_directive(env_value: Option<&str>, config: &LogConfig) -> String {
    env_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| Some(config.filter.trim()).filter(|v| !v.is_empty()))
        .unwrap_or(crate::config::Config::DEFAULT_LOG_FILTER)
        .to_string()
}

/// Installs the global subscriber: stderr always, plus a daily-rolling file
/// under `$KAIZOO_HOME/logs` when `[log] file = true`.
///
/// Keep the returned guard alive for the lifetime of the process, otherwise
/// buffered file output is dropped.
///
/// # Errors
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let directive = filter_directive(std::env::var(LOG_ENV).ok().as_deref(), config);
    let filter = EnvFilter::try_new(&directive).map_err(|e| anyhow!(e))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = if config.file {
        let appender = tracing_appender::rolling::daily(paths::logs_dir(), "kaizoo.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(guard)
}
