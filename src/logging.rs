use std::fs::OpenOptions;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive, e.g. `threadpick=debug`
pub const LOG_ENV: &str = "THREADPICK_LOG";
/// Append logs to this file instead of stderr
pub const LOG_FILE_ENV: &str = "THREADPICK_LOG_FILE";

const DEFAULT_FILTER: &str = "threadpick=info";

/// Install the global subscriber.
///
/// While the selector owns the terminal, anything written to stderr lands on
/// the alternate screen; set `THREADPICK_LOG_FILE` to keep debug output.
pub fn init() -> Result<()> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var_os(LOG_FILE_ENV) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.to_string_lossy()))?;
            registry
                .with(fmt::layer().with_writer(file).with_ansi(false).with_target(true))
                .init();
        }
        None => {
            registry
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .init();
        }
    }
    Ok(())
}
