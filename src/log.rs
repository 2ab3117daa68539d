//! Structured logging for debugging depscope.
//!
//! The terminal belongs to the dashboard, so all diagnostics go to
//! `~/.depscope/depscope.log` (truncated on startup).
//!
//! Filter precedence:
//! - `DEPSCOPE_LOG` (EnvFilter syntax, e.g. `depscope=trace`)
//! - `--debug` flag or `DEPSCOPE_DEBUG=1` ⇒ `debug`
//! - otherwise `info`

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::{Error, Result};

const LOG_FILE: &str = "depscope.log";
const FILTER_ENV: &str = "DEPSCOPE_LOG";
const DEBUG_ENV: &str = "DEPSCOPE_DEBUG";

/// Check whether debug mode was requested through the environment.
pub fn debug_from_env() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Resolve the filter directive for the given debug setting.
pub fn filter_directive(debug: bool) -> String {
    if let Ok(directive) = std::env::var(FILTER_ENV) {
        if !directive.trim().is_empty() {
            return directive;
        }
    }
    if debug || debug_from_env() {
        "debug".to_string()
    } else {
        "info".to_string()
    }
}

/// Path of the log file.
pub fn log_path() -> Result<PathBuf> {
    Ok(Config::app_dir()?.join(LOG_FILE))
}

/// Initialize logging to ~/.depscope/depscope.log.
///
/// The returned guard flushes the background writer on drop and must be
/// held for the lifetime of the process.
pub fn init(debug: bool) -> Result<WorkerGuard> {
    let dir = Config::app_dir()?;
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(LOG_FILE), "")?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directive(debug)))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    Ok(guard)
}
