//! File logging. The terminal belongs to the UI, so tracing output goes to a
//! daily rolling file instead.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{FleetError, Result};

/// Environment variable holding the tracing filter directives.
pub const LOG_ENV: &str = "FLEETDASH_LOG";
const LOG_FILE_PREFIX: &str = "fleetdash.log";

/// `$XDG_STATE_HOME/fleetdash`, else `~/.local/state/fleetdash`, else `./.fleetdash`.
pub fn default_log_dir() -> PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(state).join("fleetdash");
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".local").join("state").join("fleetdash"),
        None => PathBuf::from(".fleetdash"),
    }
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the guard alive for the whole run so
/// buffered lines are flushed on exit.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir).map_err(|source| FleetError::ConfigRead {
        path: dir.display().to_string(),
        source,
    })?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .init();
    Ok(guard)
}
