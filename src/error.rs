use std::io;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors produced by the collaborators and the terminal layer.
///
/// Every async unit hands one of these back to the reducer inside its
/// completion message; nothing unwinds across the async boundary.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program} {action} failed: {stderr}")]
    CommandFailed {
        program: &'static str,
        action: String,
        stderr: String,
    },

    #[error("parsing {context}: {source}")]
    Parse {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("invalid {what}: {value}")]
    Invalid { what: &'static str, value: String },

    #[error("reading {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("terminal I/O: {0}")]
    Terminal(#[from] io::Error),
}

impl FleetError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid(what: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            what,
            value: value.into(),
        }
    }
}
