//! Error types for e2e-harness.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::eventually::TimeoutReport;

/// Main error type for harness operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The executable could not be resolved or launched.
    #[error("failed to start `{program}`: {source}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Command template and arguments do not fit together.
    #[error("template error: {0}")]
    Template(String),

    /// An awaited condition never became true.
    #[error("{0}")]
    TimedOut(TimeoutReport),

    /// A bounded wait for process exit elapsed.
    #[error("session {session} did not exit within {waited:?}")]
    ExitTimeout { session: String, waited: Duration },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shim could not be installed as requested.
    #[error("shim error: {0}")]
    Shim(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
