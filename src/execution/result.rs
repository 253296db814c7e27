//! Run-to-completion results.

use std::time::Duration;

use crate::session::ExitStatus;

/// Result of running a command to completion.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Captured stdout, decoded lossily.
    pub stdout: String,
    /// Captured stderr, decoded lossily.
    pub stderr: String,
    /// Exit status (if the command finished within its timeout).
    pub status: Option<ExitStatus>,
    /// Execution duration.
    pub duration: Duration,
    /// Whether execution timed out and the process was killed.
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Exit code (if the command exited normally).
    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }

    /// Check if command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code() == Some(0)
    }

    /// Check if command failed (non-zero exit, signal or timeout).
    pub fn failed(&self) -> bool {
        !self.success()
    }

    /// Stdout, trimmed.
    pub fn output_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Stdout followed by stderr, for error messages.
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&self.stderr);
        }
        combined
    }
}
