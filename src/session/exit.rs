//! Process exit status and bounded waits.

use std::fmt;
use std::time::Duration;

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    code: Option<i32>,
    signal: Option<i32>,
}

impl ExitStatus {
    /// Status of a process that exited normally with `code`.
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Status of a process killed by `signal`.
    pub fn from_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Status when the outcome could not be observed.
    pub(crate) fn unknown() -> Self {
        Self {
            code: None,
            signal: None,
        }
    }

    /// Exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Terminating signal, if the process was killed.
    pub fn signal(&self) -> Option<i32> {
        self.signal
    }

    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::from_signal(signal);
            }
        }
        match status.code() {
            Some(code) => Self::from_code(code),
            None => Self::unknown(),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "killed by signal {}", signal),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// Result of a bounded wait for process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WaitOutcome {
    /// The process exited and its output was drained.
    Exited(ExitStatus),
    /// The process was still running when the wait gave up.
    TimedOut { waited: Duration },
}

impl WaitOutcome {
    /// Exit code, if the process exited normally within the wait.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            WaitOutcome::Exited(status) => status.code(),
            WaitOutcome::TimedOut { .. } => None,
        }
    }

    /// Whether the wait elapsed before the process exited.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut { .. })
    }

    /// The exit status, if the process exited.
    pub fn status(&self) -> Option<ExitStatus> {
        match self {
            WaitOutcome::Exited(status) => Some(*status),
            WaitOutcome::TimedOut { .. } => None,
        }
    }
}
