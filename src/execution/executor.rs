//! Starting commands and running them to completion.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::command::Command;
use super::result::ExecutionResult;
use crate::session::{Session, WaitOutcome};
use crate::Result;

/// Default bound on run-to-completion execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Start `command` as a new session.
pub fn start(command: &Command) -> Result<Session> {
    debug!(command = %command.display_line(), "starting");
    Session::start(command)
}

/// Run `command` to completion, waiting at most `timeout`.
///
/// A non-zero exit is a normal result. On timeout the process is killed
/// and whatever output was captured is returned with `timed_out` set.
pub async fn execute(command: &Command, timeout: Duration) -> Result<ExecutionResult> {
    let started = Instant::now();
    let session = start(command)?;

    let (status, timed_out) = match session.wait(timeout).await {
        WaitOutcome::Exited(status) => (Some(status), false),
        WaitOutcome::TimedOut { waited } => {
            warn!(
                session = %session.id(),
                command = %command.display_line(),
                "killing after {:?}",
                waited
            );
            #[cfg(unix)]
            {
                if let Err(e) = session.kill() {
                    debug!(session = %session.id(), "kill failed: {}", e);
                }
            }
            (None, true)
        }
    };

    Ok(ExecutionResult {
        stdout: session.stdout().text(),
        stderr: session.stderr().text(),
        status,
        duration: started.elapsed(),
        timed_out,
    })
}
