//! Spawned process with concurrently captured output.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::buffer::{OutputBuffer, StreamCursor};
use super::exit::{ExitStatus, WaitOutcome};
use super::{SessionId, SessionState};
use crate::error::HarnessError;
use crate::execution::Command;
use crate::Result;

/// Buffer size for draining a pipe.
const READ_BUFFER_SIZE: usize = 4096;

/// How long to keep draining pipes after the process exits.
///
/// A grandchild that inherited a pipe can hold it open indefinitely.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Published by the supervisor. `exit` is set as soon as the process is
/// reaped; `drained` once both output buffers are closed.
#[derive(Debug, Clone, Copy)]
struct Progress {
    state: SessionState,
    exit: Option<ExitStatus>,
    drained: bool,
}

/// Handle to one spawned external process and its captured output.
///
/// The process is launched by [`Session::start`] and its stdout and stderr
/// are drained by two background tasks into append-only buffers from that
/// instant on, whether or not anything is reading them.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    argv: Vec<String>,
    pid: Option<u32>,
    started_at: Instant,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    out: StreamCursor,
    err: StreamCursor,
    progress: watch::Receiver<Progress>,
    #[cfg_attr(not(unix), allow(dead_code))]
    signals: mpsc::UnboundedSender<i32>,
}

impl Session {
    /// Launch `command` and begin capturing its output.
    ///
    /// The child sees exactly `command.env`; the environment of the current
    /// process is neither inherited nor modified. Called outside a tokio
    /// runtime it fails with [`HarnessError::Start`].
    pub fn start(command: &Command) -> Result<Session> {
        let id = SessionId::next();
        let argv = command.argv();
        let (program, args) = argv.split_first().ok_or_else(|| HarnessError::Start {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(HarnessError::Start {
                program: program.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no tokio runtime to capture output on",
                ),
            });
        }

        let mut process = tokio::process::Command::new(program);
        process
            .args(args)
            .env_clear()
            .envs(command.env.iter())
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.working_dir {
            process.current_dir(dir);
        }

        let mut state = SessionState::Starting;
        let mut child = process.spawn().map_err(|source| {
            warn!(session = %id, program = %program, "failed to start: {}", source);
            HarnessError::Start {
                program: program.clone(),
                source,
            }
        })?;
        let started_at = Instant::now();
        let pid = child.id();
        state.transition_to(SessionState::Running);
        info!(session = %id, pid = ?pid, argv = ?argv, "process started");

        let stdout = OutputBuffer::new();
        let stderr = OutputBuffer::new();
        let readers = [
            spawn_capture(child.stdout.take(), stdout.clone(), id, "stdout"),
            spawn_capture(child.stderr.take(), stderr.clone(), id, "stderr"),
        ];

        if let (Some(input), Some(mut pipe)) = (command.stdin.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = pipe.write_all(&input).await {
                    debug!(session = %id, "stdin write failed: {}", e);
                }
                // Dropping the pipe delivers EOF.
            });
        }

        let (tx, progress) = watch::channel(Progress {
            state,
            exit: None,
            drained: false,
        });
        let (signals, signal_rx) = mpsc::unbounded_channel();
        tokio::spawn(supervise(
            id,
            child,
            signal_rx,
            readers,
            [stdout.clone(), stderr.clone()],
            tx,
            started_at,
        ));

        Ok(Session {
            id,
            argv,
            pid,
            started_at,
            out: stdout.cursor(),
            err: stderr.cursor(),
            stdout,
            stderr,
            progress,
            signals,
        })
    }

    /// Session identifier used in log output.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The argv the process was launched with.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// OS process id, if the platform reported one.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Time since the process was launched.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.progress.borrow().state
    }

    /// Exit status once the session has exited.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.progress.borrow().exit
    }

    /// Exit code once the session has exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_status().and_then(|status| status.code())
    }

    /// Captured stdout.
    pub fn stdout(&self) -> &OutputBuffer {
        &self.stdout
    }

    /// Captured stderr.
    pub fn stderr(&self) -> &OutputBuffer {
        &self.stderr
    }

    /// The session's own stdout cursor, shared by consecutive assertions.
    pub fn out(&mut self) -> &mut StreamCursor {
        &mut self.out
    }

    /// The session's own stderr cursor.
    pub fn err(&mut self) -> &mut StreamCursor {
        &mut self.err
    }

    /// Wait up to `timeout` for the process to exit.
    ///
    /// Once it has exited, the rest of `timeout` is spent waiting for its
    /// output to drain. A descendant holding a pipe open past the deadline
    /// does not turn an exit into a timeout; the buffers just stay open.
    pub async fn wait(&self, timeout: Duration) -> WaitOutcome {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut progress = self.progress.clone();
        let exited = tokio::time::timeout_at(
            deadline,
            progress.wait_for(|p| p.state.is_terminal()),
        )
        .await
        .map(|seen| seen.map(|p| p.exit.unwrap_or_else(ExitStatus::unknown)));

        let status = match exited {
            Ok(Ok(status)) => status,
            Ok(Err(_)) => {
                // Supervisor dropped without reporting: the runtime is going away.
                warn!(session = %self.id, "supervisor ended without an exit status");
                return WaitOutcome::Exited(ExitStatus::unknown());
            }
            Err(_) => {
                debug!(session = %self.id, "wait for exit timed out after {:?}", timeout);
                return WaitOutcome::TimedOut {
                    waited: started.elapsed(),
                };
            }
        };

        let drained = tokio::time::timeout_at(deadline, progress.wait_for(|p| p.drained)).await;
        if drained.is_err() {
            debug!(session = %self.id, "exited but output still open after {:?}", timeout);
        }
        WaitOutcome::Exited(status)
    }

    /// Like [`wait`](Self::wait), but a timeout is an error.
    pub async fn wait_for_exit(&self, timeout: Duration) -> Result<ExitStatus> {
        match self.wait(timeout).await {
            WaitOutcome::Exited(status) => Ok(status),
            WaitOutcome::TimedOut { waited } => Err(HarnessError::ExitTimeout {
                session: self.id.to_string(),
                waited,
            }),
        }
    }

    /// Send `signal` to the process.
    ///
    /// Delivery goes through the supervisor that owns the child, so a
    /// process that has already been reaped is never signalled by pid.
    #[cfg(unix)]
    pub fn signal(&self, signal: i32) -> Result<()> {
        if self.state().is_terminal() || self.signals.send(signal).is_err() {
            return Err(HarnessError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("session {} has already exited", self.id),
            )));
        }
        debug!(session = %self.id, signal, "signal queued");
        Ok(())
    }

    /// Send SIGINT.
    #[cfg(unix)]
    pub fn interrupt(&self) -> Result<()> {
        self.signal(libc::SIGINT)
    }

    /// Send SIGTERM.
    #[cfg(unix)]
    pub fn terminate(&self) -> Result<()> {
        self.signal(libc::SIGTERM)
    }

    /// Send SIGKILL.
    #[cfg(unix)]
    pub fn kill(&self) -> Result<()> {
        self.signal(libc::SIGKILL)
    }
}

fn spawn_capture<R>(
    pipe: Option<R>,
    buffer: OutputBuffer,
    id: SessionId,
    stream: &'static str,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Some(pipe) = pipe {
            capture(pipe, &buffer, id, stream).await;
        }
        buffer.close();
    })
}

async fn capture<R>(mut pipe: R, buffer: &OutputBuffer, id: SessionId, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => {
                debug!(session = %id, stream, "EOF");
                break;
            }
            Ok(n) => {
                trace!(session = %id, stream, "read {} bytes", n);
                buffer.append(&buf[..n]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(session = %id, stream, "read error: {}", e);
                break;
            }
        }
    }
}

/// Deliver `signal` to a child that has not been reaped yet.
#[cfg(unix)]
fn deliver(child: &mut Child, signal: i32, id: SessionId) {
    if signal == libc::SIGKILL {
        if let Err(e) = child.start_kill() {
            debug!(session = %id, "kill failed: {}", e);
        }
        return;
    }
    let Some(pid) = child.id() else {
        debug!(session = %id, signal, "process already reaped");
        return;
    };
    debug!(session = %id, pid, signal, "sending signal");
    // SAFETY: kill(2) has no memory-safety preconditions, and the child is
    // owned by this task and not yet reaped, so `pid` still names it.
    if unsafe { libc::kill(pid as libc::pid_t, signal) } != 0 {
        debug!(session = %id, signal, "signal failed: {}", std::io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn deliver(child: &mut Child, _signal: i32, id: SessionId) {
    if let Err(e) = child.start_kill() {
        debug!(session = %id, "kill failed: {}", e);
    }
}

async fn supervise(
    id: SessionId,
    mut child: Child,
    mut signals: mpsc::UnboundedReceiver<i32>,
    readers: [JoinHandle<()>; 2],
    buffers: [OutputBuffer; 2],
    tx: watch::Sender<Progress>,
    started_at: Instant,
) {
    let waited = loop {
        tokio::select! {
            waited = child.wait() => break waited,
            Some(signal) = signals.recv() => deliver(&mut child, signal, id),
        }
    };
    let status = match waited {
        Ok(status) => ExitStatus::from(status),
        Err(e) => {
            error!(session = %id, "failed to wait for process: {}", e);
            ExitStatus::unknown()
        }
    };

    info!(session = %id, elapsed = ?started_at.elapsed(), "process finished with {}", status);
    tx.send_modify(|p| {
        p.state.transition_to(SessionState::Exited);
        p.exit = Some(status);
    });

    for reader in readers {
        let abort = reader.abort_handle();
        match tokio::time::timeout(DRAIN_TIMEOUT, reader).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(session = %id, "capture task failed: {}", e),
            Err(_) => {
                warn!(session = %id, "output still open {:?} after exit; abandoning", DRAIN_TIMEOUT);
                abort.abort();
            }
        }
    }
    // An abandoned reader never closes its buffer.
    for buffer in &buffers {
        buffer.close();
    }
    tx.send_modify(|p| p.drained = true);
}
