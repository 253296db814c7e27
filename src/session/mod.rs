//! Process sessions.
//!
//! A [`Session`] is one spawned external process whose stdout and stderr
//! are captured into append-only [`OutputBuffer`]s, read through
//! [`StreamCursor`]s, and whose exit is observed with bounded waits.

mod buffer;
mod exit;
mod id;
mod process;
mod state;

pub use buffer::{OutputBuffer, StreamCursor};
pub use exit::{ExitStatus, WaitOutcome};
pub use id::SessionId;
pub use process::Session;
pub use state::SessionState;
