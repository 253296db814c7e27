//! # e2e-harness
//!
//! Process-driven acceptance testing for platform CLIs.
//!
//! A scenario starts the real CLI binary as a child process, lets its
//! output accumulate in the background, and asserts on that output with
//! bounded polling rather than fixed sleeps. Commands can be rendered under
//! a credential [`Identity`] and can see [`shim`] executables standing in for
//! system tools, all without touching the environment of the test process.
//!
//! ## Quick Start
//!
//! ```no_run
//! use e2e_harness::{args, eventually::Pattern, Harness};
//!
//! #[tokio::main]
//! async fn main() -> e2e_harness::Result<()> {
//!     e2e_harness::logging::try_init().ok();
//!
//!     let harness = Harness::from_env()?;
//!     let mut session = harness.start("deis apps:create %s --no-remote", &args!["demo"], None)?;
//!
//!     harness
//!         .eventually()
//!         .say(session.out(), &Pattern::format("created %s", &args!["demo"])?)
//!         .await
//!         .into_result()?;
//!     let status = harness.wait_for_exit(&session).await?;
//!     assert!(status.success());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod eventually;
pub mod execution;
pub mod harness;
pub mod identity;
pub mod logging;
pub mod output;
pub mod session;
pub mod shim;
pub mod smoke;

// Re-export commonly used types
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use eventually::{
    prepend_error, retry_until, Eventually, Outcome, Pattern, RetryProbe, TimeoutReport,
};
pub use execution::{Command, ExecutionResult};
pub use harness::{read_fixture, write_fixture, Harness};
pub use identity::{Arg, Env, Identity, Renderer};
pub use session::{ExitStatus, OutputBuffer, Session, SessionId, SessionState, StreamCursor, WaitOutcome};
pub use shim::{create_shim, create_shim_with, remove_shim, Capture, Shim};
