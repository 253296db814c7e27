//! Bounded waiting on streams and probes.
//!
//! - [`Eventually`] polls a condition until it holds or a deadline passes.
//!   Stream conditions read through a [`StreamCursor`](crate::session::StreamCursor)
//!   and never consume captured output.
//! - [`RetryProbe`] re-invokes an external check a bounded number of times.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use e2e_harness::eventually::{Eventually, Pattern};
//! use e2e_harness::execution::{start, Command};
//!
//! # async fn demo() -> e2e_harness::Result<()> {
//! let mut session = start(&Command::shell("/bin/sh", "-c", "deis apps:create demo"))?;
//! let created = Pattern::new(r"created demo")?;
//! Eventually::default()
//!     .within(Duration::from_secs(10))
//!     .say(session.out(), &created)
//!     .await
//!     .into_result()?;
//! # Ok(())
//! # }
//! ```

mod condition;
mod matcher;
mod pattern;
mod retry;

pub use condition::{Check, Condition, Probe, Say};
pub use matcher::{Eventually, Outcome, TimeoutReport};
pub use pattern::{prepend_error, Pattern};
pub use retry::{command_probe, retry_until, RetryProbe, DEFAULT_RETRY_DELAY};
