//! Command description and execution.
//!
//! This module provides:
//! - [`Command`]: a fully resolved argv, environment and working directory
//! - [`start`]: launch a command as a [`Session`](crate::session::Session)
//! - [`execute`]: run a command to completion with a bounded wait
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use e2e_harness::execution::{execute, Command};
//!
//! # async fn demo() -> e2e_harness::Result<()> {
//! let clone = Command::shell("/bin/sh", "-c", "git clone https://example.test/example-go.git");
//! let result = execute(&clone, Duration::from_secs(120)).await?;
//! assert!(result.success(), "{}", result.combined());
//! # Ok(())
//! # }
//! ```

mod command;
mod executor;
mod result;

pub use command::Command;
pub use executor::{execute, start, DEFAULT_TIMEOUT};
pub use result::ExecutionResult;
