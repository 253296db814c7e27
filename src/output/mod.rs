//! Output text processing.
//!
//! CLIs under test often colorize their output when they think they are
//! talking to a terminal. Patterns are written against plain text, so the
//! matcher can work on an escape-free rendering of a stream:
//!
//! ```
//! use e2e_harness::output::strip_ansi;
//!
//! let clean = strip_ansi(b"\x1b[32m=== demo Application\x1b[0m");
//! assert_eq!(clean, "=== demo Application");
//! ```

mod ansi;

pub use ansi::{strip_ansi, strip_ansi_str, tail};
