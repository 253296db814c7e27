//! Identities and command rendering.
//!
//! An [`Identity`] is the credential profile a command runs as. A
//! [`Renderer`] turns a `%s`/`%d` template plus arguments into a
//! [`Command`](crate::execution::Command) whose environment carries the
//! identity's variables. All of this is value-based: nothing mutates the
//! environment of the running process.

mod context;
mod env;
mod renderer;
mod template;

pub use context::{Identity, Profile};
pub use env::{Env, PATH_VAR};
pub use renderer::{IdentityVars, Renderer};
pub use template::{format, placeholder_count, Arg};
