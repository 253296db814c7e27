//! Two-stage command rendering.
//!
//! Stage one substitutes arguments into a template. Stage two builds the
//! environment the command runs under: a copy of the base environment with
//! the identity's variables layered on top. Each render produces its own
//! [`Command`], so renders under different identities never observe each
//! other, even when they run at the same time.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::context::Identity;
use super::env::Env;
use super::template::{self, Arg};
use crate::config::{CommandSection, HarnessConfig, IdentitySection};
use crate::execution::Command;
use crate::Result;

/// Names of the variables an identity is expressed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityVars {
    pub home: String,
    pub profile: String,
    pub token: String,
}

impl Default for IdentityVars {
    fn default() -> Self {
        Self::from(&IdentitySection::default())
    }
}

impl From<&IdentitySection> for IdentityVars {
    fn from(section: &IdentitySection) -> Self {
        Self {
            home: section.home_var.clone(),
            profile: section.profile_var.clone(),
            token: section.token_var.clone(),
        }
    }
}

/// Renders templates into launchable commands.
#[derive(Debug, Clone)]
pub struct Renderer {
    base_env: Arc<Env>,
    shell: String,
    shell_flag: String,
    vars: IdentityVars,
    working_dir: Option<PathBuf>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(&HarnessConfig::default())
    }
}

impl Renderer {
    /// Create a renderer over a snapshot of the ambient environment.
    pub fn new(config: &HarnessConfig) -> Self {
        let CommandSection {
            shell,
            shell_flag,
            working_dir,
        } = config.command.clone();
        Self {
            base_env: Arc::new(Env::ambient()),
            shell,
            shell_flag,
            vars: IdentityVars::from(&config.identity),
            working_dir,
        }
    }

    /// Replace the base environment every render starts from.
    pub fn with_base_env(mut self, env: Env) -> Self {
        self.base_env = Arc::new(env);
        self
    }

    pub fn base_env(&self) -> &Env {
        &self.base_env
    }

    pub fn vars(&self) -> &IdentityVars {
        &self.vars
    }

    /// Stage one: substitute `args` into `template`.
    pub fn format(&self, template: &str, args: &[Arg]) -> Result<String> {
        template::format(template, args)
    }

    /// Stage two: the environment a command runs under as `identity`.
    ///
    /// Without an identity the base environment is returned unchanged. An
    /// identity without a token clears any inherited token variable, so a
    /// token from the ambient environment never leaks into its commands.
    pub fn environment(&self, identity: Option<&Identity>) -> Env {
        let mut env = Env::clone(&self.base_env);
        if let Some(identity) = identity {
            env.set(&self.vars.home, identity.home().to_string_lossy());
            env.set(&self.vars.profile, identity.username());
            match identity.token_value() {
                Some(token) => env.set(&self.vars.token, token),
                None => {
                    env.remove(&self.vars.token);
                }
            }
        }
        env
    }

    /// A shell command running `line` as `identity`.
    pub fn command_for(&self, line: &str, identity: Option<&Identity>) -> Command {
        let mut command = Command::shell(&self.shell, &self.shell_flag, line)
            .with_env(self.environment(identity));
        command.working_dir = self.working_dir.clone();
        command
    }

    /// Render `template` with `args` into a command running as `identity`.
    pub fn render(
        &self,
        template: &str,
        args: &[Arg],
        identity: Option<&Identity>,
    ) -> Result<Command> {
        let line = self.format(template, args)?;
        debug!(
            user = identity.map(Identity::username).unwrap_or("-"),
            command = %line,
            "rendered"
        );
        Ok(self.command_for(&line, identity))
    }
}
