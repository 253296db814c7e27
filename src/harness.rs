//! Scenario-level entry point.
//!
//! [`Harness`] bundles a configuration with the renderer and matcher
//! defaults derived from it, so a scenario reads as a sequence of
//! "start this as that user, eventually see that" steps.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::config::HarnessConfig;
use crate::eventually::{Eventually, RetryProbe};
use crate::execution::{self, Command, ExecutionResult};
use crate::identity::{Arg, Env, Identity, Renderer};
use crate::session::Session;
use crate::Result;

/// Configuration plus the defaults scenarios run with.
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    renderer: Renderer,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        let renderer = Renderer::new(&config);
        Self { config, renderer }
    }

    /// Defaults overridden by `E2E_HARNESS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = HarnessConfig::default();
        config.apply_env()?;
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Replace the environment commands start from.
    pub fn with_base_env(mut self, env: Env) -> Self {
        self.renderer = self.renderer.with_base_env(env);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Render `template` as `identity` and start it.
    ///
    /// Must be called from within a tokio runtime; outside one this fails
    /// with [`HarnessError::Start`](crate::HarnessError::Start).
    pub fn start(
        &self,
        template: &str,
        args: &[Arg],
        identity: Option<&Identity>,
    ) -> Result<Session> {
        let command = self.renderer.render(template, args, identity)?;
        execution::start(&command)
    }

    /// Start a command built by the caller, e.g. with a shim on `PATH`.
    pub fn start_command(&self, command: &Command) -> Result<Session> {
        execution::start(command)
    }

    /// Render `template` without an identity and run it to completion
    /// within the configured exit timeout.
    pub async fn execute(&self, template: &str, args: &[Arg]) -> Result<ExecutionResult> {
        let command = self.renderer.render(template, args, None)?;
        let result = execution::execute(&command, self.config.timeouts.exit_timeout()).await?;
        info!(
            command = %command.display_line(),
            exit = ?result.exit_code(),
            "executed in {:?}",
            result.duration
        );
        Ok(result)
    }

    /// Wait for `session` to exit within the configured exit timeout.
    pub async fn wait_for_exit(&self, session: &Session) -> Result<crate::session::ExitStatus> {
        session
            .wait_for_exit(self.config.timeouts.exit_timeout())
            .await
    }

    /// Matcher with the default timeout.
    pub fn eventually(&self) -> Eventually {
        Eventually::from_config(&self.config.timeouts)
    }

    /// Matcher for slow steps such as builds and scaling.
    pub fn eventually_max(&self) -> Eventually {
        self.eventually().within(self.config.timeouts.max_timeout())
    }

    /// Matcher with an explicit timeout.
    pub fn eventually_within(&self, timeout: Duration) -> Eventually {
        self.eventually().within(timeout)
    }

    /// Retry probe with the configured attempts and delay.
    pub fn retry(&self) -> RetryProbe {
        RetryProbe::from_config(&self.config.retry)
    }

    /// Write `identity`'s profile using the configured location and controller.
    pub fn write_profile(&self, identity: &Identity) -> Result<std::path::PathBuf> {
        let controller = self.config.identity.controller_url.as_deref().unwrap_or("");
        identity.write_profile(&self.config.identity.profile_dir, controller)
    }
}

/// Write a fixture file, creating parent directories.
pub fn write_fixture(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Read a fixture file as text.
pub fn read_fixture(path: impl AsRef<Path>) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}
