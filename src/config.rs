//! Configuration management for e2e-harness.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Args;

/// Harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Polling and wait bounds.
    pub timeouts: TimeoutSection,
    /// Retry probe settings.
    pub retry: RetrySection,
    /// How rendered command lines are launched.
    pub command: CommandSection,
    /// Environment variables an identity is expressed through.
    pub identity: IdentitySection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    /// Default bound for eventual assertions, in milliseconds.
    pub default_ms: u64,
    /// Bound for slow steps (builds, scaling), in milliseconds.
    pub max_ms: u64,
    /// Interval between evaluations, in milliseconds.
    pub poll_ms: u64,
    /// Default bound when waiting for a process to exit, in milliseconds.
    pub exit_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            default_ms: 60_000,
            max_ms: 600_000,
            poll_ms: 50,
            exit_ms: 60_000,
        }
    }
}

impl TimeoutSection {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn exit_timeout(&self) -> Duration {
        Duration::from_millis(self.exit_ms)
    }
}

/// Retry probe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Maximum number of probe invocations.
    pub attempts: u32,
    /// Delay between invocations, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            attempts: 60,
            delay_ms: 1_000,
        }
    }
}

impl RetrySection {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Command launch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSection {
    /// Shell used to run rendered command lines.
    pub shell: String,
    /// Flag that makes the shell run its next argument.
    pub shell_flag: String,
    /// Working directory for launched commands.
    pub working_dir: Option<PathBuf>,
}

impl Default for CommandSection {
    fn default() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
            shell_flag: "-c".to_string(),
            working_dir: None,
        }
    }
}

/// Identity environment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    /// Variable pointing the CLI at the identity's home directory.
    pub home_var: String,
    /// Variable naming the profile the CLI should load.
    pub profile_var: String,
    /// Variable carrying a pre-issued token.
    pub token_var: String,
    /// Directory under the home where profiles are written.
    pub profile_dir: String,
    /// Controller URL written into generated profiles.
    pub controller_url: Option<String>,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            home_var: "HOME".to_string(),
            profile_var: "DEIS_PROFILE".to_string(),
            token_var: "DEIS_TOKEN".to_string(),
            profile_dir: ".deis".to_string(),
            controller_url: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("E2E_HARNESS_TIMEOUT_MS") {
            self.timeouts.default_ms = parse_number("E2E_HARNESS_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("E2E_HARNESS_MAX_TIMEOUT_MS") {
            self.timeouts.max_ms = parse_number("E2E_HARNESS_MAX_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("E2E_HARNESS_POLL_MS") {
            self.timeouts.poll_ms = parse_number("E2E_HARNESS_POLL_MS", &v)?;
        }
        if let Some(v) = lookup("E2E_HARNESS_EXIT_TIMEOUT_MS") {
            self.timeouts.exit_ms = parse_number("E2E_HARNESS_EXIT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("E2E_HARNESS_RETRY_ATTEMPTS") {
            self.retry.attempts = parse_number("E2E_HARNESS_RETRY_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("E2E_HARNESS_RETRY_DELAY_MS") {
            self.retry.delay_ms = parse_number("E2E_HARNESS_RETRY_DELAY_MS", &v)?;
        }
        if let Some(shell) = lookup("E2E_HARNESS_SHELL").filter(|s| !s.is_empty()) {
            self.command.shell = shell;
        }
        if let Some(url) = lookup("E2E_HARNESS_CONTROLLER_URL").filter(|s| !s.is_empty()) {
            self.identity.controller_url = Some(url);
        }

        if let Some(level) = lookup("E2E_HARNESS_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ms) = args.timeout_ms {
            self.timeouts.default_ms = ms;
            self.timeouts.exit_ms = ms;
        }
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Reject settings the matcher cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.poll_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "timeouts.poll_ms",
                "must be greater than zero".into(),
            ));
        }
        if self.timeouts.poll_ms > self.timeouts.default_ms {
            return Err(ConfigError::InvalidValue(
                "timeouts.poll_ms",
                format!(
                    "{} exceeds timeouts.default_ms ({})",
                    self.timeouts.poll_ms, self.timeouts.default_ms
                ),
            ));
        }
        if self.command.shell.is_empty() {
            return Err(ConfigError::InvalidValue(
                "command.shell",
                "must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::default(),
        };
        config.apply_env()?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key, format!("not a number: {:?}", value)))
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(serde_json::Error),
    /// A setting has an unusable value.
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.timeouts.default_timeout(), Duration::from_secs(60));
        assert_eq!(config.timeouts.max_timeout(), Duration::from_secs(600));
        assert_eq!(config.retry.attempts, 60);
        assert_eq!(config.command.shell, "/bin/sh");
        assert_eq!(config.identity.profile_var, "DEIS_PROFILE");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{
            "timeouts": { "poll_ms": 20 },
            "identity": { "controller_url": "http://deis.example.test" }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = HarnessConfig::from_file(file.path()).unwrap();
        assert_eq!(config.timeouts.poll_ms, 20);
        assert_eq!(config.timeouts.default_ms, 60_000);
        assert_eq!(
            config.identity.controller_url.as_deref(),
            Some("http://deis.example.test")
        );
        assert_eq!(config.identity.home_var, "HOME");
    }

    #[test]
    fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            HarnessConfig::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = HarnessConfig::default();
        config
            .apply_env_from(lookup(&[
                ("E2E_HARNESS_TIMEOUT_MS", "5000"),
                ("E2E_HARNESS_POLL_MS", "10"),
                ("E2E_HARNESS_RETRY_ATTEMPTS", "3"),
                ("E2E_HARNESS_SHELL", "/bin/bash"),
                ("RUST_LOG", "debug"),
            ]))
            .unwrap();

        assert_eq!(config.timeouts.default_ms, 5000);
        assert_eq!(config.timeouts.poll_ms, 10);
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.command.shell, "/bin/bash");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_harness_log_level_beats_rust_log() {
        let mut config = HarnessConfig::default();
        config
            .apply_env_from(lookup(&[
                ("E2E_HARNESS_LOG_LEVEL", "trace"),
                ("RUST_LOG", "warn"),
            ]))
            .unwrap();
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_apply_env_rejects_garbage() {
        let mut config = HarnessConfig::default();
        let err = config
            .apply_env_from(lookup(&[("E2E_HARNESS_POLL_MS", "fast")]))
            .unwrap_err();
        assert!(err.to_string().contains("E2E_HARNESS_POLL_MS"));
    }

    #[test]
    fn test_apply_args() {
        let mut config = HarnessConfig::default();
        let args = Args {
            timeout_ms: Some(1500),
            log_level: Some("debug".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);
        assert_eq!(config.timeouts.default_ms, 1500);
        assert_eq!(config.timeouts.exit_ms, 1500);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_poll_interval() {
        let mut config = HarnessConfig::default();
        config.timeouts.poll_ms = 0;
        assert!(config.validate().is_err());

        config.timeouts.poll_ms = 100;
        config.timeouts.default_ms = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = HarnessConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"poll_ms\""));
        assert!(json.contains("\"profile_var\""));

        let back: HarnessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
