//! CLI integration tests.
//!
//! These tests verify argument parsing, configuration loading and the
//! smoke-check runner the binary is built on.

use std::ffi::OsString;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

use e2e_harness::cli::{parse_args_from, Args};
use e2e_harness::config::HarnessConfig;

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("e2e-harness")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-c",
        "/etc/e2e.json",
        "-e",
        "Creating Application",
        "-e",
        r"created \w+",
        "-E",
        "warning",
        "-x",
        "0",
        "-t",
        "1500",
        "-l",
        "debug",
        "--",
        "deis",
        "apps:create",
    ]))
    .unwrap();

    assert_eq!(result.expect.len(), 2);
    assert_eq!(result.expect_err, vec!["warning"]);
    assert_eq!(result.timeout_ms, Some(1500));
    assert_eq!(result.command_line(), "deis apps:create");
    assert_eq!(
        result.config.unwrap().to_str().unwrap(),
        "/etc/e2e.json"
    );
}

#[test]
fn test_cli_missing_command() {
    assert!(parse_args_from(args(&[])).is_err());
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_config_file_then_args() {
    let json = r#"{
        "timeouts": { "default_ms": 30000, "poll_ms": 25 },
        "command": { "shell": "/bin/bash" },
        "logging": { "level": "warn" }
    }"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let mut config = HarnessConfig::from_file(file.path()).unwrap();
    assert_eq!(config.timeouts.default_timeout(), Duration::from_secs(30));
    assert_eq!(config.command.shell, "/bin/bash");

    let args = Args {
        timeout_ms: Some(800),
        log_level: Some("trace".into()),
        ..Args::default()
    };
    config.apply_args(&args);
    assert_eq!(config.timeouts.default_ms, 800);
    assert_eq!(config.timeouts.poll_ms, 25);
    assert_eq!(config.logging.level, "trace");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_load_rejects_missing_file() {
    let args = Args {
        config: Some("/no/such/e2e.json".into()),
        command: vec!["true".into()],
        ..Args::default()
    };
    assert!(HarnessConfig::load(&args).is_err());
}

// ============================================================================
// Smoke Runner Tests
// ============================================================================

#[cfg(unix)]
mod smoke {
    use super::*;
    use e2e_harness::smoke;

    fn quick_config() -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.timeouts.default_ms = 2_000;
        config.timeouts.exit_ms = 2_000;
        config.timeouts.poll_ms = 10;
        config
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_smoke_expected_failure_passes() {
        let parsed = parse_args_from(args(&[
            "-x",
            "1",
            "-E",
            "Error: 404 Not Found",
            "--",
            "echo 'Error: 404 Not Found' >&2; exit 1",
        ]))
        .unwrap();

        let report = smoke::run(&parsed, &quick_config()).await.unwrap();
        assert!(report.passed(), "{}", report);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_smoke_missing_output_fails() {
        let parsed =
            parse_args_from(args(&["-e", "never printed", "--", "echo something else"])).unwrap();

        let report = smoke::run(&parsed, &quick_config()).await.unwrap();
        assert!(!report.passed());
        assert!(report.checks[0].detail.contains("something else"));
        // exit check still ran
        assert!(report.checks[1].passed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_smoke_hung_command_is_killed() {
        let mut config = quick_config();
        config.timeouts.exit_ms = 200;
        let parsed = parse_args_from(args(&["--", "exec sleep 10"])).unwrap();

        let started = std::time::Instant::now();
        let report = smoke::run(&parsed, &config).await.unwrap();
        assert!(!report.passed());
        assert!(report.checks[0].detail.contains("still running"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
