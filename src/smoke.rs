//! Ad-hoc checks driven by the `e2e-harness` binary.

use std::fmt;

use tracing::{debug, warn};

use crate::cli::Args;
use crate::config::HarnessConfig;
use crate::eventually::{Eventually, Outcome, Pattern};
use crate::execution;
use crate::identity::{Identity, Renderer};
use crate::session::WaitOutcome;
use crate::Result;

/// Verdict of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: String, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: String, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "{} {}", verdict, self.name)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// All verdicts of one run, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmokeReport {
    pub checks: Vec<CheckResult>,
}

impl SmokeReport {
    /// Whether every check passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

impl fmt::Display for SmokeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            writeln!(f, "{}", check)?;
        }
        let failed = self.checks.iter().filter(|c| !c.passed).count();
        write!(
            f,
            "{} check(s), {} failed",
            self.checks.len(),
            failed
        )
    }
}

/// Run the command from `args` and check it against the expectations.
///
/// Patterns are compiled before anything starts, so a bad pattern is an
/// error rather than a failed check. Failed expectations do not stop the
/// run; the exit check always happens.
pub async fn run(args: &Args, config: &HarnessConfig) -> Result<SmokeReport> {
    let expect = compile(&args.expect)?;
    let expect_err = compile(&args.expect_err)?;

    let identity = match &args.user {
        Some(user) => {
            let identity = match &args.home {
                Some(home) => Identity::new(user, home),
                None => Identity::with_temp_home(user)?,
            };
            let identity = match &args.token {
                Some(token) => identity.token(token),
                None => identity,
            };
            if let Some(controller) = &config.identity.controller_url {
                identity.write_profile(&config.identity.profile_dir, controller)?;
            }
            Some(identity)
        }
        None => None,
    };

    let renderer = Renderer::new(config);
    let command = renderer.command_for(&args.command_line(), identity.as_ref());
    let mut session = execution::start(&command)?;
    let eventually = Eventually::from_config(&config.timeouts);
    let mut report = SmokeReport::default();

    for pattern in &expect {
        let outcome = eventually.say(session.out(), pattern).await;
        report.checks.push(verdict(format!("stdout {}", pattern), outcome));
    }
    for pattern in &expect_err {
        let outcome = eventually.say(session.err(), pattern).await;
        report.checks.push(verdict(format!("stderr {}", pattern), outcome));
    }

    let name = format!("exit code {}", args.exit_code);
    let check = match session.wait(config.timeouts.exit_timeout()).await {
        WaitOutcome::Exited(status) if status.code() == Some(args.exit_code) => {
            CheckResult::pass(name, String::new())
        }
        WaitOutcome::Exited(status) => CheckResult::fail(name, format!("exited with {}", status)),
        WaitOutcome::TimedOut { waited } => {
            #[cfg(unix)]
            {
                if let Err(e) = session.kill() {
                    debug!(session = %session.id(), "kill failed: {}", e);
                }
            }
            CheckResult::fail(name, format!("still running after {:?}", waited))
        }
    };
    report.checks.push(check);

    if let Some(identity) = identity {
        if let Err(e) = identity.cancel() {
            warn!("failed to clean up identity: {}", e);
        }
    }
    Ok(report)
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns.iter().map(|p| Pattern::new(p)).collect()
}

fn verdict(name: String, outcome: Outcome) -> CheckResult {
    match outcome {
        Outcome::Satisfied => CheckResult::pass(name, String::new()),
        Outcome::TimedOut(report) => CheckResult::fail(name, report.to_string()),
    }
}
