//! Session integration tests.
//!
//! These drive real `/bin/sh` processes through start, capture, matching
//! and exit.

#![cfg(unix)]

use std::time::Duration;

use e2e_harness::eventually::{Eventually, Pattern};
use e2e_harness::execution::{start, Command};
use e2e_harness::session::{SessionState, WaitOutcome};
use e2e_harness::HarnessError;

fn sh(line: &str) -> Command {
    Command::shell("/bin/sh", "-c", line)
}

fn quick() -> Eventually {
    Eventually::new(Duration::from_secs(2), Duration::from_millis(10))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delayed_output_is_matched() {
    let mut session = start(&sh("sleep 0.2; echo 'created app-123'")).unwrap();
    let pattern = Pattern::new(r"created app-\d+").unwrap();

    let outcome = quick().say(session.out(), &pattern).await;
    assert!(outcome.is_satisfied(), "{}", outcome);

    let status = session.wait_for_exit(Duration::from_secs(2)).await.unwrap();
    assert!(status.success());
    assert_eq!(session.state(), SessionState::Exited);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_is_an_outcome_not_an_error() {
    let mut session = start(&sh("exec sleep 5")).unwrap();
    let pattern = Pattern::new("never").unwrap();

    let outcome = Eventually::new(Duration::from_millis(100), Duration::from_millis(10))
        .say(session.out(), &pattern)
        .await;
    let report = outcome.report().unwrap();
    assert!(!report.source_closed);
    assert!(report.waited >= Duration::from_millis(100));
    assert!(report.waited < Duration::from_millis(500), "{:?}", report.waited);

    session.kill().unwrap();
    let status = session.wait_for_exit(Duration::from_secs(2)).await.unwrap();
    assert_eq!(status.signal(), Some(libc::SIGKILL));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_capture_proceeds_without_reader() {
    let session = start(&sh("i=0; while [ $i -lt 2000 ]; do echo line-$i; i=$((i+1)); done")).unwrap();

    let status = session.wait_for_exit(Duration::from_secs(10)).await.unwrap();
    assert!(status.success());
    let text = session.stdout().text();
    assert!(text.starts_with("line-0\n"));
    assert!(text.ends_with("line-1999\n"));
    assert_eq!(text.lines().count(), 2000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_matching_does_not_consume_output() {
    let mut session = start(&sh("echo '=== demo Application'; echo 'owner: alice'")).unwrap();
    session.wait_for_exit(Duration::from_secs(2)).await.unwrap();

    let header = Pattern::new("=== demo Application").unwrap();
    let owner = Pattern::new("owner: alice").unwrap();
    assert!(quick().say(session.out(), &header).await.is_satisfied());
    assert!(quick().say(session.out(), &owner).await.is_satisfied());

    // the header is behind the session cursor but still in the buffer
    assert!(quick().say(session.out(), &header).await.is_timed_out());
    let mut fresh = session.stdout().cursor();
    assert!(quick().say(&mut fresh, &header).await.is_satisfied());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stdout_and_stderr_are_separate() {
    let mut session = start(&sh("echo out; echo 'Error: boom' >&2; exit 2")).unwrap();

    let error = e2e_harness::prepend_error("boom").unwrap();
    assert!(quick().say(session.err(), &error).await.is_satisfied());
    assert!(!error.is_match(&session.stdout().contents()));

    match session.wait(Duration::from_secs(2)).await {
        WaitOutcome::Exited(status) => assert_eq!(status.code(), Some(2)),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ansi_insensitive_cursor() {
    let session = start(&sh(r"printf '\033[32m=== demo Config\033[0m\n'")).unwrap();
    session.wait_for_exit(Duration::from_secs(2)).await.unwrap();

    let pattern = Pattern::new("=== demo Config").unwrap();
    let mut raw = session.stdout().cursor();
    let mut clean = session.stdout().cursor().strip_ansi(true);
    assert!(quick().say(&mut raw, &pattern).await.is_timed_out());
    assert!(quick().say(&mut clean, &pattern).await.is_satisfied());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_error_is_reported() {
    let err = start(&Command::new("/definitely/not/a/cli")).unwrap_err();
    assert!(matches!(err, HarnessError::Start { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exit_wait_is_bounded() {
    let session = start(&sh("exec sleep 5")).unwrap();
    let err = session
        .wait_for_exit(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::ExitTimeout { .. }));
    session.terminate().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_env_is_explicit() {
    let command = sh("echo \"[$ONLY_IN_CHILD]\"").with_env(
        e2e_harness::Env::new()
            .with("PATH", "/usr/bin:/bin")
            .with("ONLY_IN_CHILD", "yes"),
    );
    let mut session = start(&command).unwrap();

    assert!(quick()
        .say(session.out(), &Pattern::literal("[yes]").unwrap())
        .await
        .is_satisfied());
    assert!(std::env::var("ONLY_IN_CHILD").is_err());
}
