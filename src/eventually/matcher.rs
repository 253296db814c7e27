//! Bounded polling.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use super::condition::{Check, Condition, Probe, Say};
use super::pattern::Pattern;
use crate::config::TimeoutSection;
use crate::error::HarnessError;
use crate::output::tail;
use crate::session::StreamCursor;
use crate::Result;

/// Characters of observed output kept in a timeout report.
const REPORT_TAIL_CHARS: usize = 2048;

/// Why an eventual assertion gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutReport {
    /// What was awaited.
    pub expected: String,
    /// The source as last seen.
    pub last_observed: String,
    /// How long the matcher waited.
    pub waited: Duration,
    /// The source ended and could no longer satisfy the condition.
    pub source_closed: bool,
}

impl fmt::Display for TimeoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timed out after {:?} waiting for {}; last observed: {:?}",
            self.waited,
            self.expected,
            tail(&self.last_observed, REPORT_TAIL_CHARS)
        )?;
        if self.source_closed {
            f.write_str(" (stream closed)")?;
        }
        Ok(())
    }
}

/// Result of an eventual assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    Satisfied,
    TimedOut(TimeoutReport),
}

impl Outcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Outcome::Satisfied)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut(_))
    }

    /// The report, if the assertion timed out.
    pub fn report(&self) -> Option<&TimeoutReport> {
        match self {
            Outcome::Satisfied => None,
            Outcome::TimedOut(report) => Some(report),
        }
    }

    /// Turn a timeout into [`HarnessError::TimedOut`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Outcome::Satisfied => Ok(()),
            Outcome::TimedOut(report) => Err(HarnessError::TimedOut(report)),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Satisfied => f.write_str("satisfied"),
            Outcome::TimedOut(report) => report.fmt(f),
        }
    }
}

/// Polls a condition until it holds or a deadline passes.
///
/// The condition is always evaluated at least once, even with a zero
/// timeout. Between evaluations the matcher sleeps for the poll interval,
/// cut short so it never sleeps past the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eventually {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for Eventually {
    fn default() -> Self {
        Self::from_config(&TimeoutSection::default())
    }
}

impl Eventually {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Matcher with the configured default timeout and poll interval.
    pub fn from_config(timeouts: &TimeoutSection) -> Self {
        Self::new(timeouts.default_timeout(), timeouts.poll_interval())
    }

    /// Override the timeout.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the poll interval.
    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait for `pattern` to appear after `cursor`, advancing it past the match.
    pub async fn say(&self, cursor: &mut StreamCursor, pattern: &Pattern) -> Outcome {
        self.until_condition(Say::new(cursor, pattern)).await
    }

    /// Wait for `probe` to return true.
    pub async fn until<F>(&self, description: &str, probe: F) -> Outcome
    where
        F: FnMut() -> bool,
    {
        self.until_condition(Probe::new(description, probe)).await
    }

    /// Wait for an asynchronous probe to resolve to true.
    pub async fn until_async<F, Fut>(&self, description: &str, mut probe: F) -> Outcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let started = Instant::now();
        let deadline = started + self.timeout;
        loop {
            if probe().await {
                debug!(condition = description, elapsed = ?started.elapsed(), "satisfied");
                return Outcome::Satisfied;
            }
            if !self.pause(deadline).await {
                return self.timed_out(description.to_string(), "false".into(), started, false);
            }
        }
    }

    /// Wait for an arbitrary [`Condition`].
    pub async fn until_condition<C: Condition>(&self, mut condition: C) -> Outcome {
        let started = Instant::now();
        let deadline = started + self.timeout;
        loop {
            match condition.check() {
                Check::Satisfied => {
                    debug!(
                        condition = %condition.describe(),
                        elapsed = ?started.elapsed(),
                        "satisfied"
                    );
                    return Outcome::Satisfied;
                }
                Check::Settled(observed) => {
                    return self.timed_out(condition.describe(), observed, started, true);
                }
                Check::Pending(observed) => {
                    if !self.pause(deadline).await {
                        return self.timed_out(condition.describe(), observed, started, false);
                    }
                }
            }
        }
    }

    /// Sleep until the next poll; false once the deadline has passed.
    async fn pause(&self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let nap = self.poll_interval.min(deadline - now);
        trace!("next poll in {:?}", nap);
        tokio::time::sleep(nap).await;
        true
    }

    fn timed_out(
        &self,
        expected: String,
        last_observed: String,
        started: Instant,
        source_closed: bool,
    ) -> Outcome {
        let report = TimeoutReport {
            expected,
            last_observed,
            waited: started.elapsed(),
            source_closed,
        };
        debug!("{}", report);
        Outcome::TimedOut(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::OutputBuffer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn quick() -> Eventually {
        Eventually::new(Duration::from_millis(500), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_say_immediate_match() {
        let buffer = OutputBuffer::new();
        buffer.append(b"ready\n");
        let mut cursor = buffer.cursor();
        let pattern = Pattern::new("ready").unwrap();

        assert!(quick().say(&mut cursor, &pattern).await.is_satisfied());
        assert_eq!(cursor.offset(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_say_waits_for_late_output() {
        let buffer = OutputBuffer::new();
        let writer = buffer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            writer.append(b"created app-123\n");
        });

        let mut cursor = buffer.cursor();
        let pattern = Pattern::new(r"created app-\d+").unwrap();
        let outcome = quick().within(Duration::from_secs(2)).say(&mut cursor, &pattern).await;
        assert!(outcome.is_satisfied(), "{}", outcome);
    }

    #[tokio::test]
    async fn test_say_times_out_with_report() {
        let buffer = OutputBuffer::new();
        buffer.append(b"creating...");
        let mut cursor = buffer.cursor();
        let pattern = Pattern::new("created").unwrap();

        let outcome = Eventually::new(Duration::from_millis(30), Duration::from_millis(5))
            .say(&mut cursor, &pattern)
            .await;
        let report = outcome.report().cloned().unwrap();
        assert_eq!(report.last_observed, "creating...");
        assert!(!report.source_closed);
        assert!(report.waited >= Duration::from_millis(30));
        assert_eq!(cursor.offset(), 0);
    }

    #[tokio::test]
    async fn test_closed_stream_ends_wait_early() {
        let buffer = OutputBuffer::new();
        buffer.append(b"bye");
        buffer.close();
        let mut cursor = buffer.cursor();
        let pattern = Pattern::new("hello").unwrap();

        let outcome = Eventually::new(Duration::from_secs(30), Duration::from_millis(5))
            .say(&mut cursor, &pattern)
            .await;
        let report = outcome.report().unwrap();
        assert!(report.source_closed);
        assert!(report.waited < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sequential_says_must_be_ordered() {
        let buffer = OutputBuffer::new();
        buffer.append(b"second\nfirst\n");
        buffer.close();
        let mut cursor = buffer.cursor();

        let first = Pattern::new("first").unwrap();
        let second = Pattern::new("second").unwrap();
        assert!(quick().say(&mut cursor, &first).await.is_satisfied());
        assert!(quick().say(&mut cursor, &second).await.is_timed_out());
        assert_eq!(buffer.text(), "second\nfirst\n");
    }

    #[tokio::test]
    async fn test_zero_timeout_checks_once() {
        let calls = AtomicUsize::new(0);
        let outcome = Eventually::new(Duration::ZERO, Duration::from_millis(5))
            .until("never", || {
                calls.fetch_add(1, Ordering::SeqCst);
                false
            })
            .await;
        assert!(outcome.is_timed_out());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_until_probe() {
        let mut n = 0;
        let outcome = quick()
            .until("counter reaches 3", || {
                n += 1;
                n == 3
            })
            .await;
        assert!(outcome.is_satisfied());
    }

    #[tokio::test]
    async fn test_until_async() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = quick()
            .until_async("async probe", || {
                let calls = calls.clone();
                async move { calls.fetch_add(1, Ordering::SeqCst) >= 2 }
            })
            .await;
        assert!(outcome.is_satisfied());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_into_result() {
        assert!(Outcome::Satisfied.into_result().is_ok());
        let outcome = Eventually::new(Duration::from_millis(10), Duration::from_millis(5))
            .until("nothing", || false)
            .await;
        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, HarnessError::TimedOut(_)));
        assert!(err.to_string().contains("nothing"));
    }

    #[test]
    fn test_report_display_truncates() {
        let report = TimeoutReport {
            expected: "output matching /x/".into(),
            last_observed: "y".repeat(5000),
            waited: Duration::from_millis(10),
            source_closed: true,
        };
        let text = report.to_string();
        assert!(text.len() < 2200);
        assert!(text.contains("..."));
        assert!(text.ends_with("(stream closed)"));
    }

    #[test]
    fn test_default_from_config() {
        let e = Eventually::default();
        assert_eq!(e.timeout(), Duration::from_secs(60));
        assert_eq!(e.poll_interval(), Duration::from_millis(50));
    }
}
