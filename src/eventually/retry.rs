//! Retrying idempotent external checks.

use std::future::Future;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::config::RetrySection;
use crate::execution::{self, Command};

/// Delay between attempts used by [`retry_until`].
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Re-invokes a probe until it returns an expected value.
///
/// Unlike [`Eventually`](super::Eventually) this is bounded by a number of
/// attempts, not a deadline, and knows nothing about sessions: the probe is
/// an opaque external check such as an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryProbe {
    attempts: u32,
    delay: Duration,
}

impl Default for RetryProbe {
    fn default() -> Self {
        Self::from_config(&RetrySection::default())
    }
}

impl RetryProbe {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    pub fn from_config(retry: &RetrySection) -> Self {
        Self::new(retry.attempts, retry.delay())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Call `probe` up to `attempts` times, returning true on the first
    /// result equal to `expected`.
    ///
    /// The delay is only slept between attempts, never after the last one.
    pub async fn until<T, F, Fut>(&self, mut probe: F, expected: &T) -> bool
    where
        T: PartialEq + std::fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
    {
        for attempt in 1..=self.attempts {
            let got = probe().await;
            if &got == expected {
                debug!(attempt, "probe returned {:?}", got);
                return true;
            }
            debug!(attempt, of = self.attempts, "probe returned {:?}, want {:?}", got, expected);
            if attempt < self.attempts {
                tokio::time::sleep(self.delay).await;
            }
        }
        false
    }
}

/// [`RetryProbe::until`] with [`DEFAULT_RETRY_DELAY`] between attempts.
pub async fn retry_until<T, F, Fut>(probe: F, expected: &T, attempts: u32) -> bool
where
    T: PartialEq + std::fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
{
    RetryProbe::new(attempts, DEFAULT_RETRY_DELAY)
        .until(probe, expected)
        .await
}

/// A probe that runs `command` and yields its trimmed stdout.
///
/// A command that cannot be started or does not finish within `timeout`
/// yields an empty string, which counts as a miss rather than an error.
/// Typical use is `curl -s -o /dev/null -w '%{http_code}' <url>`.
pub fn command_probe(
    command: Command,
    timeout: Duration,
) -> impl FnMut() -> BoxFuture<'static, String> {
    move || {
        let command = command.clone();
        async move {
            match execution::execute(&command, timeout).await {
                Ok(result) if !result.timed_out => result.output_trimmed().to_string(),
                Ok(_) => {
                    warn!(command = %command.display_line(), "probe timed out after {:?}", timeout);
                    String::new()
                }
                Err(e) => {
                    warn!(command = %command.display_line(), "probe failed: {}", e);
                    String::new()
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_probe(
        succeed_on: u32,
    ) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<u16>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let probe = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n >= succeed_on { 200 } else { 503 })
        };
        (calls, probe)
    }

    #[tokio::test]
    async fn test_succeeds_on_later_attempt() {
        let (calls, probe) = counting_probe(3);
        let retry = RetryProbe::new(5, Duration::from_millis(1));
        assert!(retry.until(probe, &200).await);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let (calls, probe) = counting_probe(100);
        let retry = RetryProbe::new(4, Duration::from_millis(1));
        assert!(!retry.until(probe, &200).await);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_calls() {
        let (calls, probe) = counting_probe(1);
        assert!(!RetryProbe::new(0, Duration::from_secs(10)).until(probe, &200).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_delay_after_last_attempt() {
        let (_, probe) = counting_probe(100);
        let started = std::time::Instant::now();
        assert!(!RetryProbe::new(1, Duration::from_secs(5)).until(probe, &200).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retry_until_uses_default_delay() {
        let (calls, probe) = counting_probe(2);
        assert!(retry_until(probe, &200, 3).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_command_probe() {
        let command = Command::shell("/bin/sh", "-c", "printf ' 200\\n'");
        let probe = command_probe(command, Duration::from_secs(5));
        let retry = RetryProbe::new(2, Duration::from_millis(10));
        assert!(retry.until(probe, &"200".to_string()).await);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_command_probe_start_failure_is_a_miss() {
        let mut probe = command_probe(Command::new("/no/such/probe"), Duration::from_secs(1));
        assert_eq!(probe().await, "");
    }
}
