//! Wait mechanisms
//!
//! Conditions are polled against the page rather than slept through. The one
//! exception is the settle barrier before a screenshot: the engine offers no
//! animation-completion event, so a bounded idle delay is taken first and the
//! animation predicate is polled afterwards when enabled.

use crate::result::{PopshotError, PopshotResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default timeout for wait steps (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default idle delay before a screenshot (500ms)
pub const DEFAULT_SETTLE_IDLE_MS: u64 = 500;

/// Default budget for running animations to finish (5 seconds)
pub const DEFAULT_ANIMATION_TIMEOUT_MS: u64 = 5_000;

/// Options for a polling wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the condition was checked
    pub polls: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll `check` until it yields `true` or the timeout elapses.
///
/// The condition is always checked at least once, so a condition that already
/// holds succeeds even with a zero timeout. Errors from `check` abort the wait.
pub async fn poll_until<F, Fut>(
    options: &WaitOptions,
    waited_for: impl Into<String>,
    mut check: F,
) -> PopshotResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PopshotResult<bool>>,
{
    let waited_for = waited_for.into();
    let start = Instant::now();
    let mut polls = 0_u32;

    loop {
        polls += 1;
        if check().await? {
            tracing::trace!(%waited_for, polls, "condition met");
            return Ok(WaitResult {
                elapsed: start.elapsed(),
                polls,
                waited_for,
            });
        }
        if start.elapsed() >= options.timeout() {
            return Err(PopshotError::Timeout {
                ms: options.timeout_ms,
                waited_for,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// How the harness lets visual transitions finish before a screenshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleOptions {
    /// Fixed idle delay, taken first
    pub idle_ms: u64,
    /// Afterwards, poll until no animation or transition is running
    pub await_animations: bool,
    /// Budget for the animation poll
    pub animation_timeout_ms: u64,
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            idle_ms: DEFAULT_SETTLE_IDLE_MS,
            await_animations: true,
            animation_timeout_ms: DEFAULT_ANIMATION_TIMEOUT_MS,
        }
    }
}

impl SettleOptions {
    /// Blind fixed delay without the animation predicate
    #[must_use]
    pub const fn fixed(idle_ms: u64) -> Self {
        Self {
            idle_ms,
            await_animations: false,
            animation_timeout_ms: DEFAULT_ANIMATION_TIMEOUT_MS,
        }
    }

    /// Set the idle delay
    #[must_use]
    pub const fn with_idle_ms(mut self, idle_ms: u64) -> Self {
        self.idle_ms = idle_ms;
        self
    }

    /// Idle delay as Duration
    #[must_use]
    pub const fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    /// Wait options for the animation poll
    #[must_use]
    pub fn animation_wait(&self) -> WaitOptions {
        WaitOptions::new().with_timeout(self.animation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_wait_options_defaults() {
        let options = WaitOptions::default();
        assert_eq!(options.timeout(), Duration::from_secs(10));
        assert_eq!(options.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_wait_options_builder() {
        let options = WaitOptions::new().with_timeout(250).with_poll_interval(5);
        assert_eq!(options.timeout_ms, 250);
        assert_eq!(options.poll_interval_ms, 5);
    }

    #[test]
    fn test_settle_defaults() {
        let settle = SettleOptions::default();
        assert_eq!(settle.idle(), Duration::from_millis(500));
        assert!(settle.await_animations);
        assert!(!SettleOptions::fixed(100).await_animations);
    }

    #[test]
    fn test_settle_partial_yaml() {
        let settle: SettleOptions = serde_yaml_ng::from_str("idle_ms: 250").unwrap();
        assert_eq!(settle.idle_ms, 250);
        assert!(settle.await_animations);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_succeeds_immediately() {
        let result = poll_until(&WaitOptions::new().with_timeout(0), "ready", || async {
            Ok(true)
        })
        .await
        .unwrap();
        assert_eq!(result.polls, 1);
        assert_eq!(result.waited_for, "ready");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_succeeds_after_retries() {
        let counter = AtomicU32::new(0);
        let result = poll_until(&WaitOptions::new(), "third poll", || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(n >= 2) }
        })
        .await
        .unwrap();
        assert_eq!(result.polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out() {
        let options = WaitOptions::new().with_timeout(200).with_poll_interval(50);
        let err = poll_until(&options, "never", || async { Ok(false) })
            .await
            .unwrap_err();
        match err {
            PopshotError::Timeout { ms, waited_for } => {
                assert_eq!(ms, 200);
                assert_eq!(waited_for, "never");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_propagates_check_errors() {
        let err = poll_until(&WaitOptions::new(), "broken", || async {
            Err::<bool, _>(PopshotError::page("detached"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PopshotError::Page { .. }));
    }
}
