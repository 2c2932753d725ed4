//! Retry wrapper: exponential backoff with jitter for transient backend failures.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chatloom_core::{CompletionBackend, CompletionRequest, CompletionResponse};

use crate::error::is_transient;

/// Retry policy for completion calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier for each subsequent wait.
    pub backoff_factor: f64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Add ±25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 500,
            backoff_factor: 2.0,
            max_delay_ms: 10_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay after failed attempt `attempt_number` (1-indexed).
    pub fn delay_for(&self, attempt_number: u32) -> Duration {
        if attempt_number == 0 {
            return Duration::ZERO;
        }
        let delay_ms =
            self.base_delay_ms as f64 * self.backoff_factor.powi((attempt_number - 1) as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64) as u64;

        let delay_ms = if self.jitter {
            let jitter = (delay_ms / 4) as i64;
            let offset: i64 = if jitter > 0 {
                (rand_offset() % (jitter as u64 * 2)) as i64 - jitter
            } else {
                0
            };
            (delay_ms as i64 + offset).max(0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms)
    }

    pub fn should_retry(&self, attempt_number: u32) -> bool {
        attempt_number < self.max_attempts
    }
}

/// xorshift64; jitter does not need a real RNG.
fn rand_offset() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEED: AtomicU64 = AtomicU64::new(0x9e3779b97f4a7c15);
    let x = SEED.load(Ordering::Relaxed);
    let x = x ^ (x << 13);
    let x = x ^ (x >> 7);
    let x = x ^ (x << 17);
    SEED.store(x, Ordering::Relaxed);
    x
}

/// Retries the wrapped backend according to a [`RetryPolicy`].
///
/// Only transient failures (see [`is_transient`]) are retried; anything else
/// is returned after the first attempt. Calls stay sequential: the next attempt starts only after the previous one
/// has failed and the backoff has elapsed.
pub struct RetryingBackend {
    inner: Arc<dyn CompletionBackend>,
    policy: RetryPolicy,
}

impl RetryingBackend {
    pub fn new(inner: Arc<dyn CompletionBackend>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CompletionBackend for RetryingBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.complete(request).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(provider = %self.inner.name(), attempt, "Completion succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if is_transient(&e) && self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        provider = %self.inner.name(),
                        attempt,
                        max = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Completion failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!(provider = %self.inner.name(), attempt, "Completion retries exhausted");
                    } else if self.policy.max_attempts > 1 {
                        debug!(provider = %self.inner.name(), error = %e, "Completion failed permanently, not retrying");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use chatloom_core::GenerationParams;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 0,
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn exponential_backoff_grows() {
        let policy = RetryPolicy {
            jitter: false,
            ..Default::default()
        };
        let d1 = policy.delay_for(1).as_millis();
        let d2 = policy.delay_for(2).as_millis();
        let d3 = policy.delay_for(3).as_millis();
        assert!(d2 > d1, "delay should grow: {d1} < {d2}");
        assert!(d3 > d2, "delay should grow: {d2} < {d3}");
    }

    #[test]
    fn respects_max_delay() {
        let policy = RetryPolicy {
            max_delay_ms: 5_000,
            jitter: false,
            ..Default::default()
        };
        let d10 = policy.delay_for(10).as_millis();
        assert!(d10 <= 5_000, "delay capped at max: {d10}");
    }

    #[test]
    fn jitter_stays_within_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let d = policy.delay_for(1).as_millis();
            assert!((375..=625).contains(&d), "jittered delay out of range: {d}");
        }
    }

    #[test]
    fn none_never_retries() {
        assert!(!RetryPolicy::none().should_retry(1));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mock = Arc::new(
            MockBackend::new("mock")
                .then_fail_status(503, "overloaded")
                .then_reply("ok"),
        );
        let backend = RetryingBackend::new(mock.clone(), instant_policy(3));
        let req = CompletionRequest::new("p", GenerationParams::default());

        let resp = backend.complete(&req).await.unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mock = Arc::new(
            MockBackend::new("mock")
                .then_fail_status(503, "overloaded")
                .then_fail_status(503, "overloaded")
                .then_fail_status(503, "overloaded"),
        );
        let backend = RetryingBackend::new(mock.clone(), instant_policy(2));
        let req = CompletionRequest::new("p", GenerationParams::default());

        assert!(backend.complete(&req).await.is_err());
        assert_eq!(mock.calls(), 2);
        assert_eq!(backend.name(), "mock");
    }

    #[tokio::test]
    async fn retries_rate_limits() {
        let mock = Arc::new(
            MockBackend::new("mock")
                .then_fail_status(429, "rate limited")
                .then_reply("ok"),
        );
        let backend = RetryingBackend::new(mock.clone(), instant_policy(2));
        let req = CompletionRequest::new("p", GenerationParams::default());

        assert_eq!(backend.complete(&req).await.unwrap().content, "ok");
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let mock = Arc::new(
            MockBackend::new("mock")
                .then_fail_status(401, "bad key")
                .then_reply("never reached"),
        );
        let backend = RetryingBackend::new(mock.clone(), instant_policy(2));
        let req = CompletionRequest::new("p", GenerationParams::default());

        let err = backend.complete(&req).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn oversized_prompt_is_not_retried() {
        let mock = Arc::new(MockBackend::new("mock").then_fail_status(400, "context_length_exceeded"));
        let backend = RetryingBackend::new(mock.clone(), instant_policy(3));
        let req = CompletionRequest::new("p", GenerationParams::default());

        assert!(backend.complete(&req).await.is_err());
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn untyped_failure_is_not_retried() {
        let mock = Arc::new(MockBackend::new("mock").then_fail("no choices"));
        let backend = RetryingBackend::new(mock.clone(), instant_policy(3));
        let req = CompletionRequest::new("p", GenerationParams::default());

        assert!(backend.complete(&req).await.is_err());
        assert_eq!(mock.calls(), 1);
    }
}
