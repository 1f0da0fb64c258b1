//! Bounded retry of rate-limited async operations.

use crate::{RetrySignal, RetryableError};
use ensemble_error::{EnsembleError, EnsembleResult, RunError, RunErrorKind};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// Retry tunables.
///
/// The n-th backoff delay (counting from zero) is
/// `clamp(base_delay * multiplier^n, min_delay, max_delay)`. When the error
/// names a wait, the delay is that wait plus `safety_margin` instead.
///
/// # Example
///
/// ```toml
/// [retry]
/// max_attempts = 5
/// base_delay_ms = 1000
/// multiplier = 2
/// min_delay_ms = 4000
/// max_delay_ms = 60000
/// safety_margin_ms = 1000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total calls allowed, including the first
    pub max_attempts: u32,
    /// Delay before scaling, in milliseconds
    pub base_delay_ms: u64,
    /// Growth factor per retry
    pub multiplier: u32,
    /// Lower bound of a backoff delay, in milliseconds
    pub min_delay_ms: u64,
    /// Upper bound of a backoff delay, in milliseconds
    pub max_delay_ms: u64,
    /// Added on top of a server-suggested wait, in milliseconds
    pub safety_margin_ms: u64,
    /// Randomise backoff delays (never applied to server-suggested waits)
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            multiplier: 2,
            min_delay_ms: 4000,
            max_delay_ms: 60_000,
            safety_margin_ms: 1000,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Server-suggested wait plus the safety margin.
    pub fn hinted_delay(&self, wait: Duration) -> Duration {
        wait + Duration::from_millis(self.safety_margin_ms)
    }

    /// Backoff delay before retry number `n` (zero-based).
    pub fn backoff_delay(&self, n: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(n);
        let millis = self
            .base_delay_ms
            .saturating_mul(factor)
            .clamp(self.min_delay_ms, self.max_delay_ms.max(self.min_delay_ms));
        Duration::from_millis(millis)
    }

    /// The delays between attempts, one fewer than `max_attempts`.
    pub fn schedule(self) -> impl Iterator<Item = Duration> {
        let policy = self;
        (0..self.max_attempts.saturating_sub(1)).map(move |n| {
            let delay = policy.backoff_delay(n);
            if policy.jitter {
                tokio_retry2::strategy::jitter(delay)
            } else {
                delay
            }
        })
    }
}

/// Run `operation`, retrying it while it fails with a rate-limit error.
///
/// - Success returns immediately.
/// - A fatal error (see [`RetryableError`]) propagates on first occurrence.
/// - A rate-limit error sleeps for the suggested wait plus the safety margin,
///   or the next backoff delay, then calls again, up to `max_attempts` calls.
/// - Once the attempts are used up the last rate-limit error is reported as
///   [`RunErrorKind::RetryExhausted`].
///
/// Sleeping uses the tokio timer, so only the calling task waits.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = with_retry(&policy, || engine.run_task(&task)).await?;
/// ```
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> EnsembleResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EnsembleResult<T>>,
{
    let policy = *policy;
    let max_attempts = policy.max_attempts.max(1);
    let attempts = AtomicU32::new(0);

    let result = Retry::spawn(policy.schedule(), || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let call = operation();
        async move {
            match call.await {
                Ok(value) => {
                    debug!(attempt, "Operation succeeded");
                    Ok(value)
                }
                Err(err) => match err.retry_signal() {
                    RetrySignal::Retryable { .. } if attempt >= max_attempts => {
                        warn!(attempt, "Rate limited, no attempts left: {}", err);
                        Err(RetryError::Permanent(err))
                    }
                    RetrySignal::Retryable { wait: Some(wait) } => {
                        let delay = policy.hinted_delay(wait);
                        warn!(
                            attempt,
                            wait_ms = delay.as_millis() as u64,
                            "Rate limited, waiting as suggested: {}",
                            err
                        );
                        Err(RetryError::Transient {
                            err,
                            retry_after: Some(delay),
                        })
                    }
                    RetrySignal::Retryable { wait: None } => {
                        warn!(attempt, "Rate limited, backing off: {}", err);
                        Err(RetryError::Transient {
                            err,
                            retry_after: None,
                        })
                    }
                    RetrySignal::Fatal => {
                        debug!(attempt, "Permanent error, failing immediately: {}", err);
                        Err(RetryError::Permanent(err))
                    }
                },
            }
        }
    })
    .await;

    result.map_err(|err| exhausted_or(err, attempts.load(Ordering::SeqCst)))
}

/// Tag a still-retryable error as exhaustion; pass anything else through.
fn exhausted_or(err: EnsembleError, attempts: u32) -> EnsembleError {
    match err.retry_signal() {
        RetrySignal::Retryable { .. } => RunError::new(RunErrorKind::RetryExhausted {
            attempts,
            last: err.to_string(),
        })
        .into(),
        RetrySignal::Fatal => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_clamped() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = policy.schedule().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(4),
                Duration::from_secs(4),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn backoff_reaches_ceiling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(10), Duration::from_secs(60));
        assert_eq!(policy.backoff_delay(200), Duration::from_secs(60));
    }

    #[test]
    fn single_attempt_has_no_delays() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.schedule().count(), 0);
    }

    #[test]
    fn hinted_delay_adds_margin() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.hinted_delay(Duration::from_secs(3)),
            Duration::from_secs(4)
        );
    }
}
