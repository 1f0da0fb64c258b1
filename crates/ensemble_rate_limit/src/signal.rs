//! Classification of errors into retryable and fatal.

use ensemble_error::{EnsembleError, RunErrorKind};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Text providers embed in rate-limit messages ahead of the suggested wait.
const RETRY_HINT: &str = "Please try again in ";

static RETRY_AFTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Please try again in (\d+(?:\.\d+)?)\s*(ms|s)\b")
        .unwrap_or_else(|e| panic!("retry-after pattern is invalid: {e}"))
});

/// How a failed call should be treated by [`with_retry`](crate::with_retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrySignal {
    /// Rate-limit-class failure; retry after `wait` when the provider named one
    Retryable {
        /// Server-suggested wait, if any
        wait: Option<Duration>,
    },
    /// Anything else; propagate immediately
    Fatal,
}

/// Errors that can say whether they are worth retrying.
pub trait RetryableError {
    /// Classify this error.
    fn retry_signal(&self) -> RetrySignal;
}

impl RetryableError for EnsembleError {
    fn retry_signal(&self) -> RetrySignal {
        match self.run_kind() {
            Some(RunErrorKind::RateLimited {
                message,
                retry_after,
            }) => RetrySignal::Retryable {
                // structured hints beat scraping the message
                wait: retry_after.or_else(|| parse_retry_after(message)),
            },
            _ => RetrySignal::Fatal,
        }
    }
}

/// Extract a suggested wait from a provider message.
///
/// Recognises `"Please try again in <n>s"` and `"... <n>ms"`. Anything that
/// does not parse yields `None`, leaving the caller on default backoff.
///
/// # Examples
///
/// ```
/// use ensemble_rate_limit::parse_retry_after;
/// use std::time::Duration;
///
/// assert_eq!(
///     parse_retry_after("Rate limit reached. Please try again in 3s."),
///     Some(Duration::from_secs(3)),
/// );
/// assert_eq!(
///     parse_retry_after("Please try again in 820ms"),
///     Some(Duration::from_millis(820)),
/// );
/// assert_eq!(parse_retry_after("Please try again in a moment"), None);
/// ```
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    if !message.contains(RETRY_HINT) {
        return None;
    }
    let captures = RETRY_AFTER_RE.captures(message)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let seconds = match captures.get(2)?.as_str() {
        "ms" => value / 1000.0,
        _ => value,
    };
    Duration::try_from_secs_f64(seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_error::{ConfigError, RunError};

    #[test]
    fn fractional_seconds() {
        assert_eq!(
            parse_retry_after("Please try again in 1.5s"),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn missing_hint_is_none() {
        assert_eq!(parse_retry_after("quota exceeded"), None);
    }

    #[test]
    fn structured_retry_after_wins() {
        let err: EnsembleError = RunError::new(RunErrorKind::RateLimited {
            message: "Please try again in 30s".to_string(),
            retry_after: Some(Duration::from_secs(2)),
        })
        .into();
        assert_eq!(
            err.retry_signal(),
            RetrySignal::Retryable {
                wait: Some(Duration::from_secs(2))
            }
        );
    }

    #[test]
    fn message_is_fallback() {
        let err: EnsembleError = RunError::new(RunErrorKind::RateLimited {
            message: "Please try again in 7s".to_string(),
            retry_after: None,
        })
        .into();
        assert_eq!(
            err.retry_signal(),
            RetrySignal::Retryable {
                wait: Some(Duration::from_secs(7))
            }
        );
    }

    #[test]
    fn other_errors_are_fatal() {
        let err: EnsembleError = ConfigError::new("nope").into();
        assert_eq!(err.retry_signal(), RetrySignal::Fatal);

        let err: EnsembleError = RunError::new(RunErrorKind::Invocation("boom".into())).into();
        assert_eq!(err.retry_signal(), RetrySignal::Fatal);
    }
}
