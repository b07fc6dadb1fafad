//! Bounded retry with a fixed delay.
//!
//! [`retry`] re-invokes an operation while its error satisfies a predicate.
//! Errors the predicate rejects are returned immediately. The delay is only
//! slept between attempts, never after the last one.

use std::time::Duration;
use thiserror::Error;

/// Attempt budget and delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Zero behaves like one.
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed with an error the predicate did not match.
    #[error("{0}")]
    Fatal(E),

    /// Every attempt failed with a retryable error.
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the retry loop ended.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

/// Run `op` under `policy`, sleeping on the current thread between attempts.
pub fn retry<T, E, P, F>(policy: RetryPolicy, should_retry: P, op: F) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    P: FnMut(&E) -> bool,
    F: FnMut() -> Result<T, E>,
{
    retry_with_sleep(policy, should_retry, op, std::thread::sleep)
}

/// [`retry`] with an injectable sleep, so callers can observe or skip delays.
pub fn retry_with_sleep<T, E, P, F, S>(
    policy: RetryPolicy,
    mut should_retry: P,
    mut op: F,
    mut sleep: S,
) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    P: FnMut(&E) -> bool,
    F: FnMut() -> Result<T, E>,
    S: FnMut(Duration),
{
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if !should_retry(&e) => return Err(RetryError::Fatal(e)),
            Err(e) if attempt == attempts => {
                return Err(RetryError::Exhausted { attempts, last: e });
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_secs = policy.delay.as_secs_f64(),
                    error = %e,
                    "retrying after error"
                );
                sleep(policy.delay);
            }
        }
    }

    unreachable!("retry loop always returns on the last attempt")
}
