//! Bounded retry with capped exponential backoff.
//!
//! Used by the HTTP client for transient network failures and by the
//! pipeline for its missing-board sweep.

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

/// Attempt cap plus backoff schedule: the sleep after attempt `n` is
/// `min(cap, base * 2^(n-1))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Same attempt cap, no sleeping. Used by tests and dry runs.
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// What an attempt tells the retry loop.
#[derive(Debug)]
pub enum Step<T, E> {
    /// Finished; stop with this value.
    Done(T),
    /// Failed but worth repeating after the backoff delay.
    Retry(E),
    /// Failed but made progress; repeat without sleeping.
    RetryNow(E),
    /// Failed permanently; stop without further attempts.
    Abort(E),
}

/// Final failure of a retried operation.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `operation` until it reports `Done`, `Abort`s, or the attempt cap is
/// reached. The closure receives the 1-based attempt number and must be
/// safe to repeat.
pub async fn retry<T, E, F, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<(T, u32), Exhausted<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Step<T, E>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        if attempt > 1 {
            debug!("{}: attempt {}/{}", operation_name, attempt, policy.max_attempts);
        }

        let (err, sleep) = match operation(attempt).await {
            Step::Done(value) => return Ok((value, attempt)),
            Step::Abort(err) => {
                return Err(Exhausted {
                    attempts: attempt,
                    last_error: err,
                });
            }
            Step::Retry(err) => (err, true),
            Step::RetryNow(err) => (err, false),
        };

        if attempt >= policy.max_attempts {
            warn!(
                "{}: giving up after {} attempts: {}",
                operation_name, attempt, err
            );
            return Err(Exhausted {
                attempts: attempt,
                last_error: err,
            });
        }

        if sleep {
            let delay = policy.delay_after(attempt);
            warn!(
                "{}: attempt {} failed ({}), retrying in {:?}",
                operation_name, attempt, err, delay
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        } else {
            debug!("{}: attempt {} made progress ({}), retrying", operation_name, attempt, err);
        }
    }
}
