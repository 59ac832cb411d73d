// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry primitives for the Tidings messaging pipeline.
//!
//! A [`RetryPolicy`] describes how often and with what backoff an operation
//! may be retried; [`retry`] executes a fallible async operation under a
//! policy. Keeping the policy separate from the operation makes retry
//! behavior testable without network mocking.

use std::time::Duration;

use tracing::warn;

/// Backoff schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// No delay between attempts.
    None,
    /// Delay grows linearly: `attempt × step` after the n-th failed attempt
    /// (1-based), i.e. `step`, `2×step`, ...
    Linear(Duration),
    /// The same delay after every failed attempt.
    Fixed(Duration),
}

/// A bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Linear backoff: up to `max_attempts` attempts with delays of
    /// `step`, `2×step`, ... between them.
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear(step),
        }
    }

    /// Fixed backoff: up to `max_attempts` attempts with `delay` between them.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Delay to wait after the given failed attempt (1-based), or `None`
    /// when no attempts remain.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match self.backoff {
            Backoff::None => Some(Duration::ZERO),
            Backoff::Linear(step) => Some(step * attempt),
            Backoff::Fixed(delay) => Some(delay),
        }
    }
}

/// The result of executing an operation under a retry policy.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final success, or the error of the last attempt.
    pub result: Result<T, E>,
    /// Number of attempts actually made (1..=max_attempts).
    pub attempts: u32,
}

/// Execute `op` under `policy`, stopping on first success or after
/// exhausting attempts.
///
/// The last error is returned in the outcome rather than being swallowed,
/// so callers can persist a terminal failure reason.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    debug_assert!(policy.max_attempts > 0);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) => match policy.delay_after(attempt) {
                Some(delay) => {
                    warn!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "attempt failed, retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                None => {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
            },
        }
    }
}
