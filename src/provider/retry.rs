// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for provider reads.
//!
//! Only idempotent reads (record listing) go through here. Writes are never
//! retried: a failed write is reported and the next run converges it.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::ProviderError;

/// Initial retry interval (200ms)
const INITIAL_INTERVAL_MILLIS: u64 = 200;

/// Maximum interval between retries (10 seconds)
const MAX_INTERVAL_SECS: u64 = 10;

/// Maximum total time to spend retrying (1 minute)
const MAX_ELAPSED_TIME_SECS: u64 = 60;

/// Each interval is this many times the previous one
const BACKOFF_MULTIPLIER: u32 = 2;

/// Jitter applied to every delay (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Doubling delays with jitter, capped per step and bounded in total.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    interval: Duration,
    max_interval: Duration,
    deadline: Instant,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(initial_interval: Duration, max_interval: Duration, max_elapsed: Duration) -> Self {
        Self {
            interval: initial_interval,
            max_interval,
            deadline: Instant::now() + max_elapsed,
        }
    }

    /// The next delay, or `None` once the total retry budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if Instant::now() >= self.deadline {
            return None;
        }
        let secs = self.interval.as_secs_f64();
        self.interval = self
            .interval
            .saturating_mul(BACKOFF_MULTIPLIER)
            .min(self.max_interval);

        let delta = secs * RANDOMIZATION_FACTOR;
        Some(Duration::from_secs_f64(rand::random_range(
            (secs - delta)..=(secs + delta),
        )))
    }
}

/// Backoff used for provider record listing.
///
/// Retries occur at roughly 200ms, 400ms, 800ms, 1.6s, 3.2s, 6.4s, then every
/// 10s until one minute has elapsed.
#[must_use]
pub fn read_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Duration::from_secs(MAX_ELAPSED_TIME_SECS),
    )
}

/// Determine if an HTTP status code is retryable.
///
/// 429 (rate limiting) and 500/502/503/504 are transient; everything else,
/// including 401/403, fails immediately.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Whether a provider error is worth retrying for an idempotent read.
#[must_use]
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::Connection { .. } => true,
        ProviderError::Http { status, .. } => is_retryable_status(*status),
        _ => false,
    }
}

/// Run an idempotent provider read, retrying transient failures.
///
/// # Errors
///
/// Returns the last error once it is non-retryable or the backoff is exhausted.
pub async fn retry_read<T, F, Fut>(
    operation_name: &str,
    mut backoff: ExponentialBackoff,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "Provider read succeeded after retries");
                }
                return Ok(value);
            }
            Err(e) if is_retryable(&e) => match backoff.next_backoff() {
                Some(delay) => {
                    warn!(
                        operation = operation_name,
                        attempt,
                        retry_after = ?delay,
                        error = %e,
                        "Retryable provider error, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
