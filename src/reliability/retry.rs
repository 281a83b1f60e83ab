//! Bounded retry with exponential backoff.
//!
//! A single [`RetryPolicy`] drives every retry loop in the crate (page
//! transport, metadata payload fetches, transaction status polling), so all
//! of them share the same attempt accounting and delay schedule.
//!
//! # Example
//!
//! ```rust,ignore
//! use arscan::reliability::retry::{retry_async, RetryPolicy};
//!
//! let payload = retry_async(
//!     &RetryPolicy::default(),
//!     "fetch metadata",
//!     || async { gateway.fetch_payload(tx_id).await },
//!     |e| e.is_transient(),
//! ).await;
//! ```

use backon::{BackoffBuilder, ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants;

/// Retry behavior shared by every retried gateway interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry).
    pub factor: f32,
    /// Add random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(constants::DEFAULT_RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(constants::DEFAULT_RETRY_MAX_DELAY_MS),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Create a policy for quick operations (fewer attempts, shorter delays).
    #[must_use]
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            factor: 2.0,
            jitter: true,
        }
    }

    /// Set the total number of attempts. Values below one are clamped to one.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    /// Set initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Disable jitter, making the delay schedule deterministic.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    /// The delays the policy waits between attempts, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        self.build_backoff().build()
    }

    /// Build the exponential backoff strategy.
    fn build_backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries() as usize)
            .with_factor(self.factor);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Retry an async operation according to `policy`.
///
/// # Arguments
///
/// * `policy` - Retry policy
/// * `operation_name` - Name for logging
/// * `operation` - The async operation to retry
/// * `is_retryable` - Predicate to determine if an error is worth another attempt
///
/// # Returns
///
/// The result of the operation, or the last error if all attempts failed.
pub async fn retry_async<F, Fut, T, E, R>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let backoff = policy.build_backoff();
    let max_attempts = policy.max_attempts;

    let mut attempt = 0u32;
    let notify = |err: &E, dur: Duration| {
        attempt += 1;
        warn!(
            operation = %operation_name,
            attempt = attempt,
            max_attempts = max_attempts,
            next_delay_ms = dur.as_millis() as u64,
            error = %err,
            "Attempt failed, will retry"
        );
    };

    let result = operation
        .retry(backoff)
        .when(move |e| is_retryable(e))
        .notify(notify)
        .await;

    if let Err(e) = &result {
        debug!(
            operation = %operation_name,
            error = %e,
            "Giving up"
        );
    }
    result
}

/// Check if an HTTP status code is retryable.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}
