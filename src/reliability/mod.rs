//! Reliability primitives.

pub mod retry;

pub use retry::{RetryPolicy, is_retryable_status, retry_async};
