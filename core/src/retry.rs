//! Retry with exponential backoff for idempotent remote reads
//!
//! Writes are never routed through here: a failed `POST /directory` goes
//! straight to the local fallback path.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::config::RetryConfig;

/// Whether an error is worth another attempt.
pub trait RetryClassifiable {
    fn is_retryable(&self) -> bool;
}

impl RetryConfig {
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.initial_backoff_ms))
            .with_max_delay(Duration::from_millis(self.max_backoff_ms))
            .with_factor(self.backoff_multiplier)
            .with_max_times(self.max_attempts)
    }
}

/// Run `operation`, retrying transient failures as configured.
///
/// Permanent errors (per [`RetryClassifiable`]) are returned immediately;
/// once retries are exhausted the last error is returned.
pub async fn execute_with_backoff<F, Fut, T, E>(
    operation: F,
    config: &RetryConfig,
    what: &'static str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + RetryClassifiable,
{
    operation
        .retry(config.backoff())
        .when(E::is_retryable)
        .notify(|err: &E, sleep: Duration| {
            tracing::debug!(
                operation = what,
                error = %err,
                sleep_ms = sleep.as_millis() as u64,
                "Retrying remote call"
            );
        })
        .await
}
