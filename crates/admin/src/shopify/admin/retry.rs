//! Backoff for throttled Admin API calls.
//!
//! Only rate limiting (HTTP 429 or a `THROTTLED` GraphQL error) is retried.
//! Everything else, transport failures included, propagates on the first
//! attempt.

use std::future::Future;
use std::time::Duration;

use crate::shopify::AdminShopifyError;

/// Upper bound for one backoff sleep, before `Retry-After` is applied.
const MAX_DELAY_MS: u64 = 60_000;

/// Retry settings for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay; attempt `n` sleeps about `base * 2^n`.
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (zero-based).
    ///
    /// `base * 2^attempt`, jittered by ±25%, capped at one minute, and never
    /// shorter than the server's `Retry-After`.
    #[must_use]
    pub fn delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let exponential = self
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.min(32))
            .min(MAX_DELAY_MS);
        let jitter = rand::random::<f64>().mul_add(0.5, 0.75);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jittered = ((exponential as f64) * jitter) as u64;
        let floor = retry_after_secs.unwrap_or(0).saturating_mul(1_000);
        Duration::from_millis(jittered.min(MAX_DELAY_MS).max(floor))
    }
}

const fn is_retriable(err: &AdminShopifyError) -> bool {
    err.is_rate_limited()
}

/// Run `operation`, retrying the identical request while it is throttled.
///
/// # Errors
///
/// Returns the first non-retriable error, or the last rate-limit error once
/// `max_retries` retries are spent.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, AdminShopifyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdminShopifyError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= policy.max_retries {
            return Err(err);
        }

        let retry_after_secs = match &err {
            AdminShopifyError::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        };
        let delay = policy.delay(attempt, retry_after_secs);
        tracing::warn!(
            attempt,
            max_retries = policy.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "throttled by Shopify, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
