//! Bounded exponential-backoff retry for remote calls
//!
//! Distinguishes "the request itself was wrong" (4xx other than 429,
//! propagated immediately) from "the server or network was momentarily
//! unavailable" (5xx, 429, statusless failures), which is retried because
//! every wrapped operation is an idempotent read or idempotent-by-id
//! write. Classification lives on `MachinaError::is_retryable`.

use machina_core::MachinaResult;
use std::future::Future;
use std::time::Duration;

/// Run `op`, retrying transient failures with exponential backoff.
///
/// At most `max_attempts` total attempts are made; the delay before the
/// i-th retry (0-based) is `base_delay * 2^i`. The last-seen error
/// surfaces when the budget is exhausted. Sleeps are non-blocking and
/// retries run to completion - there is no cancellation.
pub async fn with_retry<T, F, Fut>(
    mut op: F,
    max_attempts: u32,
    base_delay: Duration,
) -> MachinaResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MachinaResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt + 1 >= max_attempts {
                    return Err(err);
                }

                let delay = base_delay * 2u32.saturating_pow(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
