use crate::utils::time::sleep_with_jitter;
use std::future::Future;
use tracing::warn;

/// Upper bound for a single backoff step.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Retries `operation` with exponential backoff while the error is transient.
/// Permanent errors are returned immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    mut retries: u32,
    base_delay_ms: u64,
    operation: F,
) -> common::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = common::Result<T>>,
{
    let mut delay = base_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if retries == 0 {
                    warn!(error = %e, "Giving up after exhausting retries");
                    return Err(common::Error::MaxRetriesExceeded);
                }

                warn!(error = %e, delay_ms = delay, retries_left = retries, "Transient failure, retrying");
                retries -= 1;
                sleep_with_jitter(delay, delay / 2).await;
                delay = delay.saturating_mul(2).min(MAX_BACKOFF_MS);
            }
        }
    }
}
