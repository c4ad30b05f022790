//! Bounded retry for transient provider errors.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use reels_providers::ProviderError;

/// Maximum delay between transient retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Run a provider call, retrying only transient (`Unavailable`) failures up
/// to `max_retries` extra attempts with doubling delay. `InvalidInput` and
/// `NotReady` are returned immediately.
pub async fn retry_transient<F, Fut, T>(
    max_retries: u32,
    base_delay: Duration,
    operation_name: &str,
    operation: F,
) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_retries => {
                attempt += 1;
                let delay = base_delay
                    .saturating_mul(2u32.pow(attempt - 1))
                    .min(MAX_RETRY_DELAY);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    operation_name, attempt, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
