use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay`: Pause between attempts
/// - `retryable`: Whether an error may be retried; anything else fails at once
///
/// # Returns
/// Either the successful result or the error from the last attempt
pub async fn with_retry<F, Fut, T, E, R>(
    mut operation: F,
    retries: usize,
    delay: Duration,
    retryable: R,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Error>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries || !retryable(&err) {
                    return Err(err.into());
                }
                let err: Error = err.into();
                debug!(attempt, retries, error = %err, "Attempt failed, retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
