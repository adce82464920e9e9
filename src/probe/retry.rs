//! Probe-private retry policy.
//!
//! The orchestrator never retries; probes that talk to flaky providers
//! wrap their transport call with [`with_retries`].

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Delay between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

/// Run `op` up to `retries + 1` times, returning the first success or the
/// last error.
pub async fn with_retries<T, E, F, Fut>(retries: usize, backoff: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries => {
                attempt += 1;
                debug!("Attempt {} failed: {}; retrying", attempt, e);
                tokio::time::sleep(backoff * attempt as u32).await;
            }
            Err(e) => return Err(e),
        }
    }
}
