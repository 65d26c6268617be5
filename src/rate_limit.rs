//! Global request cadence.
//!
//! One [`RateLimiter`] is shared by every outbound request of a run, retries
//! included. It is not keyed by host.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Enforces a minimum spacing between consecutive outbound requests.
///
/// The spacing is measured from the moment the previous [`wait_turn`] returned,
/// not from when its request finished, so a slow response does not buy the
/// next request any extra delay.
///
/// [`wait_turn`]: RateLimiter::wait_turn
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A `min_interval` of zero turns the limiter into a no-op.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Wait until `min_interval` has passed since the previous call returned.
    ///
    /// The first call returns immediately. The lock is held across the sleep,
    /// so concurrent callers queue up behind each other.
    ///
    /// # Returns
    ///
    /// Once the caller may send its request. The slot is recorded as taken
    /// before returning, so the request should follow without further delay.
    pub async fn wait_turn(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(?wait, "Rate limiting outbound request");
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
