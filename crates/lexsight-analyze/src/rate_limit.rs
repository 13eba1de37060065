//! Minimum-spacing rate limiter for outbound model calls.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Ensures at least `min_delay` passes between consecutive calls.
///
/// Callers queue on the internal lock, so concurrent callers are spaced
/// out rather than released together.
pub struct RateLimiter {
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait until a call is allowed, then record it.
    pub async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait = self.min_delay - elapsed;
                debug!("Rate limited; waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();
        limiter.throttle().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_second_call_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(80));
        limiter.throttle().await;
        let start = Instant::now();
        limiter.throttle().await;
        assert!(start.elapsed() >= Duration::from_millis(70));
    }
}
