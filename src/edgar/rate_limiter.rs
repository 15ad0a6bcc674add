use std::time::Duration;
use tokio::time::sleep;

/// Fixed pause between consecutive filings. EDGAR blocks clients that exceed
/// its request rate, so every filing after the first waits `interval`.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    started: bool,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        RateLimiter {
            interval,
            started: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait before the next filing. The first call returns immediately.
    pub async fn acquire(&mut self) {
        if !self.started {
            self.started = true;
            return;
        }
        if !self.interval.is_zero() {
            log::debug!("Pausing {:?} before next filing", self.interval);
            sleep(self.interval).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
