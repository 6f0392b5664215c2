use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Per-worker pacing: successive requests from one worker start at least `interval` apart.
/// With N workers the effective pacing across the pool is `interval / N`.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_start: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_start: None }
    }

    /// Wait until the next request may start, then mark it as started.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_start {
            if !self.interval.is_zero() {
                sleep_until(last + self.interval).await;
            }
        }
        self.last_start = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_requests_by_interval() {
        let mut pacer = Pacer::new(Duration::from_secs(2));
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_millis(10));
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_sleeps() {
        let mut pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.wait().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
