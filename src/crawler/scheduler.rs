//! Politeness scheduler
//!
//! This module handles:
//! - Randomized delay windows between queries (large) and page actions (small)
//! - Short settle pauses after scrolling
//! - Making every wait interruptible through the run's cancellation token

use crate::config::{PolitenessConfig, MAX_DELAY_SECS};
use crate::{HarvestError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which politeness window a delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    /// Between queries; sized to stay under the source's abuse detection
    Large,

    /// Between page-level actions (page settle, page advance, item downloads)
    Small,
}

/// A uniform delay range in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayWindow {
    min_secs: f64,
    max_secs: f64,
}

impl DelayWindow {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// Draws a delay uniformly from the window, clamped to `0..=MAX_DELAY_SECS`
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        let (min, max) = (bounded(self.min_secs), bounded(self.max_secs));
        if max <= min {
            return Duration::from_secs_f64(min);
        }
        Duration::from_secs_f64(rng.gen_range(min..=max))
    }
}

fn bounded(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_DELAY_SECS)
    }
}

/// Enforces the randomized delay windows
///
/// The draw does not depend on recent failures: there is no back-off.
pub struct RateScheduler {
    large: DelayWindow,
    small: DelayWindow,
    settle: Duration,
    rng: StdRng,
    cancel: CancellationToken,
}

impl RateScheduler {
    pub fn new(config: &PolitenessConfig, cancel: CancellationToken) -> Self {
        Self {
            large: DelayWindow::new(config.query_delay_min_secs, config.query_delay_max_secs),
            small: DelayWindow::new(config.action_delay_min_secs, config.action_delay_max_secs),
            settle: Duration::from_millis(config.scroll_settle_ms),
            rng: StdRng::from_entropy(),
            cancel,
        }
    }

    pub fn window(&self, kind: DelayKind) -> DelayWindow {
        match kind {
            DelayKind::Large => self.large,
            DelayKind::Small => self.small,
        }
    }

    /// Sleeps for a delay drawn from the `kind` window
    ///
    /// Returns the delay waited, or `HarvestError::Interrupted` as soon as the
    /// run is cancelled.
    pub async fn delay(&mut self, kind: DelayKind) -> Result<Duration> {
        let delay = self.window(kind).sample(&mut self.rng);
        match kind {
            DelayKind::Large => {
                tracing::info!("Waiting {:.1}s before the next query", delay.as_secs_f64())
            }
            DelayKind::Small => tracing::debug!("Waiting {:.1}s", delay.as_secs_f64()),
        }
        self.pause(delay).await?;
        Ok(delay)
    }

    /// Pause after a scroll so lazily rendered content can appear
    pub async fn settle(&self) -> Result<()> {
        self.pause(self.settle).await
    }

    /// Cancellable sleep
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(HarvestError::Interrupted),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(window: &DelayWindow, delay: Duration) -> bool {
        let secs = delay.as_secs_f64();
        secs >= window.min_secs - 1e-9 && secs <= window.max_secs + 1e-9
    }

    fn create_test_config(large: (f64, f64), small: (f64, f64)) -> PolitenessConfig {
        PolitenessConfig {
            query_delay_min_secs: large.0,
            query_delay_max_secs: large.1,
            action_delay_min_secs: small.0,
            action_delay_max_secs: small.1,
            scroll_settle_ms: 0,
        }
    }

    #[test]
    fn test_default_windows() {
        let scheduler =
            RateScheduler::new(&PolitenessConfig::default(), CancellationToken::new());

        assert_eq!(scheduler.window(DelayKind::Large), DelayWindow::new(60.0, 120.0));
        assert_eq!(scheduler.window(DelayKind::Small), DelayWindow::new(3.0, 8.0));
    }

    #[test]
    fn test_samples_stay_in_window() {
        let window = DelayWindow::new(3.0, 8.0);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let delay = window.sample(&mut rng);
            assert!(within(&window, delay), "{:?} outside window", delay);
        }
    }

    #[test]
    fn test_degenerate_window() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(DelayWindow::new(0.0, 0.0).sample(&mut rng), Duration::ZERO);
        assert_eq!(
            DelayWindow::new(2.0, 2.0).sample(&mut rng),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let mut rng = StdRng::seed_from_u64(3);
        let max = Duration::from_secs_f64(MAX_DELAY_SECS);

        assert_eq!(DelayWindow::new(1e20, 1e20).sample(&mut rng), max);
        assert!(DelayWindow::new(60.0, 1e20).sample(&mut rng) <= max);
        assert_eq!(DelayWindow::new(-5.0, -5.0).sample(&mut rng), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_waits_the_drawn_time() {
        let config = create_test_config((90.0, 90.0), (4.0, 4.0));
        let mut scheduler = RateScheduler::new(&config, CancellationToken::new());
        let start = tokio::time::Instant::now();

        assert_eq!(
            scheduler.delay(DelayKind::Large).await.unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(
            scheduler.delay(DelayKind::Small).await.unwrap(),
            Duration::from_secs(4)
        );
        assert_eq!(start.elapsed(), Duration::from_secs(94));
    }

    #[tokio::test]
    async fn test_zero_window_returns_immediately() {
        let config = create_test_config((0.0, 0.0), (0.0, 0.0));
        let mut scheduler = RateScheduler::new(&config, CancellationToken::new());

        let waited = scheduler.delay(DelayKind::Large).await.unwrap();
        assert_eq!(waited, Duration::ZERO);
        scheduler.settle().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_before_delay() {
        let config = create_test_config((60.0, 120.0), (3.0, 8.0));
        let cancel = CancellationToken::new();
        let mut scheduler = RateScheduler::new(&config, cancel.clone());
        cancel.cancel();

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            scheduler.delay(DelayKind::Large),
        )
        .await
        .expect("delay should not block once cancelled");
        assert!(matches!(result, Err(HarvestError::Interrupted)));
    }

    #[tokio::test]
    async fn test_cancel_during_delay() {
        let config = create_test_config((60.0, 120.0), (3.0, 8.0));
        let cancel = CancellationToken::new();
        let mut scheduler = RateScheduler::new(&config, cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            scheduler.delay(DelayKind::Small),
        )
        .await
        .expect("cancellation should end the delay");
        assert!(matches!(result, Err(HarvestError::Interrupted)));
        assert!(cancel.is_cancelled());
    }
}
