use std::time::Duration;

use async_trait::async_trait;

use crate::Error;

use super::Pacer;

/// A wrapper which waits out each issued delay before returning it.
///
/// Callers can then just report latencies in a loop, and requests are paced for them.
#[derive(Debug)]
pub struct AutoWait<P> {
    inner: P,
}

impl<P: Pacer> AutoWait<P> {
    /// Wrap `pacer`, sleeping for every delay it issues.
    pub fn new(pacer: P) -> Self {
        Self { inner: pacer }
    }
}

#[async_trait]
impl<P: Pacer> Pacer for AutoWait<P> {
    async fn report(&self, category: Option<&str>, latency: Duration) -> Result<Duration, Error> {
        let delay = self.inner.report(category, latency).await?;

        tokio::time::sleep(delay).await;

        Ok(delay)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::time::{self, Instant};

    use crate::{
        assert_elapsed,
        config::{Config, DelayBounds},
        monitor::{Pacer, SharedMonitor},
        pacer,
    };

    use super::AutoWait;

    fn config() -> Config {
        Config::default().with_burn_in(3).with_delays(DelayBounds {
            burn_in: Duration::from_millis(5000),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn waits_for_burn_in_delay() {
        time::pause();

        let pacer = AutoWait::new(SharedMonitor::new(config()).unwrap());

        let before = Instant::now();
        let delay = pacer.report(None, Duration::from_millis(10)).await.unwrap();

        assert_eq!(delay, Duration::from_millis(5000));
        assert_elapsed!(before, delay, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn doesnt_wait_on_error() {
        time::pause();

        let pacer = AutoWait::new(SharedMonitor::new(config()).unwrap());

        let before = Instant::now();
        let result = pacer.report(Some("unknown"), Duration::from_millis(10)).await;

        assert!(result.is_err());
        assert_elapsed!(before, Duration::ZERO, Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_respects_auto_wait() {
        let waiting = pacer(config()).unwrap();
        let before = Instant::now();
        waiting.report(None, Duration::from_millis(10)).await.unwrap();
        assert_elapsed!(before, Duration::from_millis(5000), Duration::from_millis(10));

        let returning = pacer(config().with_auto_wait(false)).unwrap();
        let before = Instant::now();
        let delay = returning.report(None, Duration::from_millis(10)).await.unwrap();
        assert_eq!(delay, Duration::from_millis(5000));
        assert_elapsed!(before, Duration::ZERO, Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn shared_monitor_ignores_auto_wait() {
        let monitor = SharedMonitor::new(config().with_auto_wait(true)).unwrap();

        let before = Instant::now();
        let delay = monitor.report(None, Duration::from_millis(10)).await.unwrap();

        assert_eq!(delay, Duration::from_millis(5000));
        assert_elapsed!(before, Duration::ZERO, Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn wraps_shared_handle() {
        let monitor = Arc::new(SharedMonitor::new(config()).unwrap());
        let pacer = AutoWait::new(Arc::clone(&monitor));

        let before = Instant::now();
        pacer.report(None, Duration::from_millis(10)).await.unwrap();

        assert_elapsed!(before, Duration::from_millis(5000), Duration::from_millis(10));
        assert_eq!(monitor.snapshot().await.histogram().total(), 1);
    }

    /// Assert that a given duration has elapsed since `start`, within the given tolerance.
    #[macro_export]
    #[cfg(test)]
    macro_rules! assert_elapsed {
        ($start:expr, $dur:expr, $tolerance:expr) => {{
            let elapsed = $start.elapsed();
            let lower: std::time::Duration = $dur;

            // Handles ms rounding
            assert!(
                elapsed >= lower && elapsed <= lower + $tolerance,
                "actual = {:?}, expected = {:?}",
                elapsed,
                lower
            );
        }};
    }
}
