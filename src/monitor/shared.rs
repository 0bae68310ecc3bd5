use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    config::Config,
    controls::{DelayControl, Hysteresis},
    Error,
};

use super::{Monitor, Pacer, Snapshot};

/// A [Monitor] which can be shared between tasks.
///
/// Each report holds a lock for the whole update, so reports from different tasks are
/// serialised, and shared controller state is never updated concurrently.
#[derive(Debug)]
pub struct SharedMonitor<C = Hysteresis> {
    inner: Mutex<Monitor<C>>,
}

impl SharedMonitor<Hysteresis> {
    /// Create a shared monitor using the [Hysteresis] controller configured by `config`.
    pub fn new(config: Config) -> Result<Self, Error> {
        Monitor::new(config).map(Self::from)
    }
}

impl<C> SharedMonitor<C>
where
    C: DelayControl,
{
    /// Copy out the current state.
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.snapshot()
    }

    /// Exclusive access to the underlying monitor.
    pub async fn lock(&self) -> MutexGuard<'_, Monitor<C>> {
        self.inner.lock().await
    }

    /// Unwrap the underlying monitor.
    pub fn into_inner(self) -> Monitor<C> {
        self.inner.into_inner()
    }
}

impl<C> From<Monitor<C>> for SharedMonitor<C> {
    fn from(monitor: Monitor<C>) -> Self {
        Self {
            inner: Mutex::new(monitor),
        }
    }
}

#[async_trait]
impl<C> Pacer for SharedMonitor<C>
where
    C: DelayControl + Debug + Send,
{
    async fn report(&self, category: Option<&str>, latency: Duration) -> Result<Duration, Error> {
        self.inner.lock().await.report(category, latency)
    }
}
