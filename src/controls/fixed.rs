use std::time::Duration;

use super::{Adjustment, DelayControl, Signal};

/// A simple, fixed delay, regardless of latency.
#[derive(Debug, Clone)]
pub struct Fixed {
    delay: Duration,
    started: bool,
}

impl Fixed {
    /// Always issue `delay` once started.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }
}

impl DelayControl for Fixed {
    fn delay(&self) -> Option<Duration> {
        self.started.then_some(self.delay)
    }

    fn start(&mut self) -> Duration {
        self.started = true;
        self.delay
    }

    fn update(&mut self, _signal: Signal) -> Adjustment {
        Adjustment::Unchanged
    }
}
