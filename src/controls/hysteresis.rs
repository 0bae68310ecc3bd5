use std::time::Duration;

use crate::config::{Config, DelayBounds};

use super::{Adjustment, DelayControl, Signal};

/// Latency-based pacing with a dead-band.
///
/// Additive increase, additive decrease.
///
/// Increases the delay by one step after `slow_down_threshold` violations, and decreases it by one
/// step after `speed_up_threshold` successes. Crossing either threshold resets both counters.
///
/// Requiring a run of signals before moving means isolated latency spikes don't cause the delay
/// to oscillate.
///
/// The delay never leaves `[min, max]`. Violations at the maximum pin it there (a halt) until
/// enough successes bring it back down.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    min_delay: Duration,
    max_delay: Duration,
    step: Duration,
    start_delay: Duration,
    slow_down_threshold: u32,
    speed_up_threshold: u32,

    delay: Option<Duration>,
    violations: u32,
    successes: u32,
}

impl Hysteresis {
    const DEFAULT_THRESHOLD: u32 = 20;

    /// Create a controller which starts at `start_delay`, using the default bounds and thresholds.
    pub fn new_with_start_delay(start_delay: Duration) -> Self {
        let bounds = DelayBounds::default();
        Self {
            min_delay: bounds.min,
            max_delay: bounds.max,
            step: bounds.step,
            start_delay,
            slow_down_threshold: Self::DEFAULT_THRESHOLD,
            speed_up_threshold: Self::DEFAULT_THRESHOLD,

            delay: None,
            violations: 0,
            successes: 0,
        }
    }

    /// Expects `config` to have been validated.
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            min_delay: config.delays.min,
            max_delay: config.delays.max,
            step: config.delays.step,
            start_delay: config.start_delay(),
            slow_down_threshold: config.slow_down_threshold,
            speed_up_threshold: config.speed_up_threshold,

            delay: None,
            violations: 0,
            successes: 0,
        }
    }

    /// Keep the delay within `[min, max]`.
    pub fn with_bounds(self, min: Duration, max: Duration) -> Self {
        assert!(min <= max, "min delay must not exceed max delay");
        Self {
            min_delay: min,
            max_delay: max,
            ..self
        }
    }

    /// Amount the delay moves on each adjustment.
    pub fn step_by(self, step: Duration) -> Self {
        assert!(!step.is_zero());
        Self { step, ..self }
    }

    /// Number of violations needed to increase the delay.
    pub fn slow_down_after(self, threshold: u32) -> Self {
        assert!(threshold > 0);
        Self {
            slow_down_threshold: threshold,
            ..self
        }
    }

    /// Number of successes needed to decrease the delay.
    pub fn speed_up_after(self, threshold: u32) -> Self {
        assert!(threshold > 0);
        Self {
            speed_up_threshold: threshold,
            ..self
        }
    }

    /// Violations counted since the last adjustment.
    pub fn violations(&self) -> u32 {
        self.violations
    }

    /// Successes counted since the last adjustment.
    pub fn successes(&self) -> u32 {
        self.successes
    }

    fn reset_counters(&mut self) {
        self.violations = 0;
        self.successes = 0;
    }

    fn on_violation(&mut self, delay: Duration) -> (Duration, Adjustment) {
        self.violations += 1;
        if self.violations < self.slow_down_threshold {
            return (delay, Adjustment::Unchanged);
        }

        self.reset_counters();
        let increased = delay.saturating_add(self.step);
        if increased > self.max_delay {
            (self.max_delay, Adjustment::Halted)
        } else {
            (increased, Adjustment::SlowedDown)
        }
    }

    fn on_success(&mut self, delay: Duration) -> (Duration, Adjustment) {
        // Nothing to earn at the floor.
        if delay <= self.min_delay {
            return (delay, Adjustment::Unchanged);
        }

        self.successes += 1;
        if self.successes < self.speed_up_threshold {
            return (delay, Adjustment::Unchanged);
        }

        self.reset_counters();
        let decreased = delay.saturating_sub(self.step).max(self.min_delay);
        (decreased, Adjustment::SpedUp)
    }
}

impl DelayControl for Hysteresis {
    fn delay(&self) -> Option<Duration> {
        self.delay
    }

    fn start(&mut self) -> Duration {
        *self
            .delay
            .get_or_insert(self.start_delay.clamp(self.min_delay, self.max_delay))
    }

    fn update(&mut self, signal: Signal) -> Adjustment {
        let Some(delay) = self.delay else {
            return Adjustment::Unchanged;
        };

        let (delay, adjustment) = match signal {
            Signal::Violation => self.on_violation(delay),
            Signal::Success => self.on_success(delay),
        };
        self.delay = Some(delay);

        adjustment
    }
}
