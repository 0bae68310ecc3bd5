//! Latency baselines learned from a burn-in sample.

use std::time::Duration;

use statrs::statistics::Statistics;

/// The expected latency of a category, learned once from its burn-in samples.
///
/// All values are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    mean: f64,
    std_dev: f64,
    ceiling: f64,
}

impl Baseline {
    /// Compute a baseline from burn-in samples.
    ///
    /// Uses the population standard deviation. The ceiling is `mean + choke_point * std_dev`.
    ///
    /// Returns `None` if there are no samples.
    pub fn from_samples(samples: &[Duration], choke_point: f64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let secs = || samples.iter().map(Duration::as_secs_f64);
        let mean = secs().mean();
        let std_dev = secs().population_std_dev();

        Some(Self {
            mean,
            std_dev,
            ceiling: mean + choke_point * std_dev,
        })
    }

    /// Mean burn-in latency.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation of burn-in latency.
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Rolling means above this count as violations.
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Whether a rolling mean is above the ceiling.
    pub fn is_violated_by(&self, rolling_mean: f64) -> bool {
        rolling_mean > self.ceiling
    }
}
