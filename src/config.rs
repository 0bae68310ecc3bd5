//! Construction-time configuration for a [Monitor](crate::Monitor).

use std::{collections::HashSet, time::Duration};

use crate::Error;

/// Name of the implicit category used when none is given.
pub const DEFAULT_CATEGORY: &str = "main";

/// The traffic categories tracked by a monitor, each with its own latency baseline.
///
/// Categories are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Categories {
    entries: Vec<(String, Vec<Duration>)>,
}

impl Categories {
    /// A single implicit category, [DEFAULT_CATEGORY].
    pub fn single() -> Self {
        Self::named([DEFAULT_CATEGORY])
    }

    /// An explicit set of category names, all starting with empty histories.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names
                .into_iter()
                .map(|name| (name.into(), Vec::new()))
                .collect(),
        }
    }

    /// Categories with pre-seeded latency histories, e.g. carried over from a previous run.
    ///
    /// Seeded samples count towards burn-in, so they influence the baseline.
    pub fn seeded<I, S>(histories: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Duration>)>,
        S: Into<String>,
    {
        Self {
            entries: histories
                .into_iter()
                .map(|(name, history)| (name.into(), history))
                .collect(),
        }
    }

    /// Category names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Vec<Duration>)> {
        self.entries
    }

    fn validate(&self) -> Result<(), Error> {
        if self.entries.is_empty() {
            return Err(Error::invalid_config("at least one category is required"));
        }
        let mut seen = HashSet::with_capacity(self.entries.len());
        for (name, _) in &self.entries {
            if name.is_empty() {
                return Err(Error::invalid_config("category names must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::invalid_config(format!(
                    "category {name:?} declared more than once"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Categories {
    fn default() -> Self {
        Self::single()
    }
}

/// Bounds and step size for the delay issued after burn-in, plus the fixed burn-in delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayBounds {
    /// Delay issued while a category is still in burn-in.
    pub burn_in: Duration,
    /// Floor for the controlled delay.
    pub min: Duration,
    /// Ceiling for the controlled delay. Reaching it while still violating is a halt.
    pub max: Duration,
    /// Amount the delay moves on each slow-down or speed-up.
    pub step: Duration,
}

impl Default for DelayBounds {
    fn default() -> Self {
        Self {
            burn_in: Duration::from_secs(10),
            min: Duration::ZERO,
            max: Duration::from_secs(30),
            step: Duration::from_secs(5),
        }
    }
}

/// What happens when a slow-down would push the delay beyond its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HaltPolicy {
    /// Pin the delay at the maximum and carry on.
    #[default]
    Clamp,
    /// Pin the delay at the maximum and report [Error::Halted] to the caller.
    Fail,
}

/// Whether categories share one delay controller or each get their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerScope {
    /// One controller per category, started when that category finishes burn-in.
    #[default]
    PerCategory,
    /// One controller for the whole monitor, started by the first category to finish burn-in.
    ///
    /// Violations and successes from every category feed the same counters.
    Shared,
}

/// Monitor configuration.
///
/// Use [Config::default] and the `with_*` methods, then hand it to
/// [Monitor::new](crate::Monitor::new), which validates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub(crate) categories: Categories,
    pub(crate) burn_in: usize,
    pub(crate) choke_point: f64,
    pub(crate) slow_down_threshold: u32,
    pub(crate) speed_up_threshold: u32,
    pub(crate) delays: DelayBounds,
    pub(crate) start_delay: Duration,
    pub(crate) jitter: Option<Duration>,
    pub(crate) jitter_seed: Option<u64>,
    pub(crate) rolling_mean_length: usize,
    pub(crate) auto_wait: bool,
    pub(crate) halt_policy: HaltPolicy,
    pub(crate) scope: ControllerScope,
}

impl Config {
    const DEFAULT_BURN_IN: usize = 100;
    const DEFAULT_CHOKE_POINT: f64 = 2.0;
    const DEFAULT_SLOW_DOWN_THRESHOLD: u32 = 20;
    const DEFAULT_SPEED_UP_THRESHOLD: u32 = 20;
    const DEFAULT_ROLLING_MEAN_LENGTH: usize = 25;

    /// The categories to track. Defaults to [Categories::single].
    pub fn with_categories(self, categories: Categories) -> Self {
        Self { categories, ..self }
    }

    /// Number of samples per category used to compute its baseline.
    pub fn with_burn_in(self, burn_in: usize) -> Self {
        Self { burn_in, ..self }
    }

    /// Standard deviations above the baseline mean at which latency counts as a violation.
    pub fn with_choke_point(self, choke_point: f64) -> Self {
        Self {
            choke_point,
            ..self
        }
    }

    /// Consecutive violations required before slowing down.
    pub fn with_slow_down_threshold(self, threshold: u32) -> Self {
        Self {
            slow_down_threshold: threshold,
            ..self
        }
    }

    /// Consecutive successes required before speeding up.
    pub fn with_speed_up_threshold(self, threshold: u32) -> Self {
        Self {
            speed_up_threshold: threshold,
            ..self
        }
    }

    /// Burn-in delay, delay bounds and step size.
    pub fn with_delays(self, delays: DelayBounds) -> Self {
        Self { delays, ..self }
    }

    /// Delay in force once burn-in ends. Clamped to the delay bounds.
    pub fn with_start_delay(self, start_delay: Duration) -> Self {
        Self {
            start_delay,
            ..self
        }
    }

    /// Randomise each issued delay uniformly within `± amplitude` (never below zero).
    pub fn with_jitter(self, amplitude: Duration) -> Self {
        Self {
            jitter: Some(amplitude),
            ..self
        }
    }

    /// Seed the jitter's random number generator, for reproducible delays.
    pub fn with_jitter_seed(self, seed: u64) -> Self {
        Self {
            jitter_seed: Some(seed),
            ..self
        }
    }

    /// Number of trailing samples averaged before comparing against the baseline.
    pub fn with_rolling_mean_length(self, length: usize) -> Self {
        Self {
            rolling_mean_length: length,
            ..self
        }
    }

    /// Whether [pacer()](crate::pacer()) sleeps for the delay, or just returns it.
    ///
    /// Only read by [pacer()](crate::pacer()). A [Monitor](crate::Monitor) or
    /// [SharedMonitor](crate::SharedMonitor) built directly never sleeps, whatever this is set to.
    /// Wrap one in [AutoWait](crate::AutoWait) to get the sleeping behaviour.
    pub fn with_auto_wait(self, auto_wait: bool) -> Self {
        Self { auto_wait, ..self }
    }

    /// What to do when violations persist at the maximum delay.
    pub fn with_halt_policy(self, halt_policy: HaltPolicy) -> Self {
        Self {
            halt_policy,
            ..self
        }
    }

    /// Whether categories share one delay controller.
    pub fn with_controller_scope(self, scope: ControllerScope) -> Self {
        Self { scope, ..self }
    }

    /// Whether issued delays should be slept on before returning.
    pub fn auto_wait(&self) -> bool {
        self.auto_wait
    }

    /// Burn-in delay, delay bounds and step size.
    pub fn delays(&self) -> DelayBounds {
        self.delays
    }

    /// The start delay, clamped to the delay bounds.
    pub fn start_delay(&self) -> Duration {
        self.start_delay.clamp(self.delays.min, self.delays.max)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), Error> {
        self.categories.validate()?;

        if self.burn_in == 0 {
            return Err(Error::invalid_config("burn-in must be at least one sample"));
        }
        if self.rolling_mean_length == 0 {
            return Err(Error::invalid_config(
                "rolling mean length must be at least one sample",
            ));
        }
        if u32::try_from(self.rolling_mean_length).is_err() {
            return Err(Error::invalid_config("rolling mean length is too large"));
        }
        if !self.choke_point.is_finite() || self.choke_point < 0.0 {
            return Err(Error::invalid_config(format!(
                "choke point must be a finite, non-negative number, got {}",
                self.choke_point
            )));
        }
        if self.slow_down_threshold == 0 || self.speed_up_threshold == 0 {
            return Err(Error::invalid_config("thresholds must be at least one"));
        }
        if self.delays.min > self.delays.max {
            return Err(Error::invalid_config(format!(
                "min delay {:?} exceeds max delay {:?}",
                self.delays.min, self.delays.max
            )));
        }
        if self.delays.step.is_zero() {
            return Err(Error::invalid_config("step size must be non-zero"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            categories: Categories::default(),
            burn_in: Self::DEFAULT_BURN_IN,
            choke_point: Self::DEFAULT_CHOKE_POINT,
            slow_down_threshold: Self::DEFAULT_SLOW_DOWN_THRESHOLD,
            speed_up_threshold: Self::DEFAULT_SPEED_UP_THRESHOLD,
            delays: DelayBounds::default(),
            start_delay: Duration::ZERO,
            jitter: None,
            jitter_seed: None,
            rolling_mean_length: Self::DEFAULT_ROLLING_MEAN_LENGTH,
            auto_wait: true,
            halt_policy: HaltPolicy::default(),
            scope: ControllerScope::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_ok!(Config::default().validate());
    }

    #[test]
    fn start_delay_is_clamped() {
        let config = Config::default()
            .with_delays(DelayBounds {
                min: Duration::from_secs(2),
                max: Duration::from_secs(8),
                ..Default::default()
            })
            .with_start_delay(Duration::from_secs(20));

        assert_eq!(config.start_delay(), Duration::from_secs(8));

        let config = config.with_start_delay(Duration::ZERO);
        assert_eq!(config.start_delay(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_duplicate_categories() {
        let config = Config::default().with_categories(Categories::named(["a", "b", "a"]));

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_categories() {
        let none: [&str; 0] = [];
        assert_err!(Config::default()
            .with_categories(Categories::named(none))
            .validate());
        assert_err!(Config::default()
            .with_categories(Categories::named([""]))
            .validate());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert_err!(Config::default().with_burn_in(0).validate());
        assert_err!(Config::default().with_rolling_mean_length(0).validate());
        assert_err!(Config::default().with_slow_down_threshold(0).validate());
        assert_err!(Config::default().with_speed_up_threshold(0).validate());
        assert_err!(Config::default().with_choke_point(f64::NAN).validate());
        assert_err!(Config::default().with_choke_point(-1.0).validate());
    }

    #[test]
    fn rejects_bad_delays() {
        let inverted = DelayBounds {
            min: Duration::from_secs(10),
            max: Duration::from_secs(5),
            ..Default::default()
        };
        assert_err!(Config::default().with_delays(inverted).validate());

        let no_step = DelayBounds {
            step: Duration::ZERO,
            ..Default::default()
        };
        assert_err!(Config::default().with_delays(no_step).validate());
    }

    #[test]
    fn seeded_names_keep_order() {
        let categories = Categories::seeded([
            ("search", vec![Duration::from_millis(10)]),
            ("detail", vec![]),
        ]);

        assert_eq!(categories.names().collect::<Vec<_>>(), ["search", "detail"]);
    }
}
