use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use conv::ValueFrom;
use tracing::{debug, info, warn};

pub use auto_wait::AutoWait;
pub use recorder::DelayHistogram;
pub use shared::SharedMonitor;

use crate::{
    category::{Category, Observation, Registry},
    config::{Config, ControllerScope, HaltPolicy, DEFAULT_CATEGORY},
    controls::{Adjustment, DelayControl, Hysteresis},
    Error,
};

use jitter::Jitter;

mod auto_wait;
mod jitter;
mod recorder;
mod shared;

/// Paces requests to a remote endpoint.
///
/// Report the latency of each request, and wait for the returned delay before sending the next.
#[async_trait]
pub trait Pacer: Debug + Send + Sync {
    /// Report the latency of a completed request in `category` (or the default category).
    ///
    /// Returns the delay to observe before the next request.
    async fn report(&self, category: Option<&str>, latency: Duration) -> Result<Duration, Error>;
}

#[async_trait]
impl<P> Pacer for Arc<P>
where
    P: Pacer + ?Sized,
{
    async fn report(&self, category: Option<&str>, latency: Duration) -> Result<Duration, Error> {
        (**self).report(category, latency).await
    }
}

/// Build a [Pacer] from a configuration.
///
/// If [auto wait](Config::with_auto_wait) is enabled, the pacer sleeps for each delay before
/// returning it.
pub fn pacer(config: Config) -> Result<Box<dyn Pacer>, Error> {
    let auto_wait = config.auto_wait();
    let shared = SharedMonitor::new(config)?;

    Ok(if auto_wait {
        Box::new(AutoWait::new(shared))
    } else {
        Box::new(shared)
    })
}

/// Learns a latency baseline per category, then adjusts the delay between requests to keep
/// latency within it.
///
/// Each category goes through a burn-in period, during which a fixed delay is issued. Once
/// burn-in is complete, the trailing mean of recent latencies is compared against the baseline
/// ceiling and drives a [DelayControl] algorithm.
///
/// Not synchronised. See [SharedMonitor] for use from multiple tasks.
#[derive(Debug)]
pub struct Monitor<C = Hysteresis> {
    burn_in: usize,
    choke_point: f64,
    burn_in_delay: Duration,
    halt_policy: HaltPolicy,

    registry: Registry,
    controllers: Controllers<C>,

    histogram: DelayHistogram,
    jitter: Option<Jitter>,
}

#[derive(Debug, Clone)]
enum Controllers<C> {
    Shared(C),
    /// Indexed in the same order as the registry.
    PerCategory(Vec<C>),
}

/// A copy of a [Monitor]'s observable state, e.g. for plotting.
#[derive(Debug, Clone)]
pub struct Snapshot {
    categories: Vec<Category>,
    delays: Vec<Option<Duration>>,
    histogram: DelayHistogram,
}

impl Monitor<Hysteresis> {
    /// Create a monitor using the [Hysteresis] controller configured by `config`.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let controller = Hysteresis::from_config(&config);
        Self::with_controller(config, controller)
    }
}

impl<C> Monitor<C>
where
    C: DelayControl + Clone,
{
    /// Create a monitor with a custom delay control algorithm.
    ///
    /// With [ControllerScope::PerCategory], each category gets a clone of `controller`.
    pub fn with_controller(config: Config, controller: C) -> Result<Self, Error> {
        config.validate()?;

        let window_size = u32::value_from(config.rolling_mean_length)
            .map_err(|_| Error::invalid_config("rolling mean length is too large"))?;
        let entries = config.categories.into_entries();
        let registry = Registry::new(entries.iter().map(|(name, _)| name.clone()), window_size);

        let controllers = match config.scope {
            ControllerScope::Shared => Controllers::Shared(controller),
            ControllerScope::PerCategory => {
                Controllers::PerCategory(vec![controller; registry.len()])
            }
        };

        let mut monitor = Self {
            burn_in: config.burn_in,
            choke_point: config.choke_point,
            burn_in_delay: config.delays.burn_in,
            halt_policy: config.halt_policy,

            registry,
            controllers,

            histogram: DelayHistogram::default(),
            jitter: config
                .jitter
                .map(|amplitude| Jitter::new(amplitude, config.jitter_seed)),
        };

        for (index, (name, history)) in entries.into_iter().enumerate() {
            if !history.is_empty() {
                warn!(
                    category = %name,
                    samples = history.len(),
                    "category seeded with existing latencies, this may influence the results"
                );
            }
            for latency in history {
                monitor.replay(index, latency);
            }
        }

        Ok(monitor)
    }
}

impl<C> Monitor<C>
where
    C: DelayControl,
{
    /// Report the latency of a completed request in `category` (or the default category).
    ///
    /// Returns the delay to observe before the next request, with jitter applied if configured.
    ///
    /// Fails without changing any state if the category is unknown. With [HaltPolicy::Fail],
    /// returns [Error::Halted] once violations persist at the maximum delay.
    pub fn report(
        &mut self,
        category: Option<&str>,
        latency: Duration,
    ) -> Result<Duration, Error> {
        let name = category.unwrap_or(DEFAULT_CATEGORY);
        let index = self.registry.index_of(name)?;

        let observation =
            self.registry
                .get_mut(index)
                .record(latency, self.burn_in, self.choke_point);

        let (delay, adjustment) = match observation {
            Observation::BurnIn => (self.burn_in_delay, Adjustment::Unchanged),

            Observation::BaselineReady(baseline) => {
                info!(
                    category = name,
                    mean = baseline.mean(),
                    std_dev = baseline.std_dev(),
                    ceiling = baseline.ceiling(),
                    "burn-in complete"
                );
                (self.controller_mut(index).start(), Adjustment::Unchanged)
            }

            Observation::Monitored {
                rolling_mean,
                signal,
            } => {
                let controller = self.controller_mut(index);
                let adjustment = controller.update(signal);
                let delay = controller
                    .delay()
                    .expect("controller is started when burn-in completes");

                match adjustment {
                    Adjustment::SlowedDown => {
                        debug!(category = name, rolling_mean, ?delay, "slowing down");
                    }
                    Adjustment::SpedUp => {
                        debug!(category = name, rolling_mean, ?delay, "speeding up");
                    }
                    Adjustment::Halted => {
                        warn!(
                            category = name,
                            rolling_mean,
                            ?delay,
                            "latency still above baseline at maximum delay"
                        );
                    }
                    Adjustment::Unchanged => {}
                }

                (delay, adjustment)
            }
        };

        self.histogram.record(delay);

        if adjustment == Adjustment::Halted && self.halt_policy == HaltPolicy::Fail {
            return Err(Error::Halted {
                category: name.to_owned(),
                delay,
            });
        }

        Ok(match &mut self.jitter {
            Some(jitter) => jitter.apply(delay),
            None => delay,
        })
    }

    /// The controller's current delay for `category` (or the default category), without jitter.
    ///
    /// `None` until the controller has been started by the end of burn-in.
    pub fn current_delay(&self, category: Option<&str>) -> Result<Option<Duration>, Error> {
        Ok(self.controller(category)?.delay())
    }

    /// The delay controller used by `category` (or the default category).
    pub fn controller(&self, category: Option<&str>) -> Result<&C, Error> {
        let index = self
            .registry
            .index_of(category.unwrap_or(DEFAULT_CATEGORY))?;
        Ok(self.controller_at(index))
    }

    /// The category called `name`, if declared.
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.registry.get(name)
    }

    /// All categories, in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.registry.iter()
    }

    /// Every delay issued so far.
    pub fn histogram(&self) -> &DelayHistogram {
        &self.histogram
    }

    /// Copy out the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            categories: self.registry.iter().cloned().collect(),
            delays: (0..self.registry.len())
                .map(|index| self.controller_at(index).delay())
                .collect(),
            histogram: self.histogram.clone(),
        }
    }

    /// Record a seeded latency. Burn-in completion starts the controller, but monitored samples
    /// don't drive it.
    fn replay(&mut self, index: usize, latency: Duration) {
        let observation =
            self.registry
                .get_mut(index)
                .record(latency, self.burn_in, self.choke_point);

        if let Observation::BaselineReady(_) = observation {
            self.controller_mut(index).start();
        }
    }

    fn controller_at(&self, index: usize) -> &C {
        match &self.controllers {
            Controllers::Shared(controller) => controller,
            Controllers::PerCategory(controllers) => &controllers[index],
        }
    }

    fn controller_mut(&mut self, index: usize) -> &mut C {
        match &mut self.controllers {
            Controllers::Shared(controller) => controller,
            Controllers::PerCategory(controllers) => &mut controllers[index],
        }
    }
}

impl Snapshot {
    /// All categories, in declaration order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// The controller's delay for a category, if it has been started.
    pub fn delay(&self, category: &str) -> Option<Duration> {
        self.categories
            .iter()
            .position(|c| c.name() == category)
            .and_then(|index| self.delays[index])
    }

    /// Every delay issued so far.
    pub fn histogram(&self) -> &DelayHistogram {
        &self.histogram
    }
}
