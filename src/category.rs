//! Per-category latency state.

use std::{collections::HashMap, time::Duration};

use crate::{baseline::Baseline, controls::Signal, moving_avg, Error};

/// The latency history of one traffic category, and what has been learned from it.
///
/// Histories are append-only and grow for the life of the monitor.
#[derive(Debug, Clone)]
pub struct Category {
    name: String,

    history: Vec<Duration>,
    baseline: Option<Baseline>,
    /// One per sample recorded after burn-in.
    rolling_means: Vec<f64>,

    window: moving_avg::Simple,
}

/// What recording a latency sample did to a [Category].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Observation {
    /// Still collecting burn-in samples.
    BurnIn,
    /// This sample completed burn-in and the baseline was computed.
    BaselineReady(Baseline),
    /// The sample was compared with the baseline.
    Monitored { rolling_mean: f64, signal: Signal },
}

impl Category {
    pub(crate) fn new(name: String, window_size: u32) -> Self {
        Self {
            name,
            history: Vec::new(),
            baseline: None,
            rolling_means: Vec::new(),
            window: moving_avg::Simple::new_with_window_size(window_size),
        }
    }

    /// The name declared at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every latency recorded, in order.
    pub fn history(&self) -> &[Duration] {
        &self.history
    }

    /// Trailing-window means (seconds), one per sample after burn-in.
    pub fn rolling_means(&self) -> &[f64] {
        &self.rolling_means
    }

    /// The baseline, once burn-in is complete.
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Whether the baseline has been computed.
    pub fn is_burn_in_complete(&self) -> bool {
        self.baseline.is_some()
    }

    pub(crate) fn record(
        &mut self,
        latency: Duration,
        burn_in: usize,
        choke_point: f64,
    ) -> Observation {
        self.history.push(latency);

        let Some(baseline) = self.baseline else {
            self.window.push(latency);

            if self.history.len() < burn_in {
                return Observation::BurnIn;
            }

            let baseline = Baseline::from_samples(&self.history, choke_point)
                .expect("burn-in is at least one sample");
            self.baseline = Some(baseline);
            return Observation::BaselineReady(baseline);
        };

        let rolling_mean = self.window.sample(latency);
        self.rolling_means.push(rolling_mean);

        let signal = if baseline.is_violated_by(rolling_mean) {
            Signal::Violation
        } else {
            Signal::Success
        };

        Observation::Monitored {
            rolling_mean,
            signal,
        }
    }
}

/// The fixed set of categories tracked by a monitor.
#[derive(Debug, Clone)]
pub(crate) struct Registry {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub(crate) fn new<I>(names: I, window_size: u32) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let categories: Vec<_> = names
            .into_iter()
            .map(|name| Category::new(name, window_size))
            .collect();
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, category)| (category.name.clone(), i))
            .collect();

        Self { categories, index }
    }

    pub(crate) fn index_of(&self, name: &str) -> Result<usize, Error> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownCategory(name.to_owned()))
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Category> {
        self.index.get(name).map(|&i| &self.categories[i])
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut Category {
        &mut self.categories[index]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.categories.len()
    }
}
