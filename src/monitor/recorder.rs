use std::{collections::BTreeMap, time::Duration};

/// How many times each delay has been issued.
///
/// Records the controller's delay, before any jitter is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelayHistogram {
    counts: BTreeMap<Duration, u64>,
}

impl DelayHistogram {
    pub(crate) fn record(&mut self, delay: Duration) {
        *self.counts.entry(delay).or_default() += 1;
    }

    /// Number of times `delay` was issued.
    pub fn count(&self, delay: Duration) -> u64 {
        self.counts.get(&delay).copied().unwrap_or_default()
    }

    /// Total number of delays issued.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Delays and their counts, shortest delay first.
    pub fn iter(&self) -> impl Iterator<Item = (Duration, u64)> + '_ {
        self.counts.iter().map(|(&delay, &count)| (delay, count))
    }

    /// Whether no delays have been issued yet.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
