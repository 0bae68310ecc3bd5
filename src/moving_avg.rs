//! Moving averages.

use std::{collections::VecDeque, time::Duration};

use conv::ValueFrom;

/// A [simple moving average](https://en.wikipedia.org/wiki/Moving_average#Simple_moving_average)
/// over the most recent latencies, in seconds.
///
/// Until the window fills, the average is over however many samples have been seen.
#[derive(Debug, Clone)]
pub(crate) struct Simple {
    window_size: u32,

    values: VecDeque<Duration>,
}

impl Simple {
    pub(crate) fn new_with_window_size(window_size: u32) -> Self {
        assert!(window_size > 0, "window size must be > 0");
        Self {
            window_size,

            values: VecDeque::new(),
        }
    }

    /// Add a sample, returning the new average.
    pub(crate) fn sample(&mut self, sample: Duration) -> f64 {
        self.push(sample);
        self.average()
    }

    /// Add a sample without computing the average.
    pub(crate) fn push(&mut self, sample: Duration) {
        if self.len() >= self.window_size {
            self.values.pop_front();
        }
        self.values.push_back(sample);
    }

    fn len(&self) -> u32 {
        u32::value_from(self.values.len()).expect("length is constrained to u32 window size")
    }

    fn average(&self) -> f64 {
        // Summing whole durations keeps the nanosecond total exact.
        let sum: Duration = self.values.iter().sum();
        sum.as_secs_f64() / f64::from(self.len())
    }
}
