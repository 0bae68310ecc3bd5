use std::time::Duration;

use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Uniformly perturbs issued delays, so request timing is less regular.
#[derive(Debug, Clone)]
pub(crate) struct Jitter {
    amplitude: Duration,
    rng: SmallRng,
}

impl Jitter {
    pub(crate) fn new(amplitude: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { amplitude, rng }
    }

    /// A uniform draw from `[delay - amplitude, delay + amplitude]`, floored at zero.
    pub(crate) fn apply(&mut self, delay: Duration) -> Duration {
        let low = delay.saturating_sub(self.amplitude);
        let high = delay.saturating_add(self.amplitude);

        self.rng.gen_range(low..=high)
    }
}
