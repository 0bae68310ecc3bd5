//! Algorithms for controlling the delay between requests.

mod fixed;
mod hysteresis;

use std::time::Duration;

pub use fixed::Fixed;
pub use hysteresis::Hysteresis;

/// An algorithm for controlling the delay issued between requests.
///
/// A controller is idle until [started](DelayControl::start), which happens when burn-in ends.
pub trait DelayControl {
    /// The current delay, or `None` if the controller hasn't been started.
    fn delay(&self) -> Option<Duration>;

    /// Start the controller at its initial delay.
    ///
    /// Starting an already-started controller has no effect. Returns the current delay.
    fn start(&mut self) -> Duration;

    /// Update the delay in response to a new latency comparison.
    fn update(&mut self, signal: Signal) -> Adjustment;
}

/// How a rolling mean compared with its category's baseline ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// At or below the ceiling.
    Success,
    /// Above the ceiling.
    Violation,
}

/// The effect of a [Signal] on a controller's delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// No change, either below threshold or nothing to do.
    Unchanged,
    /// The delay increased by one step.
    SlowedDown,
    /// The delay decreased by one step (or to the floor).
    SpedUp,
    /// A slow-down would have exceeded the maximum, so the delay is pinned there.
    Halted,
}
