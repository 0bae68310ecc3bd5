//! Adaptive request pacing, driven by observed latency against a learned baseline.

#![deny(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

pub mod baseline;
mod category;
pub mod config;
pub mod controls;
mod error;
mod monitor;
mod moving_avg;

pub use category::Category;
pub use config::{Categories, Config, ControllerScope, DelayBounds, HaltPolicy};
pub use error::Error;
pub use monitor::{pacer, AutoWait, DelayHistogram, Monitor, Pacer, SharedMonitor, Snapshot};
