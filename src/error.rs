use std::time::Duration;

/// Errors returned when building or driving a [Monitor](crate::Monitor).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The configuration was rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A latency was reported for a category which was not declared at construction.
    #[error("{0} is not a valid category for this monitor")]
    UnknownCategory(String),

    /// The delay hit its ceiling while violations persisted.
    ///
    /// Only returned with [HaltPolicy::Fail](crate::HaltPolicy::Fail). The monitor state has
    /// already been updated, the delay is pinned at the maximum.
    #[error("latency for category {category:?} still above baseline at maximum delay {delay:?}")]
    Halted {
        /// The category which triggered the halt.
        category: String,
        /// The (maximum) delay in force.
        delay: Duration,
    },
}

impl Error {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}
