//! Error types for scheduler construction.

/// Errors raised while building a [`Scheduler`](crate::Scheduler) from a
/// [`SchedulerConfig`](crate::SchedulerConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SchedulerError {
    /// At least one request must be allowed to process.
    #[error("max_concurrent must be at least 1")]
    NoConcurrency,

    /// Requests need a non-zero default timeout.
    #[error("default timeout must be non-zero")]
    ZeroTimeout,
}
