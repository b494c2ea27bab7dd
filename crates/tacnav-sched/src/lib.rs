//! Time-sliced path request scheduling.
//!
//! Game units submit searches to a [`Scheduler`] and poll (or get called
//! back) for the result. The host drives the scheduler with
//! [`Scheduler::tick`] once per frame; each tick runs searches only while its
//! time slice lasts, so no frame stalls on pathfinding.
//!
//! Nothing crosses the scheduler boundary as a panic or error: failed,
//! timed-out and faulted searches all surface as a [`RequestStatus`].

mod config;
mod error;
mod queue;
mod request;
mod scheduler;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use queue::PendingQueue;
pub use request::{Callback, PathRequest, Priority, RequestId, RequestStatus};
pub use scheduler::{PathSearch, Scheduler, SchedulerStats, TickReport};
