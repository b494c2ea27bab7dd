//! Path requests and their lifecycle states.

use std::fmt;
use std::time::{Duration, Instant};

use tacnav_core::Vec3;
use tacnav_paths::{MovementProfile, Path, PathStats};

/// Unique handle of a submitted request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Scheduling class. Higher classes are admitted first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Lifecycle state of a request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl RequestStatus {
    /// Whether the request reached a final state.
    #[inline]
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Pending | Self::Processing)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Invoked once when a request reaches a final state.
pub type Callback = Box<dyn FnOnce(&PathRequest) + Send>;

/// One submitted search and everything known about it.
pub struct PathRequest {
    pub id: RequestId,
    pub start: Vec3,
    pub goal: Vec3,
    pub profile: MovementProfile,
    pub priority: Priority,
    pub submitted_at: Instant,
    pub timeout: Duration,
    pub status: RequestStatus,
    pub path: Option<Path>,
    pub stats: Option<PathStats>,
    /// Failure or fault message.
    pub error: Option<String>,
    pub completed_at: Option<Instant>,
    pub(crate) callback: Option<Callback>,
}

impl PathRequest {
    pub(crate) fn new(
        id: RequestId,
        start: Vec3,
        goal: Vec3,
        profile: MovementProfile,
        priority: Priority,
        submitted_at: Instant,
        timeout: Duration,
        callback: Option<Callback>,
    ) -> Self {
        Self {
            id,
            start,
            goal,
            profile,
            priority,
            submitted_at,
            timeout,
            status: RequestStatus::Pending,
            path: None,
            stats: None,
            error: None,
            completed_at: None,
            callback,
        }
    }

    /// Whether the request's time budget ran out at `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.submitted_at) >= self.timeout
    }

    /// Move to final state `status` at `now` and fire the callback.
    ///
    /// A panicking callback is logged and swallowed.
    pub(crate) fn finish(&mut self, status: RequestStatus, now: Instant) {
        self.status = status;
        self.completed_at = Some(now);
        if let Some(cb) = self.callback.take() {
            let this = &*self;
            let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || cb(this)));
            if res.is_err() {
                log::warn!("callback of request {} panicked", self.id);
            }
        }
    }

    /// Approximate heap footprint of the stored result.
    pub(crate) fn result_bytes(&self) -> usize {
        self.path.as_ref().map_or(0, |p| {
            p.coords.capacity() * std::mem::size_of::<tacnav_core::Coord>()
                + p.waypoints.capacity() * std::mem::size_of::<Vec3>()
                + p.costs.capacity() * std::mem::size_of::<f32>()
        }) + self.profile.name.capacity()
            + self.error.as_ref().map_or(0, String::capacity)
    }
}

impl fmt::Debug for PathRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRequest")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("goal", &self.goal)
            .field("profile", &self.profile.name)
            .field("priority", &self.priority)
            .field("status", &self.status)
            .field("path_len", &self.path.as_ref().map(Path::len))
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
