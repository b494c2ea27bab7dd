//! The time-sliced request scheduler.
//!
//! Requests move Pending → Processing → a final state. Each
//! [`tick`](Scheduler::tick) expires overdue requests, admits pending ones up
//! to the concurrency limit, runs searches until the tick's time slice is
//! spent, then evicts finished requests past their retention period. A
//! search always runs to completion once started; only admission of work is
//! sliced.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tacnav_core::{NavGrid, Vec3};
use tacnav_paths::{MovementProfile, Path, PathStats, Pathfinder};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::queue::PendingQueue;
use crate::request::{Callback, PathRequest, Priority, RequestId, RequestStatus};

/// A search implementation the scheduler can drive.
pub trait PathSearch {
    fn search(
        &mut self,
        grid: &mut NavGrid,
        start: Vec3,
        goal: Vec3,
        profile: &MovementProfile,
    ) -> (Path, PathStats);
}

impl PathSearch for Pathfinder {
    fn search(
        &mut self,
        grid: &mut NavGrid,
        start: Vec3,
        goal: Vec3,
        profile: &MovementProfile,
    ) -> (Path, PathStats) {
        self.find_path(grid, start, goal, profile)
    }
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub expired: usize,
    pub admitted: usize,
    /// Searches run this tick.
    pub searched: usize,
    pub completed: usize,
    pub failed: usize,
    pub evicted: usize,
    /// The time slice ran out with processing requests left.
    pub budget_exhausted: bool,
    pub elapsed: Duration,
}

/// Running totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub evicted: u64,
    /// Largest processing set seen.
    pub peak_processing: usize,
}

/// Cooperative scheduler of path requests.
pub struct Scheduler<S: PathSearch = Pathfinder> {
    config: SchedulerConfig,
    search: S,
    requests: HashMap<RequestId, PathRequest>,
    pending: PendingQueue,
    /// Admitted ids in admission order.
    processing: Vec<RequestId>,
    next_id: u64,
    stats: SchedulerStats,
    /// Host time passed to the last tick and the wall-clock instant it was
    /// taken at.
    clock: Option<(Instant, Instant)>,
}

impl Scheduler<Pathfinder> {
    /// A scheduler driving a default [`Pathfinder`].
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_search(config, Pathfinder::default())
    }
}

impl<S: PathSearch> Scheduler<S> {
    pub fn with_search(config: SchedulerConfig, search: S) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            config,
            search,
            requests: HashMap::new(),
            pending: PendingQueue::new(),
            processing: Vec::new(),
            next_id: 1,
            stats: SchedulerStats::default(),
            clock: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The search implementation, e.g. to reconfigure it.
    pub fn search_mut(&mut self) -> &mut S {
        &mut self.search
    }

    // -----------------------------------------------------------------------
    // Submission and cancellation
    // -----------------------------------------------------------------------

    /// Current time on the host's clock: the `now` of the last tick
    /// advanced by the wall time since, or the wall clock before any tick.
    pub fn now(&self) -> Instant {
        match self.clock {
            Some((host, wall)) => host.checked_add(wall.elapsed()).unwrap_or(host),
            None => Instant::now(),
        }
    }

    /// Queue a search. `timeout` defaults to the configured one and runs
    /// from [`now`](Self::now).
    pub fn submit(
        &mut self,
        start: Vec3,
        goal: Vec3,
        profile: &MovementProfile,
        priority: Priority,
        timeout: Option<Duration>,
    ) -> RequestId {
        let at = self.now();
        self.enqueue(start, goal, profile, priority, at, timeout, None)
    }

    /// Like [`submit`](Self::submit), with the timeout running from the
    /// host time `at`.
    pub fn submit_at(
        &mut self,
        start: Vec3,
        goal: Vec3,
        profile: &MovementProfile,
        priority: Priority,
        timeout: Option<Duration>,
        at: Instant,
    ) -> RequestId {
        self.enqueue(start, goal, profile, priority, at, timeout, None)
    }

    /// Like [`submit`](Self::submit), invoking `callback` once the request
    /// reaches a final state.
    pub fn submit_with_callback<F>(
        &mut self,
        start: Vec3,
        goal: Vec3,
        profile: &MovementProfile,
        priority: Priority,
        timeout: Option<Duration>,
        callback: F,
    ) -> RequestId
    where
        F: FnOnce(&PathRequest) + Send + 'static,
    {
        let at = self.now();
        self.enqueue(
            start,
            goal,
            profile,
            priority,
            at,
            timeout,
            Some(Box::new(callback)),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn enqueue(
        &mut self,
        start: Vec3,
        goal: Vec3,
        profile: &MovementProfile,
        priority: Priority,
        at: Instant,
        timeout: Option<Duration>,
        callback: Option<Callback>,
    ) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        let timeout = timeout.unwrap_or(self.config.default_timeout);
        let req = PathRequest::new(
            id,
            start,
            goal,
            profile.clone(),
            priority,
            at,
            timeout,
            callback,
        );
        self.requests.insert(id, req);
        self.pending.push(id, priority);
        self.stats.submitted += 1;
        log::debug!("request {} submitted ({:?}, {})", id, priority, profile.name);
        id
    }

    /// Cancel a pending or processing request. Returns `false` for unknown
    /// or already finished requests.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        let now = self.now();
        let Some(req) = self.requests.get_mut(&id) else {
            return false;
        };
        if req.status.is_finished() {
            return false;
        }
        self.pending.remove(id);
        self.processing.retain(|p| *p != id);
        req.finish(RequestStatus::Cancelled, now);
        self.stats.cancelled += 1;
        log::debug!("request {} cancelled", id);
        true
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn status(&self, id: RequestId) -> Option<RequestStatus> {
        self.requests.get(&id).map(|r| r.status)
    }

    /// Path of a completed request.
    pub fn result(&self, id: RequestId) -> Option<&Path> {
        self.requests.get(&id).and_then(|r| r.path.as_ref())
    }

    pub fn request_stats(&self, id: RequestId) -> Option<&PathStats> {
        self.requests.get(&id).and_then(|r| r.stats.as_ref())
    }

    pub fn request(&self, id: RequestId) -> Option<&PathRequest> {
        self.requests.get(&id)
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn processing_count(&self) -> usize {
        self.processing.len()
    }

    /// Pending ids in admission order.
    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.pending.ids().collect()
    }

    /// Processing ids in admission order.
    pub fn processing_ids(&self) -> &[RequestId] {
        &self.processing
    }

    #[inline]
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Approximate heap footprint in bytes, stored results included.
    pub fn memory_estimate(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.requests.capacity()
                * (std::mem::size_of::<RequestId>() + std::mem::size_of::<PathRequest>())
            + self
                .requests
                .values()
                .map(PathRequest::result_bytes)
                .sum::<usize>()
            + self.pending.capacity() * std::mem::size_of::<(RequestId, Priority)>()
            + self.processing.capacity() * std::mem::size_of::<RequestId>()
    }

    /// Blocking search outside the queue.
    pub fn find_path(
        &mut self,
        grid: &mut NavGrid,
        start: Vec3,
        goal: Vec3,
        profile: &MovementProfile,
    ) -> (Path, PathStats) {
        self.search.search(grid, start, goal, profile)
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Run one scheduling step now with the configured time slice.
    pub fn tick(&mut self, grid: &mut NavGrid) -> TickReport {
        self.tick_at(grid, Instant::now())
    }

    /// Run one scheduling step, treating `now` as the current time for
    /// timeouts, completion stamps and eviction.
    pub fn tick_at(&mut self, grid: &mut NavGrid, now: Instant) -> TickReport {
        let budget = self.config.time_slice;
        self.tick_with_budget(grid, now, budget)
    }

    /// Run one scheduling step with an explicit search budget. A zero budget
    /// admits work without running any search.
    pub fn tick_with_budget(
        &mut self,
        grid: &mut NavGrid,
        now: Instant,
        budget: Duration,
    ) -> TickReport {
        let t0 = Instant::now();
        self.clock = Some((now, t0));
        let mut report = TickReport {
            expired: self.expire(now),
            admitted: self.admit(),
            ..TickReport::default()
        };

        let batch = self.processing.clone();
        for id in batch {
            if t0.elapsed() >= budget {
                report.budget_exhausted = true;
                break;
            }
            report.searched += 1;
            match self.run(grid, id, now) {
                Some(RequestStatus::Completed) => report.completed += 1,
                Some(_) => report.failed += 1,
                None => {}
            }
        }

        report.evicted = self.evict(now);
        report.elapsed = t0.elapsed();
        if report.expired + report.admitted + report.searched + report.evicted > 0 {
            log::debug!(
                "tick: {} expired, {} admitted, {} searched, {} evicted; {} pending, {} processing",
                report.expired,
                report.admitted,
                report.searched,
                report.evicted,
                self.pending.len(),
                self.processing.len()
            );
        }
        report
    }

    fn expire(&mut self, now: Instant) -> usize {
        let overdue: Vec<RequestId> = self
            .pending
            .ids()
            .chain(self.processing.iter().copied())
            .filter(|id| self.requests.get(id).is_some_and(|r| r.is_expired(now)))
            .collect();
        for &id in &overdue {
            self.pending.remove(id);
            self.processing.retain(|p| *p != id);
            if let Some(req) = self.requests.get_mut(&id) {
                log::warn!(
                    "request {} timed out after {:?} ({})",
                    id,
                    req.timeout,
                    req.status
                );
                req.finish(RequestStatus::TimedOut, now);
            }
            self.stats.timed_out += 1;
        }
        overdue.len()
    }

    fn admit(&mut self) -> usize {
        let mut admitted = 0;
        while self.processing.len() < self.config.max_concurrent {
            let Some(id) = self.pending.pop() else {
                break;
            };
            let Some(req) = self.requests.get_mut(&id) else {
                continue;
            };
            req.status = RequestStatus::Processing;
            self.processing.push(id);
            admitted += 1;
        }
        self.stats.peak_processing = self.stats.peak_processing.max(self.processing.len());
        admitted
    }

    /// Run the search of processing request `id`. Returns its final status.
    fn run(&mut self, grid: &mut NavGrid, id: RequestId, now: Instant) -> Option<RequestStatus> {
        self.processing.retain(|p| *p != id);
        let req = self.requests.get(&id)?;
        if req.status != RequestStatus::Processing {
            return None;
        }
        let search = &mut self.search;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            search.search(grid, req.start, req.goal, &req.profile)
        }));

        let req = self.requests.get_mut(&id)?;
        let status = match outcome {
            Ok((path, stats)) => {
                let status = if stats.path_found {
                    RequestStatus::Completed
                } else {
                    req.error = stats.failure.map(|f| f.to_string());
                    RequestStatus::Failed
                };
                req.path = Some(path);
                req.stats = Some(stats);
                status
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::warn!("search of request {} panicked: {}", id, msg);
                req.error = Some(msg);
                RequestStatus::Failed
            }
        };
        req.finish(status, now);
        match status {
            RequestStatus::Completed => self.stats.completed += 1,
            _ => self.stats.failed += 1,
        }
        Some(status)
    }

    fn evict(&mut self, now: Instant) -> usize {
        let retention = self.config.result_retention;
        let before = self.requests.len();
        self.requests.retain(|_, r| {
            r.completed_at
                .is_none_or(|done| now.saturating_duration_since(done) < retention)
        });
        let evicted = before - self.requests.len();
        self.stats.evicted += evicted as u64;
        evicted
    }
}

impl<S: PathSearch> std::fmt::Debug for Scheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("requests", &self.requests.len())
            .field("pending", &self.pending.len())
            .field("processing", &self.processing)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "search panicked".to_string()
    }
}
