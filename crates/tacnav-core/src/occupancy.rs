//! Static and dynamic obstacle occupancy.
//!
//! The [`OccupationTracker`] keeps one record per obstacle listing the nodes
//! it currently claims, plus per-node claim counts for the static and the
//! dynamic set. A node's `occupied` flag is set while either count is
//! non-zero, so releasing one obstacle never frees a node another obstacle
//! still covers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::geom::{Aabb, Coord, Vec3};
use crate::grid::NavGrid;
use crate::probe::{ObstacleKey, ObstacleSource};
use crate::spatial::SpatialHash;

/// Tuning for dynamic obstacle re-evaluation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackerConfig {
    /// Minimum time between two re-evaluations of the same object.
    pub update_interval: Duration,
    /// Distance the object's centre must move before it is re-evaluated.
    pub movement_threshold: f32,
    /// Cap on re-evaluations per [`update`](OccupationTracker::update).
    pub max_updates_per_tick: usize,
    /// Edge length, in cells, of a spatial hash bucket.
    pub bucket_size: i32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(200),
            movement_threshold: 0.1,
            max_updates_per_tick: 10,
            bucket_size: 4,
        }
    }
}

/// Whether an obstacle belongs to fixed scene geometry or moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObstacleKind {
    Static,
    Dynamic,
}

#[derive(Clone, Debug)]
struct ObstacleRecord {
    kind: ObstacleKind,
    bounds: Aabb,
    nodes: Vec<usize>,
    last_update: Instant,
}

/// Outcome of one [`OccupationTracker::update`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerUpdate {
    /// Objects looked at.
    pub visited: usize,
    /// Objects whose occupancy was recomputed.
    pub updated: usize,
    /// Objects dropped because the source no longer reports them.
    pub removed: usize,
}

/// Tracks which nodes static and moving obstacles occupy.
#[derive(Clone, Debug)]
pub struct OccupationTracker {
    config: TrackerConfig,
    records: HashMap<ObstacleKey, ObstacleRecord>,
    static_claims: HashMap<usize, u32>,
    dynamic_claims: HashMap<usize, u32>,
    /// Round-robin order of dynamic objects.
    dynamic_order: Vec<ObstacleKey>,
    cursor: usize,
    hash: SpatialHash,
}

impl OccupationTracker {
    /// Create a tracker for `grid`, building its spatial hash.
    pub fn new(grid: &NavGrid, config: TrackerConfig) -> Self {
        let hash = SpatialHash::build(grid, config.bucket_size);
        Self {
            config,
            records: HashMap::new(),
            static_claims: HashMap::new(),
            dynamic_claims: HashMap::new(),
            dynamic_order: Vec::new(),
            cursor: 0,
            hash,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of distinct nodes claimed by static obstacles.
    #[inline]
    pub fn static_count(&self) -> usize {
        self.static_claims.len()
    }

    /// Number of distinct nodes claimed by dynamic obstacles.
    #[inline]
    pub fn dynamic_count(&self) -> usize {
        self.dynamic_claims.len()
    }

    /// Number of registered obstacles of either kind.
    #[inline]
    pub fn obstacle_count(&self) -> usize {
        self.records.len()
    }

    /// Number of tracked dynamic obstacles.
    #[inline]
    pub fn tracked_count(&self) -> usize {
        self.dynamic_order.len()
    }

    /// Node indices currently claimed by `key`.
    pub fn claimed_by(&self, key: ObstacleKey) -> Option<&[usize]> {
        self.records.get(&key).map(|r| r.nodes.as_slice())
    }

    pub fn kind_of(&self, key: ObstacleKey) -> Option<ObstacleKind> {
        self.records.get(&key).map(|r| r.kind)
    }

    /// Whether node `idx` is in the static or the dynamic set.
    #[inline]
    pub fn is_claimed(&self, idx: usize) -> bool {
        self.static_claims.contains_key(&idx) || self.dynamic_claims.contains_key(&idx)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register fixed geometry. Returns the number of nodes it claims.
    /// Re-registering a key replaces its previous record.
    pub fn add_static(&mut self, grid: &mut NavGrid, key: ObstacleKey, bounds: Aabb) -> usize {
        self.insert(grid, key, bounds, ObstacleKind::Static, Instant::now())
    }

    /// Register a batch of fixed geometry. Returns the number of distinct
    /// nodes in the static set afterwards.
    pub fn scan_static<I>(&mut self, grid: &mut NavGrid, obstacles: I) -> usize
    where
        I: IntoIterator<Item = (ObstacleKey, Aabb)>,
    {
        let now = Instant::now();
        let mut count = 0;
        for (key, bounds) in obstacles {
            self.insert(grid, key, bounds, ObstacleKind::Static, now);
            count += 1;
        }
        log::info!(
            "occupancy: {} static obstacles claim {} nodes",
            count,
            self.static_count()
        );
        self.static_count()
    }

    /// Start tracking a moving obstacle at `bounds`. Returns the number of
    /// nodes it claims.
    pub fn track(
        &mut self,
        grid: &mut NavGrid,
        key: ObstacleKey,
        bounds: Aabb,
        now: Instant,
    ) -> usize {
        self.insert(grid, key, bounds, ObstacleKind::Dynamic, now)
    }

    /// Forget an obstacle and release its claims. Returns `false` if the key
    /// was unknown.
    pub fn remove(&mut self, grid: &mut NavGrid, key: ObstacleKey) -> bool {
        let Some(record) = self.records.remove(&key) else {
            return false;
        };
        self.release_all(grid, &record.nodes, record.kind);
        if record.kind == ObstacleKind::Dynamic {
            if let Some(pos) = self.dynamic_order.iter().position(|k| *k == key) {
                self.dynamic_order.remove(pos);
                if pos < self.cursor {
                    self.cursor -= 1;
                }
            }
        }
        true
    }

    /// Re-evaluate `key` at `bounds` immediately, ignoring the interval and
    /// movement threshold. Returns the new claim count, or `None` if the key
    /// is unknown.
    pub fn refresh(
        &mut self,
        grid: &mut NavGrid,
        key: ObstacleKey,
        bounds: Aabb,
        now: Instant,
    ) -> Option<usize> {
        let kind = self.records.get(&key)?.kind;
        Some(self.reevaluate(grid, key, kind, bounds, now))
    }

    // -----------------------------------------------------------------------
    // Periodic update
    // -----------------------------------------------------------------------

    /// Revisit dynamic obstacles round-robin, re-evaluating those whose
    /// interval elapsed and that moved past the threshold, at most
    /// `max_updates_per_tick` of them.
    pub fn update<S: ObstacleSource + ?Sized>(
        &mut self,
        grid: &mut NavGrid,
        source: &S,
        now: Instant,
    ) -> TrackerUpdate {
        let mut out = TrackerUpdate::default();
        let total = self.dynamic_order.len();
        let mut remaining = total;

        while remaining > 0 && out.updated < self.config.max_updates_per_tick {
            remaining -= 1;
            if self.dynamic_order.is_empty() {
                break;
            }
            if self.cursor >= self.dynamic_order.len() {
                self.cursor = 0;
            }
            let key = self.dynamic_order[self.cursor];
            out.visited += 1;

            let Some(bounds) = source.bounds_of(key) else {
                self.remove(grid, key);
                out.removed += 1;
                continue;
            };
            self.cursor += 1;

            let Some(record) = self.records.get(&key) else {
                continue;
            };
            let threshold = self.config.movement_threshold;
            let due =
                now.saturating_duration_since(record.last_update) >= self.config.update_interval;
            let moved = record.bounds.center().distance(bounds.center()) > threshold
                || record.bounds.half_extents().distance(bounds.half_extents()) > threshold;
            if due && moved {
                self.reevaluate(grid, key, ObstacleKind::Dynamic, bounds, now);
                out.updated += 1;
            }
        }

        if out.updated > 0 || out.removed > 0 {
            log::debug!(
                "occupancy update: visited {}, updated {}, removed {}, {} dynamic nodes",
                out.visited,
                out.updated,
                out.removed,
                self.dynamic_count()
            );
        }
        out
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Claimed nodes whose centre lies within `radius` of `center`, found
    /// through the spatial hash.
    pub fn occupied_near(&self, grid: &NavGrid, center: Vec3, radius: f32) -> Vec<Coord> {
        if radius < 0.0 || !radius.is_finite() {
            return Vec::new();
        }
        let region = grid.world_box_to_grid(&Aabb::from_center(center, Vec3::splat(radius)));
        self.hash
            .query_box(region)
            .into_iter()
            .filter(|i| self.is_claimed(*i))
            .filter_map(|i| grid.node(i))
            .filter(|n| n.world_pos.distance(center) <= radius)
            .map(|n| n.coord)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn insert(
        &mut self,
        grid: &mut NavGrid,
        key: ObstacleKey,
        bounds: Aabb,
        kind: ObstacleKind,
        now: Instant,
    ) -> usize {
        if let Some(existing) = self.records.get(&key) {
            if existing.kind != kind {
                self.remove(grid, key);
            }
        }
        if kind == ObstacleKind::Dynamic && !self.dynamic_order.contains(&key) {
            self.dynamic_order.push(key);
        }
        self.reevaluate(grid, key, kind, bounds, now)
    }

    /// Release `key`'s previous claims and claim the nodes `bounds` covers.
    fn reevaluate(
        &mut self,
        grid: &mut NavGrid,
        key: ObstacleKey,
        kind: ObstacleKind,
        bounds: Aabb,
        now: Instant,
    ) -> usize {
        if let Some(old) = self.records.remove(&key) {
            self.release_all(grid, &old.nodes, old.kind);
        }
        let nodes = covered_nodes(grid, &bounds);
        for &i in &nodes {
            self.claim(grid, i, kind);
        }
        let count = nodes.len();
        self.records.insert(
            key,
            ObstacleRecord {
                kind,
                bounds,
                nodes,
                last_update: now,
            },
        );
        count
    }

    fn claims_mut(&mut self, kind: ObstacleKind) -> &mut HashMap<usize, u32> {
        match kind {
            ObstacleKind::Static => &mut self.static_claims,
            ObstacleKind::Dynamic => &mut self.dynamic_claims,
        }
    }

    fn claim(&mut self, grid: &mut NavGrid, idx: usize, kind: ObstacleKind) {
        *self.claims_mut(kind).entry(idx).or_insert(0) += 1;
        if let Some(n) = grid.node_mut(idx) {
            n.occupied = true;
        }
    }

    fn release_all(&mut self, grid: &mut NavGrid, nodes: &[usize], kind: ObstacleKind) {
        for &idx in nodes {
            let claims = self.claims_mut(kind);
            if let Some(count) = claims.get_mut(&idx) {
                *count -= 1;
                if *count == 0 {
                    claims.remove(&idx);
                }
            }
            let still = self.is_claimed(idx);
            if let Some(n) = grid.node_mut(idx) {
                n.occupied = still;
            }
        }
    }
}

/// Nodes whose (inset) cell volume overlaps `bounds`.
fn covered_nodes(grid: &NavGrid, bounds: &Aabb) -> Vec<usize> {
    let margin = grid.config().overlap_margin;
    grid.world_box_to_grid(bounds)
        .iter()
        .filter(|c| grid.cell_bounds(*c).shrunk(margin).intersects(bounds))
        .filter_map(|c| grid.index_of(c))
        .collect()
}
