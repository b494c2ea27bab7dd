//! Shared skirmish scenario used by the demo binary.
//!
//! Demonstrates: obstacle scan over a generated scene, static and moving
//! obstacles, per-profile movement rules, time-sliced request scheduling
//! and line-of-sight path smoothing.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use tacnav_core::{
    Aabb, Coord, GridConfig, GridError, NavGrid, ObstacleKey, OccupationTracker, StaticScene,
    TerrainMask, TrackerConfig, Vec3,
};
use tacnav_paths::{MovementProfile, Pathfinder, PathfinderConfig, smooth_path};
use tacnav_sched::{Priority, RequestId, RequestStatus, Scheduler, SchedulerConfig, SchedulerError};

pub const WIDTH: usize = 48;
pub const HEIGHT: usize = 4;
pub const DEPTH: usize = 48;
pub const UNITS: usize = 8;
/// Simulated time per step.
pub const STEP: Duration = Duration::from_millis(50);

const CRATES: usize = 60;
const BARRICADES: usize = 6;
const VEHICLE: ObstacleKey = ObstacleKey(1000);

/// Errors building a [`Skirmish`].
#[derive(Debug, thiserror::Error)]
pub enum SkirmishError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Unit {
    profile: MovementProfile,
    pos: Vec3,
    goal: Vec3,
    request: Option<RequestId>,
    /// Smoothed waypoints still to walk.
    route: Vec<Vec3>,
}

/// Totals gathered over a run.
#[derive(Clone, Debug, Default)]
pub struct Summary {
    pub steps: usize,
    pub walkable: usize,
    pub blocked: usize,
    pub requests: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub arrivals: usize,
    pub waypoints_raw: usize,
    pub waypoints_smoothed: usize,
    pub tracker_updates: usize,
    pub peak_processing: usize,
    pub memory_bytes: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "steps:            {}", self.steps)?;
        writeln!(
            f,
            "grid:             {} walkable, {} blocked",
            self.walkable, self.blocked
        )?;
        writeln!(
            f,
            "requests:         {} submitted, {} completed, {} failed, {} timed out, {} cancelled",
            self.requests, self.completed, self.failed, self.timed_out, self.cancelled
        )?;
        writeln!(f, "arrivals:         {}", self.arrivals)?;
        writeln!(
            f,
            "waypoints:        {} raw, {} after smoothing",
            self.waypoints_raw, self.waypoints_smoothed
        )?;
        writeln!(f, "tracker updates:  {}", self.tracker_updates)?;
        writeln!(f, "peak processing:  {}", self.peak_processing)?;
        write!(f, "scheduler memory: ~{} bytes", self.memory_bytes)
    }
}

// ---------------------------------------------------------------------------
// Skirmish
// ---------------------------------------------------------------------------

/// A seeded skirmish: a generated yard with crates, a two-storey tower, a
/// patrolling vehicle and a squad of units repeatedly ordered to random
/// destinations.
pub struct Skirmish {
    grid: NavGrid,
    scene: StaticScene,
    tracker: OccupationTracker,
    scheduler: Scheduler,
    vehicles: HashMap<ObstacleKey, Aabb>,
    units: Vec<Unit>,
    rng: StdRng,
    clock: Instant,
    summary: Summary,
}

impl Skirmish {
    pub fn new(seed: u64) -> Result<Self, SkirmishError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut grid = NavGrid::new(GridConfig::with_size(WIDTH, HEIGHT, DEPTH))?;
        let scene = build_scene(&mut rng);
        let report = grid.scan(&scene);

        let mut tracker = OccupationTracker::new(&grid, TrackerConfig::default());
        let barricades: Vec<(ObstacleKey, Aabb)> = (0..BARRICADES)
            .map(|i| {
                let x = rng.random_range(4..WIDTH as i32 - 4) as f32;
                let z = rng.random_range(4..DEPTH as i32 - 4) as f32;
                let bx = Aabb::new(Vec3::new(x, 0.0, z), Vec3::new(x + 3.0, 1.0, z + 1.0));
                (ObstacleKey(i as u64), bx)
            })
            .collect();
        tracker.scan_static(&mut grid, barricades);

        let clock = Instant::now();
        let mut vehicles = HashMap::new();
        let truck = Aabb::new(Vec3::new(0.0, 0.0, 20.0), Vec3::new(3.0, 1.5, 22.0));
        vehicles.insert(VEHICLE, truck);
        tracker.track(&mut grid, VEHICLE, truck, clock);

        let scheduler = Scheduler::with_search(
            SchedulerConfig {
                max_concurrent: 3,
                ..SchedulerConfig::default()
            },
            Pathfinder::for_grid(&grid, PathfinderConfig::default()),
        )?;

        let presets = [
            MovementProfile::infantry(),
            MovementProfile::scout(),
            MovementProfile::heavy(),
            MovementProfile::climber(),
        ];
        let mut units = Vec::with_capacity(UNITS);
        for i in 0..UNITS {
            let Some(pos) = random_passable(&grid, &mut rng) else {
                break;
            };
            units.push(Unit {
                profile: presets[i % presets.len()].clone(),
                pos,
                goal: pos,
                request: None,
                route: Vec::new(),
            });
        }

        let summary = Summary {
            walkable: report.walkable,
            blocked: report.blocked,
            ..Summary::default()
        };
        Ok(Self {
            grid,
            scene,
            tracker,
            scheduler,
            vehicles,
            units,
            rng,
            clock,
            summary,
        })
    }

    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Advance the simulation by one [`STEP`].
    pub fn step(&mut self) {
        self.clock += STEP;
        let now = self.clock;
        self.summary.steps += 1;

        self.drive_vehicle();
        let update = self.tracker.update(&mut self.grid, &self.vehicles, now);
        self.summary.tracker_updates += update.updated;

        self.order_units();
        self.scheduler.tick_at(&mut self.grid, now);
        self.collect_routes();
        self.walk_units();
    }

    /// Run `steps` steps and return the totals.
    pub fn run(&mut self, steps: usize) -> Summary {
        for _ in 0..steps {
            self.step();
        }
        self.summary()
    }

    pub fn summary(&self) -> Summary {
        let stats = self.scheduler.stats();
        Summary {
            requests: stats.submitted,
            completed: stats.completed,
            failed: stats.failed,
            timed_out: stats.timed_out,
            cancelled: stats.cancelled,
            peak_processing: stats.peak_processing,
            memory_bytes: self.scheduler.memory_estimate(),
            ..self.summary.clone()
        }
    }

    /// The vehicle patrols back and forth along x.
    fn drive_vehicle(&mut self) {
        let Some(bx) = self.vehicles.get_mut(&VEHICLE) else {
            return;
        };
        let speed = 4.0 * STEP.as_secs_f32();
        let phase = (self.summary.steps as f32 * speed) % (2.0 * (WIDTH as f32 - 3.0));
        let x = if phase < WIDTH as f32 - 3.0 {
            phase
        } else {
            2.0 * (WIDTH as f32 - 3.0) - phase
        };
        *bx = Aabb::new(Vec3::new(x, 0.0, 20.0), Vec3::new(x + 3.0, 1.5, 22.0));
    }

    /// Give idle units a new destination. Units stuck on a stale request
    /// occasionally change their mind and cancel it.
    fn order_units(&mut self) {
        for i in 0..self.units.len() {
            let unit = &self.units[i];
            if let Some(id) = unit.request {
                if self.scheduler.status(id) == Some(RequestStatus::Pending)
                    && self.rng.random_range(0..200) == 0
                {
                    self.scheduler.cancel(id);
                    self.units[i].request = None;
                }
                continue;
            }
            if !unit.route.is_empty() {
                continue;
            }
            let Some(goal) = random_passable(&self.grid, &mut self.rng) else {
                continue;
            };
            let priority = if self.rng.random_range(0..10) == 0 {
                Priority::Urgent
            } else {
                Priority::Normal
            };
            let unit = &mut self.units[i];
            unit.goal = goal;
            unit.request = Some(self.scheduler.submit_at(
                unit.pos,
                goal,
                &unit.profile,
                priority,
                None,
                self.clock,
            ));
        }
    }

    /// Pick up finished requests and smooth their paths against the scene.
    fn collect_routes(&mut self) {
        for unit in &mut self.units {
            let Some(id) = unit.request else {
                continue;
            };
            match self.scheduler.status(id) {
                Some(RequestStatus::Completed) => {
                    if let Some(path) = self.scheduler.result(id) {
                        let smoothed = smooth_path(path, &self.scene);
                        self.summary.waypoints_raw += path.len();
                        self.summary.waypoints_smoothed += smoothed.len();
                        unit.route = smoothed.into_iter().skip(1).rev().collect();
                    }
                    unit.request = None;
                }
                Some(RequestStatus::Pending | RequestStatus::Processing) => {}
                _ => unit.request = None,
            }
        }
    }

    /// Units jump one waypoint per step.
    fn walk_units(&mut self) {
        for unit in &mut self.units {
            if let Some(next) = unit.route.pop() {
                unit.pos = next;
                let at_goal =
                    self.grid.world_to_grid(unit.pos) == self.grid.world_to_grid(unit.goal);
                if unit.route.is_empty() && at_goal {
                    self.summary.arrivals += 1;
                }
            }
        }
    }
}

/// Yard with crates, a rough field, a hazard zone and a tower whose roof is
/// reached by a ladder.
fn build_scene(rng: &mut StdRng) -> StaticScene {
    let (w, d) = (WIDTH as f32, DEPTH as f32);
    let mut scene = StaticScene::with_floor(0.0).volume(
        Aabb::new(Vec3::ZERO, Vec3::new(w, HEIGHT as f32, d)),
        TerrainMask::NORMAL | TerrainMask::OUTDOOR,
        0.0,
    );

    for _ in 0..CRATES {
        let x = rng.random_range(0..WIDTH as i32) as f32;
        let z = rng.random_range(0..DEPTH as i32) as f32;
        if (19.0..23.0).contains(&z) {
            continue;
        }
        scene = scene.solid(Aabb::new(Vec3::new(x, 0.0, z), Vec3::new(x + 1.0, 1.0, z + 1.0)));
    }

    scene = scene
        .volume(
            Aabb::new(Vec3::new(4.0, 0.0, 30.0), Vec3::new(16.0, 1.0, 44.0)),
            TerrainMask::ROUGH | TerrainMask::OUTDOOR,
            0.0,
        )
        .volume(
            Aabb::new(Vec3::new(30.0, 0.0, 4.0), Vec3::new(38.0, 1.0, 12.0)),
            TerrainMask::HAZARDOUS | TerrainMask::OUTDOOR,
            0.0,
        );

    // tower: walls around an indoor ground floor, a roof deck at y = 2
    let (x0, z0) = (36.0, 30.0);
    scene = scene
        .solid(Aabb::new(Vec3::new(x0, 0.0, z0), Vec3::new(x0 + 8.0, 2.0, z0 + 0.2)))
        .solid(Aabb::new(Vec3::new(x0, 0.0, z0 + 7.8), Vec3::new(x0 + 8.0, 2.0, z0 + 8.0)))
        .solid(Aabb::new(Vec3::new(x0 + 7.8, 0.0, z0), Vec3::new(x0 + 8.0, 2.0, z0 + 8.0)))
        .solid(Aabb::new(Vec3::new(x0, 1.8, z0), Vec3::new(x0 + 8.0, 2.0, z0 + 8.0)))
        .volume(
            Aabb::new(Vec3::new(x0, 0.0, z0), Vec3::new(x0 + 8.0, 1.8, z0 + 8.0)),
            TerrainMask::NORMAL | TerrainMask::INDOOR,
            0.0,
        )
        .volume(
            Aabb::new(Vec3::new(x0 - 1.0, 0.0, z0 + 4.0), Vec3::new(x0, 3.0, z0 + 5.0)),
            TerrainMask::CLIMBABLE | TerrainMask::OUTDOOR,
            0.0,
        );
    scene
}

/// A random passable ground-level cell centre.
fn random_passable(grid: &NavGrid, rng: &mut StdRng) -> Option<Vec3> {
    for _ in 0..200 {
        let c = Coord::new(
            rng.random_range(0..grid.width() as i32),
            0,
            rng.random_range(0..grid.depth() as i32),
        );
        if grid.node_at(c).is_some_and(|n| n.is_passable()) {
            return Some(grid.grid_to_world(c));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_scene() {
        let a = Skirmish::new(7).unwrap();
        let b = Skirmish::new(7).unwrap();
        assert_eq!(a.summary().walkable, b.summary().walkable);
        assert_eq!(a.unit_count(), UNITS);
        assert!(a.summary().blocked > 0);
    }

    #[test]
    fn tower_roof_is_reachable_by_ladder() {
        let s = Skirmish::new(42).unwrap();
        let ladder = s.grid().node_at(Coord::new(35, 1, 34)).unwrap();
        assert!(ladder.walkable);
        assert!(ladder.is_climbable());
        let roof = s.grid().node_at(Coord::new(38, 2, 33)).unwrap();
        assert!(roof.walkable);
    }

    #[test]
    fn run_makes_progress() {
        let mut s = Skirmish::new(42).unwrap();
        let summary = s.run(40);
        assert_eq!(summary.steps, 40);
        assert!(summary.requests >= UNITS as u64);
        assert!(summary.completed > 0);
        assert!(summary.peak_processing <= 3);
        assert!(summary.waypoints_smoothed <= summary.waypoints_raw);
        assert!(summary.tracker_updates > 0);
    }

    #[test]
    fn long_run_has_no_timeouts() {
        // well past the default timeout on the simulated clock
        let mut s = Skirmish::new(42).unwrap();
        let summary = s.run(400);
        assert_eq!(summary.timed_out, 0);
        let finished = summary.completed + summary.failed + summary.cancelled;
        assert!(summary.requests <= finished + UNITS as u64);
        assert!(summary.completed > 0);
    }
}
