use std::collections::HashSet;
use std::f32::consts::SQRT_2;
use std::time::Instant;

use tacnav_core::{Coord, NavGrid, Node, Vec3};

use crate::heap::IndexedHeap;
use crate::profile::MovementProfile;
use crate::stats::{PathFailure, PathStats};

/// Cost model and limits of a [`Pathfinder`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PathfinderConfig {
    /// Open-set pops allowed before a search gives up.
    pub max_iterations: usize,
    /// Cost of one cardinal step on neutral terrain.
    pub base_cost: f32,
    /// Multiplier of a horizontal diagonal step.
    pub diagonal_factor: f32,
    /// Multiplier of a vertical step.
    pub vertical_factor: f32,
    /// Extra cost per unit of surface height gained.
    pub climb_penalty: f32,
    /// Upward steps above this need a climbable node at either end.
    pub step_tolerance: f32,
    /// Largest surface height difference between a diagonal move's source
    /// and the two cardinals it cuts past.
    pub corner_tolerance: f32,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            base_cost: 1.0,
            diagonal_factor: SQRT_2,
            vertical_factor: 1.5,
            climb_penalty: 0.5,
            step_tolerance: 0.5,
            corner_tolerance: 0.5,
        }
    }
}

/// A search result: grid coordinates, world waypoints and the cost
/// accumulated up to each of them.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    pub coords: Vec<Coord>,
    pub waypoints: Vec<Vec3>,
    /// `costs[i]` is the cost from the start to `coords[i]`.
    pub costs: Vec<f32>,
}

impl Path {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn total_cost(&self) -> f32 {
        self.costs.last().copied().unwrap_or(0.0)
    }

    pub fn start(&self) -> Option<Coord> {
        self.coords.first().copied()
    }

    pub fn goal(&self) -> Option<Coord> {
        self.coords.last().copied()
    }
}

/// Per-search values derived from the grid, profile and config.
struct SearchContext<'a> {
    profile: &'a MovementProfile,
    diagonal: bool,
    vertical: bool,
    /// Lower bound of the terrain multiplier over every node.
    min_multiplier: f32,
    goal: Coord,
}

/// Reusable A* search over a [`NavGrid`].
///
/// Owns the open heap, closed set and neighbour buffer so repeated searches
/// allocate nothing once warm.
#[derive(Clone, Debug, Default)]
pub struct Pathfinder {
    config: PathfinderConfig,
    open: IndexedHeap,
    closed: HashSet<usize>,
    nbuf: Vec<(usize, f32)>,
}

impl Pathfinder {
    pub fn new(config: PathfinderConfig) -> Self {
        Self {
            config,
            open: IndexedHeap::default(),
            closed: HashSet::new(),
            nbuf: Vec::with_capacity(10),
        }
    }

    /// A pathfinder whose open heap is sized to `grid` up front.
    pub fn for_grid(grid: &NavGrid, config: PathfinderConfig) -> Self {
        Self {
            open: IndexedHeap::with_capacity(grid.len()),
            closed: HashSet::with_capacity(grid.len()),
            ..Self::new(config)
        }
    }

    #[inline]
    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    /// Search between two world positions.
    pub fn find_path(
        &mut self,
        grid: &mut NavGrid,
        start: Vec3,
        goal: Vec3,
        profile: &MovementProfile,
    ) -> (Path, PathStats) {
        let t0 = Instant::now();
        let Some(sc) = grid.world_to_grid(start) else {
            return fail(PathFailure::StartOutOfBounds, t0);
        };
        let Some(gc) = grid.world_to_grid(goal) else {
            return fail(PathFailure::GoalOutOfBounds, t0);
        };
        self.search(grid, sc, gc, profile, t0)
    }

    /// Search between two grid coordinates.
    pub fn find_path_coords(
        &mut self,
        grid: &mut NavGrid,
        start: Coord,
        goal: Coord,
        profile: &MovementProfile,
    ) -> (Path, PathStats) {
        self.search(grid, start, goal, profile, Instant::now())
    }

    fn search(
        &mut self,
        grid: &mut NavGrid,
        start: Coord,
        goal: Coord,
        profile: &MovementProfile,
        t0: Instant,
    ) -> (Path, PathStats) {
        if let Err(reason) = profile.validate() {
            return fail(reason, t0);
        }
        let Some(si) = grid.index_of(start) else {
            return fail(PathFailure::StartOutOfBounds, t0);
        };
        let Some(gi) = grid.index_of(goal) else {
            return fail(PathFailure::GoalOutOfBounds, t0);
        };
        // The agent usually occupies its own start cell, so only the scan
        // result matters there.
        if !grid.node(si).is_some_and(|n| n.walkable) {
            return fail(PathFailure::StartBlocked, t0);
        }
        if !grid
            .node(gi)
            .is_some_and(|n| n.is_passable() && profile.allows(n.terrain))
        {
            return fail(PathFailure::GoalBlocked, t0);
        }

        let cfg = grid.config();
        let ctx = SearchContext {
            profile,
            diagonal: profile.allow_diagonal && cfg.allow_diagonal,
            vertical: profile.allow_vertical && cfg.allow_vertical,
            min_multiplier: (cfg.terrain_costs.min_multiplier()
                * profile.terrain_costs.min_multiplier())
            .min(1.0),
            goal,
        };

        let cur_gen = grid.reset_search_state();
        self.open.clear(grid.nodes_mut());
        self.open.reserve_for(grid.len());
        self.closed.clear();

        let h0 = self.heuristic(&ctx, start);
        {
            let s = grid.nodes_mut()[si].search_mut(cur_gen);
            s.g = 0.0;
            s.h = h0;
            s.f = h0;
            s.parent = None;
        }
        self.open.push(grid.nodes_mut(), si);

        let mut stats = PathStats::default();
        let mut nbuf = std::mem::take(&mut self.nbuf);

        let found = 'search: loop {
            if stats.iterations >= self.config.max_iterations {
                stats.failure = Some(PathFailure::IterationCap);
                break 'search false;
            }
            let Some(ci) = self.open.pop(grid.nodes_mut()) else {
                stats.failure = Some(PathFailure::NoPath);
                break 'search false;
            };
            stats.iterations += 1;

            if ci == gi {
                break 'search true;
            }

            self.closed.insert(ci);
            stats.nodes_explored += 1;
            let current_g = grid.nodes()[ci].raw_search().g;

            nbuf.clear();
            self.neighbors(grid, &ctx, ci, &mut nbuf);

            for &(ni, cost) in nbuf.iter() {
                if self.closed.contains(&ni) {
                    continue;
                }
                let tentative_g = current_g + cost;
                let h = self.heuristic(&ctx, grid.coord_of(ni));

                let s = grid.nodes_mut()[ni].search_mut(cur_gen);
                if tentative_g >= s.g {
                    continue;
                }
                s.g = tentative_g;
                s.h = h;
                s.f = tentative_g + h;
                s.parent = Some(ci);

                let nodes = grid.nodes_mut();
                if self.open.contains(nodes, ni) {
                    self.open.update(nodes, ni);
                } else {
                    self.open.push(nodes, ni);
                }
            }
        };

        self.nbuf = nbuf;
        stats.open_set_size = self.open.len();
        stats.closed_set_size = self.closed.len();
        self.open.clear(grid.nodes_mut());

        let path = if found {
            reconstruct(grid, gi, cur_gen)
        } else {
            Path::default()
        };

        stats.path_found = found;
        stats.path_length = path.len();
        stats.total_cost = path.total_cost();
        stats.elapsed = t0.elapsed();

        if stats.failure == Some(PathFailure::IterationCap) {
            log::warn!(
                "search {} -> {} hit the iteration cap ({}), {} nodes explored",
                start,
                goal,
                self.config.max_iterations,
                stats.nodes_explored
            );
        } else {
            log::debug!("search {} -> {} ({}): {}", start, goal, profile.name, stats);
        }
        (path, stats)
    }

    /// Admissible estimate from `c` to the goal: octile (or Manhattan)
    /// horizontal distance plus weighted vertical steps, scaled by the
    /// cheapest terrain multiplier.
    fn heuristic(&self, ctx: &SearchContext<'_>, c: Coord) -> f32 {
        let dx = (c.x - ctx.goal.x).abs() as f32;
        let dy = (c.y - ctx.goal.y).abs() as f32;
        let dz = (c.z - ctx.goal.z).abs() as f32;
        let horizontal = if ctx.diagonal {
            let (lo, hi) = if dx < dz { (dx, dz) } else { (dz, dx) };
            (hi - lo) + self.config.diagonal_factor.min(2.0) * lo
        } else {
            dx + dz
        };
        self.config.base_cost * ctx.min_multiplier * (horizontal + self.config.vertical_factor * dy)
    }

    /// Collect `(index, edge cost)` of every legal move out of `ci`.
    /// Order: cardinals, then vertical, then diagonals.
    fn neighbors(
        &self,
        grid: &NavGrid,
        ctx: &SearchContext<'_>,
        ci: usize,
        buf: &mut Vec<(usize, f32)>,
    ) {
        let Some(from) = grid.node(ci) else {
            return;
        };
        let here = from.coord;

        for d in Coord::CARDINALS {
            self.try_move(grid, ctx, from, here + d, Move::Straight, buf);
        }
        if ctx.vertical {
            for d in [Coord::UP, Coord::DOWN] {
                self.try_move(grid, ctx, from, here + d, Move::Vertical, buf);
            }
        }
        if ctx.diagonal {
            for d in Coord::DIAGONALS {
                if self.corner_clear(grid, from, here, d) {
                    self.try_move(grid, ctx, from, here + d, Move::Diagonal, buf);
                }
            }
        }
    }

    /// Both cardinals a diagonal cuts past must be passable and close to
    /// the source's surface height.
    fn corner_clear(&self, grid: &NavGrid, from: &Node, here: Coord, d: Coord) -> bool {
        let h = from.surface_height();
        [here.shift(d.x, 0, 0), here.shift(0, 0, d.z)]
            .into_iter()
            .all(|c| {
                grid.node_at(c).is_some_and(|n| {
                    n.is_passable() && (n.surface_height() - h).abs() <= self.config.corner_tolerance
                })
            })
    }

    fn try_move(
        &self,
        grid: &NavGrid,
        ctx: &SearchContext<'_>,
        from: &Node,
        to: Coord,
        kind: Move,
        buf: &mut Vec<(usize, f32)>,
    ) {
        let Some(ni) = grid.index_of(to) else {
            return;
        };
        let Some(dest) = grid.node(ni) else {
            return;
        };
        if !dest.is_passable() || !ctx.profile.allows(dest.terrain) {
            return;
        }
        let rise = dest.surface_height() - from.surface_height();
        if rise.abs() > ctx.profile.max_climb_height {
            return;
        }
        if rise > self.config.step_tolerance && !from.is_climbable() && !dest.is_climbable() {
            return;
        }
        buf.push((ni, self.edge_cost(grid, ctx, dest, kind, rise)));
    }

    fn edge_cost(
        &self,
        grid: &NavGrid,
        ctx: &SearchContext<'_>,
        dest: &Node,
        kind: Move,
        rise: f32,
    ) -> f32 {
        let terrain = grid.config().terrain_costs.multiplier(dest.terrain)
            * ctx.profile.terrain_costs.multiplier(dest.terrain)
            * ctx.profile.preference(dest.terrain);
        let step = match kind {
            Move::Straight => 1.0,
            Move::Diagonal => self.config.diagonal_factor,
            Move::Vertical => self.config.vertical_factor,
        };
        self.config.base_cost * terrain * step + self.config.climb_penalty * rise.max(0.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Move {
    Straight,
    Diagonal,
    Vertical,
}

fn fail(reason: PathFailure, t0: Instant) -> (Path, PathStats) {
    let mut stats = PathStats::failed(reason);
    stats.elapsed = t0.elapsed();
    log::debug!("search rejected: {}", reason);
    (Path::default(), stats)
}

fn reconstruct(grid: &NavGrid, goal: usize, cur_gen: u32) -> Path {
    let mut path = Path::default();
    let mut next = Some(goal);
    while let Some(i) = next {
        let Some(node) = grid.node(i) else {
            break;
        };
        let s = node.search(cur_gen);
        path.coords.push(node.coord);
        path.waypoints.push(node.world_pos);
        path.costs.push(s.map_or(0.0, |s| s.g));
        next = s.and_then(|s| s.parent);
    }
    path.coords.reverse();
    path.waypoints.reverse();
    path.costs.reverse();
    path
}
