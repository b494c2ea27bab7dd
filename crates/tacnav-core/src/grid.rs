//! The [`NavGrid`] type — a dense 3D array of [`Node`]s.
//!
//! Nodes are stored layer by layer (`y` outermost, then `z`, then `x`), so
//! iterating indices in order walks the grid bottom-up.

use std::time::{Duration, Instant};

use crate::config::GridConfig;
use crate::error::GridError;
use crate::geom::{Aabb, Coord, CoordBox, Vec3};
use crate::node::Node;
use crate::probe::WorldProbe;

/// Summary of an obstacle scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub cells: usize,
    pub blocked: usize,
    pub walkable: usize,
    pub elapsed: Duration,
}

/// A 3D navigation grid.
#[derive(Clone, Debug)]
pub struct NavGrid {
    config: GridConfig,
    nodes: Vec<Node>,
    bounds: CoordBox,
    generation: u32,
}

impl NavGrid {
    /// Build a grid from `config`. Every node starts walkable with normal
    /// terrain until [`scan`](Self::scan) runs.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        config.validate()?;
        let bounds = CoordBox::new(
            Coord::ZERO,
            Coord::new(
                config.width as i32,
                config.height as i32,
                config.depth as i32,
            ),
        );
        let mut nodes = Vec::with_capacity(config.cell_count());
        for c in bounds.iter() {
            nodes.push(Node::new(c, cell_center(&config, c)));
        }
        Ok(Self {
            config,
            nodes,
            bounds,
            generation: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Grid-space bounds. Empty after [`dispose`](Self::dispose).
    #[inline]
    pub fn bounds(&self) -> CoordBox {
        self.bounds
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.config.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.config.height
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.config.depth
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.config.cell_size
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.config.origin
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, c: Coord) -> bool {
        self.bounds.contains(c)
    }

    // -----------------------------------------------------------------------
    // Indexing
    // -----------------------------------------------------------------------

    /// Flat index of `c`, or `None` if out of bounds.
    #[inline]
    pub fn index_of(&self, c: Coord) -> Option<usize> {
        if !self.bounds.contains(c) {
            return None;
        }
        let (w, d) = (self.config.width, self.config.depth);
        Some((c.y as usize * d + c.z as usize) * w + c.x as usize)
    }

    /// Coordinate of flat index `idx`.
    #[inline]
    pub fn coord_of(&self, idx: usize) -> Coord {
        let (w, d) = (self.config.width, self.config.depth);
        let x = idx % w;
        let z = (idx / w) % d;
        let y = idx / (w * d);
        Coord::new(x as i32, y as i32, z as i32)
    }

    #[inline]
    pub fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    #[inline]
    pub fn node_mut(&mut self, idx: usize) -> Option<&mut Node> {
        self.nodes.get_mut(idx)
    }

    /// The node at `c`, or `None` if out of bounds.
    #[inline]
    pub fn node_at(&self, c: Coord) -> Option<&Node> {
        self.index_of(c).and_then(|i| self.nodes.get(i))
    }

    #[inline]
    pub fn node_at_mut(&mut self, c: Coord) -> Option<&mut Node> {
        let i = self.index_of(c)?;
        self.nodes.get_mut(i)
    }

    /// All nodes in index order.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable access to the node slab, used by searches and the heap.
    #[inline]
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    // -----------------------------------------------------------------------
    // Coordinate transforms
    // -----------------------------------------------------------------------

    /// Cell containing world position `pos`, even if outside the grid.
    pub fn world_to_grid_unbounded(&self, pos: Vec3) -> Coord {
        let local = (pos - self.config.origin) * (1.0 / self.config.cell_size);
        Coord::new(
            local.x.floor() as i32,
            local.y.floor() as i32,
            local.z.floor() as i32,
        )
    }

    /// Cell containing world position `pos`, or `None` if outside the grid.
    pub fn world_to_grid(&self, pos: Vec3) -> Option<Coord> {
        if !pos.is_finite() {
            return None;
        }
        let c = self.world_to_grid_unbounded(pos);
        self.contains(c).then_some(c)
    }

    /// World-space centre of cell `c`.
    #[inline]
    pub fn grid_to_world(&self, c: Coord) -> Vec3 {
        cell_center(&self.config, c)
    }

    /// World-space volume of cell `c`.
    pub fn cell_bounds(&self, c: Coord) -> Aabb {
        let half = Vec3::splat(self.config.cell_size * 0.5);
        Aabb::from_center(self.grid_to_world(c), half)
    }

    /// Clamp `c` into the grid bounds.
    pub fn clamp(&self, c: Coord) -> Coord {
        let max = self.bounds.max;
        Coord::new(
            c.x.clamp(0, (max.x - 1).max(0)),
            c.y.clamp(0, (max.y - 1).max(0)),
            c.z.clamp(0, (max.z - 1).max(0)),
        )
    }

    /// Cells overlapped by world box `region`, clamped to the grid. Empty if
    /// the box lies entirely outside.
    pub fn world_box_to_grid(&self, region: &Aabb) -> CoordBox {
        let lo = self.world_to_grid_unbounded(region.min);
        let hi = self.world_to_grid_unbounded(region.max);
        CoordBox::from_corners(lo, hi).intersect(self.bounds)
    }

    // -----------------------------------------------------------------------
    // Region queries
    // -----------------------------------------------------------------------

    /// Nodes in the inclusive box spanned by `min` and `max`, clamped to the
    /// grid.
    pub fn nodes_in_box(&self, min: Coord, max: Coord) -> Vec<&Node> {
        let b = CoordBox::from_corners(min, max).intersect(self.bounds);
        b.iter().filter_map(|c| self.node_at(c)).collect()
    }

    /// Flat indices of the nodes in `b`, clamped to the grid.
    pub fn indices_in_box(&self, b: CoordBox) -> impl Iterator<Item = usize> + '_ {
        b.intersect(self.bounds)
            .iter()
            .filter_map(|c| self.index_of(c))
    }

    /// Nodes whose centre lies within `radius` of `center`.
    pub fn nodes_in_radius(&self, center: Vec3, radius: f32) -> Vec<&Node> {
        if radius < 0.0 || !radius.is_finite() {
            return Vec::new();
        }
        let cube = Aabb::from_center(center, Vec3::splat(radius));
        let r2 = radius * radius;
        self.world_box_to_grid(&cube)
            .iter()
            .filter_map(|c| self.node_at(c))
            .filter(|n| {
                let d = n.world_pos - center;
                d.dot(d) <= r2
            })
            .collect()
    }

    /// Whether the cell at world position `pos` can be stood in.
    pub fn is_walkable(&self, pos: Vec3) -> bool {
        self.world_to_grid(pos)
            .and_then(|c| self.node_at(c))
            .is_some_and(Node::is_passable)
    }

    /// Set the scan walkability of the node at `c`. Returns `false` if out of
    /// bounds.
    pub fn set_walkable(&mut self, c: Coord, walkable: bool) -> bool {
        match self.node_at_mut(c) {
            Some(n) => {
                n.walkable = walkable;
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Search state
    // -----------------------------------------------------------------------

    /// Current search generation.
    #[inline]
    pub fn search_generation(&self) -> u32 {
        self.generation
    }

    /// Start a new search: every node's g/h/parent/heap index is logically
    /// cleared. Returns the generation stamp the search must use.
    ///
    /// Bumps the generation stamp so stale scratch state is ignored; the
    /// eager clear only runs when the stamp wraps.
    pub fn reset_search_state(&mut self) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.clear_search_state();
        }
        self.generation
    }

    /// Eagerly clear the scratch state of every node.
    pub fn clear_search_state(&mut self) {
        let generation = self.generation;
        for n in &mut self.nodes {
            n.clear_search(generation);
        }
    }

    // -----------------------------------------------------------------------
    // Obstacle scan
    // -----------------------------------------------------------------------

    /// Recompute walkability, terrain and climb height of every node from
    /// `probe`.
    ///
    /// A cell is blocked when geometry overlaps its (inset) volume. It is
    /// supported when the ground probe finds ground below its centre, when
    /// the cell below is blocked, or when the node below is a walkable
    /// climbable node. Walkable = not blocked and supported.
    pub fn scan<P: WorldProbe + ?Sized>(&mut self, probe: &P) -> ScanReport {
        let start = Instant::now();
        let mut solid = vec![false; self.nodes.len()];
        let mut report = ScanReport {
            cells: self.nodes.len(),
            ..ScanReport::default()
        };
        let layer = self.config.width * self.config.depth;
        let half = Vec3::splat(self.config.cell_size * 0.5);

        for i in 0..self.nodes.len() {
            let pos = self.nodes[i].world_pos;
            let volume = Aabb::from_center(pos, half).shrunk(self.config.overlap_margin);
            let blocked = probe.overlaps(&volume);

            let supported = if blocked {
                false
            } else if probe.has_ground(pos, self.config.ground_probe_distance) {
                true
            } else if i >= layer {
                let below = &self.nodes[i - layer];
                solid[i - layer] || (below.walkable && below.is_climbable())
            } else {
                false
            };

            solid[i] = blocked;
            let n = &mut self.nodes[i];
            n.terrain = probe.terrain_at(pos);
            n.climb_height = probe.climb_height_at(pos);
            n.walkable = !blocked && supported;

            if blocked {
                report.blocked += 1;
            }
            if n.walkable {
                report.walkable += 1;
            }
        }

        report.elapsed = start.elapsed();
        log::info!(
            "grid scan: {} cells, {} walkable, {} blocked in {:?}",
            report.cells,
            report.walkable,
            report.blocked,
            report.elapsed
        );
        report
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Release every node. The grid reports as empty afterwards.
    pub fn dispose(&mut self) {
        self.nodes = Vec::new();
        self.bounds = CoordBox::default();
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + self.nodes.capacity() * std::mem::size_of::<Node>()
    }
}

fn cell_center(config: &GridConfig, c: Coord) -> Vec3 {
    let s = config.cell_size;
    config.origin
        + Vec3::new(
            (c.x as f32 + 0.5) * s,
            (c.y as f32 + 0.5) * s,
            (c.z as f32 + 0.5) * s,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticScene;
    use crate::terrain::TerrainMask;

    fn grid(w: usize, h: usize, d: usize) -> NavGrid {
        NavGrid::new(GridConfig::with_size(w, h, d)).unwrap()
    }

    #[test]
    fn every_coord_maps_to_one_node() {
        let g = grid(4, 3, 5);
        assert_eq!(g.len(), 60);
        for c in g.bounds().iter() {
            let i = g.index_of(c).unwrap();
            assert_eq!(g.coord_of(i), c);
            assert_eq!(g.node(i).unwrap().coord, c);
        }
        assert!(g.node_at(Coord::new(4, 0, 0)).is_none());
        assert!(g.node_at(Coord::new(0, -1, 0)).is_none());
    }

    #[test]
    fn indices_are_bottom_up() {
        let g = grid(3, 2, 3);
        assert_eq!(g.index_of(Coord::new(0, 1, 0)), Some(9));
        assert_eq!(g.index_of(Coord::new(2, 0, 2)), Some(8));
    }

    #[test]
    fn world_round_trip_within_one_cell() {
        let cfg = GridConfig {
            cell_size: 0.5,
            origin: Vec3::new(-3.0, 1.0, 2.0),
            ..GridConfig::with_size(10, 4, 10)
        };
        let g = NavGrid::new(cfg).unwrap();
        let samples = [
            Vec3::new(-3.0, 1.0, 2.0),
            Vec3::new(-2.74, 1.26, 2.9),
            Vec3::new(1.99, 2.99, 6.99),
            Vec3::new(0.0, 2.0, 4.0),
        ];
        for p in samples {
            let c = g.world_to_grid(p).unwrap();
            let back = g.grid_to_world(c);
            assert!(back.distance(p) <= g.cell_size() * 3f32.sqrt() * 0.5 + 1e-5);
            assert!((back.x - p.x).abs() <= g.cell_size());
            assert_eq!(g.world_to_grid(back), Some(c));
        }
    }

    #[test]
    fn world_to_grid_outside_is_none() {
        let g = grid(4, 1, 4);
        assert_eq!(g.world_to_grid(Vec3::new(-0.1, 0.5, 0.5)), None);
        assert_eq!(g.world_to_grid(Vec3::new(4.0, 0.5, 0.5)), None);
        assert_eq!(g.world_to_grid(Vec3::new(f32::NAN, 0.5, 0.5)), None);
        assert_eq!(
            g.world_to_grid(Vec3::new(3.9, 0.5, 0.1)),
            Some(Coord::new(3, 0, 0))
        );
    }

    #[test]
    fn nodes_in_box_is_clamped_and_inclusive() {
        let g = grid(4, 2, 4);
        let nodes = g.nodes_in_box(Coord::new(-5, 0, 2), Coord::new(1, 0, 9));
        // x in 0..=1, y = 0, z in 2..=3
        assert_eq!(nodes.len(), 4);
        assert!(nodes.iter().all(|n| n.coord.x <= 1 && n.coord.z >= 2));
    }

    #[test]
    fn nodes_in_radius_filters_by_distance() {
        let g = grid(5, 1, 5);
        let center = g.grid_to_world(Coord::new(2, 0, 2));
        let near = g.nodes_in_radius(center, 1.0);
        // centre plus four cardinals; diagonals are sqrt(2) away
        assert_eq!(near.len(), 5);
        let wide = g.nodes_in_radius(center, 1.5);
        assert_eq!(wide.len(), 9);
        assert!(g.nodes_in_radius(center, -1.0).is_empty());
    }

    #[test]
    fn reset_search_state_invalidates_scratch() {
        let mut g = grid(2, 1, 2);
        let first = g.reset_search_state();
        g.node_mut(0).unwrap().search_mut(first).g = 3.0;
        let second = g.reset_search_state();
        assert_ne!(first, second);
        assert!(g.node(0).unwrap().search(second).is_none());
        assert_eq!(g.node_mut(0).unwrap().search_mut(second).g, f32::INFINITY);
    }

    #[test]
    fn generation_wrap_clears_eagerly() {
        let mut g = grid(2, 1, 2);
        g.generation = u32::MAX;
        g.node_mut(1).unwrap().search_mut(u32::MAX).parent = Some(0);
        let next = g.reset_search_state();
        assert_eq!(next, 0);
        let s = g.node(1).unwrap().search(0).copied().unwrap();
        assert_eq!(s.parent, None);
    }

    #[test]
    fn scan_marks_blocked_and_unsupported_cells() {
        let mut g = grid(4, 3, 4);
        // a 1x1x1 crate at (1, 0, 1) and nothing else above the floor
        let crate_box = Aabb::new(Vec3::new(1.0, 0.0, 1.0), Vec3::new(2.0, 1.0, 2.0));
        let scene = StaticScene::with_floor(0.0).solid(crate_box);
        let report = g.scan(&scene);

        assert_eq!(report.cells, 48);
        assert_eq!(report.blocked, 1);
        // 15 floor cells + the cell on top of the crate
        assert_eq!(report.walkable, 16);
        assert!(!g.node_at(Coord::new(1, 0, 1)).unwrap().walkable);
        assert!(g.node_at(Coord::new(1, 1, 1)).unwrap().walkable);
        assert!(!g.node_at(Coord::new(0, 1, 0)).unwrap().walkable);
        assert!(!g.node_at(Coord::new(1, 2, 1)).unwrap().walkable);
    }

    #[test]
    fn scan_supports_ladder_columns() {
        let mut g = grid(2, 3, 1);
        let ladder = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 3.0, 1.0));
        let scene = StaticScene::with_floor(0.0).volume(ladder, TerrainMask::CLIMBABLE, 0.0);
        g.scan(&scene);
        for y in 0..3 {
            let n = g.node_at(Coord::new(0, y, 0)).unwrap();
            assert!(n.walkable, "ladder cell {y} should be walkable");
            assert!(n.is_climbable());
        }
        assert!(!g.node_at(Coord::new(1, 1, 0)).unwrap().walkable);
    }

    #[test]
    fn is_walkable_reads_occupancy_too() {
        let mut g = grid(3, 1, 3);
        let p = g.grid_to_world(Coord::new(1, 0, 1));
        assert!(g.is_walkable(p));
        g.node_at_mut(Coord::new(1, 0, 1)).unwrap().occupied = true;
        assert!(!g.is_walkable(p));
        assert!(!g.is_walkable(Vec3::new(-5.0, 0.0, 0.0)));
    }

    #[test]
    fn world_box_to_grid_clamps() {
        let g = grid(4, 2, 4);
        let b = g.world_box_to_grid(&Aabb::new(
            Vec3::new(-2.0, 0.2, 2.5),
            Vec3::new(1.5, 0.8, 10.0),
        ));
        assert_eq!(b.min, Coord::new(0, 0, 2));
        assert_eq!(b.max, Coord::new(2, 1, 4));
        let outside = g.world_box_to_grid(&Aabb::new(Vec3::splat(20.0), Vec3::splat(21.0)));
        assert!(outside.is_empty());
    }

    #[test]
    fn dispose_releases_nodes() {
        let mut g = grid(3, 1, 3);
        assert!(g.memory_estimate() > 9 * std::mem::size_of::<Node>());
        g.dispose();
        assert!(g.is_empty());
        assert!(g.node_at(Coord::ZERO).is_none());
        assert!(!g.is_walkable(Vec3::splat(0.5)));
    }
}
