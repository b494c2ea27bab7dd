//! Voxel traversal over a [`NavGrid`].
//!
//! Uses the Amanatides & Woo DDA: step to whichever axis boundary the
//! segment crosses next, so every cell the segment passes through is visited
//! exactly once.

use crate::geom::{Coord, Vec3};
use crate::grid::NavGrid;
use crate::probe::LineOfSight;

impl NavGrid {
    /// Cells crossed by the part of the segment `from → to` that lies inside
    /// the grid, in order. Endpoints outside the grid are clipped to its
    /// bounds; a segment missing the grid yields no cells.
    pub fn traverse(&self, from: Vec3, to: Vec3) -> Vec<Coord> {
        if !from.is_finite() || !to.is_finite() {
            return Vec::new();
        }
        let Some((t_in, t_out)) = self.clip_segment(from, to) else {
            return Vec::new();
        };
        let seg = to - from;
        let (a, b) = (from + seg * t_in, from + seg * t_out);

        let inv = 1.0 / self.cell_size();
        let p0 = (a - self.origin()) * inv;
        let p1 = (b - self.origin()) * inv;
        let d = p1 - p0;

        let mut cur = self.clamp(self.world_to_grid_unbounded(a));
        let end = self.clamp(self.world_to_grid_unbounded(b));

        let axis = |o: f32, dir: f32, c: i32| -> (i32, f32, f32) {
            if dir > 0.0 {
                (1, ((c + 1) as f32 - o) / dir, 1.0 / dir)
            } else if dir < 0.0 {
                (-1, (c as f32 - o) / dir, -1.0 / dir)
            } else {
                (0, f32::INFINITY, f32::INFINITY)
            }
        };
        let (sx, mut tx, dx) = axis(p0.x, d.x, cur.x);
        let (sy, mut ty, dy) = axis(p0.y, d.y, cur.y);
        let (sz, mut tz, dz) = axis(p0.z, d.z, cur.z);

        // both ends are clamped, so this is bounded by the grid's extent
        let max_steps = (i64::from(cur.x) - i64::from(end.x)).unsigned_abs()
            + (i64::from(cur.y) - i64::from(end.y)).unsigned_abs()
            + (i64::from(cur.z) - i64::from(end.z)).unsigned_abs();
        let max_steps = usize::try_from(max_steps)
            .unwrap_or(usize::MAX)
            .min(self.width() + self.height() + self.depth());
        let mut cells = Vec::with_capacity(max_steps + 1);
        cells.push(cur);
        for _ in 0..max_steps {
            if cur == end {
                break;
            }
            if tx <= ty && tx <= tz {
                if tx > 1.0 {
                    break;
                }
                cur.x += sx;
                tx += dx;
            } else if ty <= tz {
                if ty > 1.0 {
                    break;
                }
                cur.y += sy;
                ty += dy;
            } else {
                if tz > 1.0 {
                    break;
                }
                cur.z += sz;
                tz += dz;
            }
            if !self.contains(cur) {
                break;
            }
            cells.push(cur);
        }
        cells
    }

    /// Parameter range `[t_in, t_out]` of `from → to` inside the grid's
    /// world bounds.
    fn clip_segment(&self, from: Vec3, to: Vec3) -> Option<(f32, f32)> {
        let lo = self.origin();
        let cell = self.cell_size();
        let hi = lo
            + Vec3::new(
                self.width() as f32 * cell,
                self.height() as f32 * cell,
                self.depth() as f32 * cell,
            );
        let d = to - from;
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        for (o, dir, lo, hi) in [
            (from.x, d.x, lo.x, hi.x),
            (from.y, d.y, lo.y, hi.y),
            (from.z, d.z, lo.z, hi.z),
        ] {
            if dir == 0.0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let (mut near, mut far) = ((lo - o) / dir, (hi - o) / dir);
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t0 = t0.max(near);
            t1 = t1.min(far);
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// Whether every cell crossed by `from → to` is inside the grid and
    /// passable.
    pub fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        if self.world_to_grid(from).is_none() || self.world_to_grid(to).is_none() {
            return false;
        }
        let cells = self.traverse(from, to);
        !cells.is_empty()
            && cells
                .iter()
                .all(|&c| self.node_at(c).is_some_and(|n| n.is_passable()))
    }
}

impl LineOfSight for NavGrid {
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        self.line_of_sight(from, to)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GridConfig;
    use crate::geom::{Coord, Vec3};
    use crate::grid::NavGrid;

    fn flat(w: usize, d: usize) -> NavGrid {
        NavGrid::new(GridConfig::with_size(w, 1, d)).unwrap()
    }

    #[test]
    fn traverse_straight_line() {
        let g = flat(6, 1);
        let cells = g.traverse(Vec3::new(0.5, 0.5, 0.5), Vec3::new(4.5, 0.5, 0.5));
        let xs: Vec<i32> = cells.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn traverse_cells_are_face_connected() {
        let g = flat(8, 8);
        let cells = g.traverse(Vec3::new(0.3, 0.5, 0.2), Vec3::new(6.7, 0.5, 4.1));
        assert_eq!(cells.first(), Some(&Coord::new(0, 0, 0)));
        assert_eq!(cells.last(), Some(&Coord::new(6, 0, 4)));
        for w in cells.windows(2) {
            assert_eq!(w[0].manhattan(w[1]), 1);
        }
    }

    #[test]
    fn line_of_sight_blocked_by_unwalkable_cell() {
        let mut g = flat(6, 3);
        let a = g.grid_to_world(Coord::new(0, 0, 1));
        let b = g.grid_to_world(Coord::new(5, 0, 1));
        assert!(g.line_of_sight(a, b));
        g.set_walkable(Coord::new(3, 0, 1), false);
        assert!(!g.line_of_sight(a, b));
        // row z = 0 is still clear
        let c = g.grid_to_world(Coord::new(0, 0, 0));
        let e = g.grid_to_world(Coord::new(5, 0, 0));
        assert!(g.line_of_sight(c, e));
    }

    #[test]
    fn line_of_sight_leaving_the_grid_is_blocked() {
        let g = flat(3, 3);
        assert!(!g.line_of_sight(Vec3::new(0.5, 0.5, 0.5), Vec3::new(5.5, 0.5, 0.5)));
    }

    #[test]
    fn far_endpoints_are_handled() {
        let g = flat(4, 4);
        let inside = Vec3::new(0.5, 0.5, 0.5);
        let far = Vec3::splat(1.0e12);
        assert!(!g.line_of_sight(inside, far));
        assert!(!g.line_of_sight(far, inside));
        assert!(!g.line_of_sight(Vec3::splat(-1.0e12), far));

        let cells = g.traverse(inside, far);
        assert!(!cells.is_empty());
        assert!(cells.len() <= 4 + 1 + 4);
        assert!(cells.iter().all(|&c| g.contains(c)));
        assert_eq!(cells[0], Coord::new(0, 0, 0));
    }

    #[test]
    fn traverse_clips_to_the_grid() {
        let g = flat(6, 1);
        let cells = g.traverse(Vec3::new(-3.5, 0.5, 0.5), Vec3::new(9.5, 0.5, 0.5));
        let xs: Vec<i32> = cells.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0, 1, 2, 3, 4, 5]);
        assert!(g.traverse(Vec3::new(0.5, 5.0, 0.5), Vec3::new(5.5, 5.0, 0.5)).is_empty());
    }
}
