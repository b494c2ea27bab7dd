use tacnav_core::{LineOfSight, Vec3};

use crate::astar::Path;

/// Drop intermediate waypoints that a straight segment can skip.
///
/// Starting from the first waypoint, the anchor extends to each following
/// waypoint while `los` reports the segment clear; the last clear one
/// becomes the next anchor. Endpoints are always kept.
pub fn smooth_path<L: LineOfSight + ?Sized>(path: &Path, los: &L) -> Vec<Vec3> {
    smooth_waypoints(&path.waypoints, los)
}

/// [`smooth_path`] over a bare waypoint list.
pub fn smooth_waypoints<L: LineOfSight + ?Sized>(waypoints: &[Vec3], los: &L) -> Vec<Vec3> {
    let Some(&first) = waypoints.first() else {
        return Vec::new();
    };
    let last = waypoints.len() - 1;
    let mut out = vec![first];
    let mut anchor = 0;
    while anchor < last {
        let mut next = anchor + 1;
        while next < last && los.is_clear(waypoints[anchor], waypoints[next + 1]) {
            next += 1;
        }
        out.push(waypoints[next]);
        anchor = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::Pathfinder;
    use crate::profile::MovementProfile;
    use tacnav_core::{Coord, GridConfig, NavGrid};

    fn row(n: usize) -> Vec<Vec3> {
        (0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn clear_line_collapses_to_endpoints() {
        let pts = row(6);
        let out = smooth_waypoints(&pts, &|_: Vec3, _: Vec3| true);
        assert_eq!(out, vec![pts[0], pts[5]]);
    }

    #[test]
    fn blocked_line_keeps_everything() {
        let pts = row(4);
        let out = smooth_waypoints(&pts, &|_: Vec3, _: Vec3| false);
        assert_eq!(out, pts);
    }

    #[test]
    fn short_inputs() {
        let always = |_: Vec3, _: Vec3| true;
        assert!(smooth_waypoints(&[], &always).is_empty());
        let one = [Vec3::ONE];
        assert_eq!(smooth_waypoints(&one, &always), vec![Vec3::ONE]);
    }

    #[test]
    fn bends_around_grid_obstacle() {
        let mut g = NavGrid::new(GridConfig::with_size(5, 1, 5)).unwrap();
        for z in 0..4 {
            g.set_walkable(Coord::new(2, 0, z), false);
        }
        let mut pf = Pathfinder::default();
        let (path, stats) = pf.find_path_coords(
            &mut g,
            Coord::new(0, 0, 0),
            Coord::new(4, 0, 0),
            &MovementProfile::infantry(),
        );
        assert!(stats.path_found);
        let smoothed = smooth_path(&path, &g);
        assert!(smoothed.len() >= 3);
        assert!(smoothed.len() < path.len());
        assert_eq!(smoothed.first(), path.waypoints.first());
        assert_eq!(smoothed.last(), path.waypoints.last());
        for w in smoothed.windows(2) {
            assert!(g.line_of_sight(w[0], w[1]));
        }
    }
}
