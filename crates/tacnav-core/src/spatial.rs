//! Spatial hash over grid node indices.
//!
//! Nodes are grouped into cubic buckets of `bucket_size` cells. A bucket's
//! key is derived from its bucket coordinate by mixing the three axes with
//! large primes.

use std::collections::HashMap;

use crate::geom::{Coord, CoordBox};
use crate::grid::NavGrid;

const PRIME_X: i64 = 73_856_093;
const PRIME_Y: i64 = 19_349_663;
const PRIME_Z: i64 = 83_492_791;

/// Hash key of bucket coordinate `b`.
#[inline]
pub fn spatial_key(b: Coord) -> i64 {
    (b.x as i64).wrapping_mul(PRIME_X)
        ^ (b.y as i64).wrapping_mul(PRIME_Y)
        ^ (b.z as i64).wrapping_mul(PRIME_Z)
}

/// Bucketed node indices.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    bucket_size: i32,
    buckets: HashMap<i64, Vec<(Coord, usize)>>,
}

impl SpatialHash {
    /// Bucket every node of `grid`.
    pub fn build(grid: &NavGrid, bucket_size: i32) -> Self {
        let bucket_size = bucket_size.max(1);
        let mut buckets: HashMap<i64, Vec<(Coord, usize)>> = HashMap::new();
        for (i, n) in grid.nodes().iter().enumerate() {
            let key = spatial_key(bucket_of(n.coord, bucket_size));
            buckets.entry(key).or_default().push((n.coord, i));
        }
        Self {
            bucket_size,
            buckets,
        }
    }

    #[inline]
    pub fn bucket_size(&self) -> i32 {
        self.bucket_size
    }

    /// Number of non-empty buckets.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket coordinate containing cell `c`.
    #[inline]
    pub fn bucket_of(&self, c: Coord) -> Coord {
        bucket_of(c, self.bucket_size)
    }

    /// Node indices inside `b`. Only the buckets overlapping `b` are visited.
    pub fn query_box(&self, b: CoordBox) -> Vec<usize> {
        if b.is_empty() {
            return Vec::new();
        }
        let lo = self.bucket_of(b.min);
        let hi = self.bucket_of(b.max - Coord::new(1, 1, 1));
        let mut out = Vec::new();
        for bc in CoordBox::from_corners(lo, hi) {
            // Distinct bucket coords may collide on one key; the coordinate
            // filter keeps results exact.
            if let Some(entries) = self.buckets.get(&spatial_key(bc)) {
                out.extend(
                    entries
                        .iter()
                        .filter(|(c, _)| b.contains(*c))
                        .map(|(_, i)| *i),
                );
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[inline]
fn bucket_of(c: Coord, size: i32) -> Coord {
    Coord::new(
        c.x.div_euclid(size),
        c.y.div_euclid(size),
        c.z.div_euclid(size),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    #[test]
    fn keys_differ_for_neighbouring_buckets() {
        let k = spatial_key(Coord::new(1, 0, 1));
        assert_ne!(k, spatial_key(Coord::new(1, 0, 2)));
        assert_ne!(k, spatial_key(Coord::new(2, 0, 1)));
        assert_ne!(k, spatial_key(Coord::new(1, 1, 1)));
    }

    #[test]
    fn every_node_is_bucketed_once() {
        let g = NavGrid::new(GridConfig::with_size(9, 2, 7)).unwrap();
        let h = SpatialHash::build(&g, 4);
        let all = h.query_box(g.bounds());
        assert_eq!(all.len(), g.len());
        // 3 x 1 x 2 buckets
        assert_eq!(h.bucket_count(), 6);
    }

    #[test]
    fn query_box_matches_direct_walk() {
        let g = NavGrid::new(GridConfig::with_size(10, 3, 10)).unwrap();
        let h = SpatialHash::build(&g, 3);
        let b = CoordBox::new(Coord::new(2, 1, 4), Coord::new(7, 3, 6));
        let mut direct: Vec<usize> = g.indices_in_box(b).collect();
        direct.sort_unstable();
        assert_eq!(h.query_box(b), direct);
        assert!(h.query_box(CoordBox::default()).is_empty());
    }

    #[test]
    fn bucket_size_is_at_least_one() {
        let g = NavGrid::new(GridConfig::with_size(2, 1, 2)).unwrap();
        let h = SpatialHash::build(&g, 0);
        assert_eq!(h.bucket_size(), 1);
        assert_eq!(h.bucket_of(Coord::new(-1, 0, 3)), Coord::new(-1, 0, 3));
    }
}
