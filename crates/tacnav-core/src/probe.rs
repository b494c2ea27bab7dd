//! Collaborator interfaces: the physics/scene queries the grid consumes.
//!
//! The engine never talks to a physics backend directly. Hosts implement
//! [`WorldProbe`], [`LineOfSight`] and [`ObstacleSource`] over whatever
//! collision world they own. [`StaticScene`] is a small box-based
//! implementation used by tests and the demo.

use std::collections::HashMap;

use crate::geom::{Aabb, Vec3};
use crate::terrain::TerrainMask;

/// Scene queries used by the obstacle scan.
pub trait WorldProbe {
    /// Whether any solid geometry overlaps `region`.
    fn overlaps(&self, region: &Aabb) -> bool;

    /// Whether solid ground lies below `from` within `max_distance`.
    fn has_ground(&self, from: Vec3, max_distance: f32) -> bool;

    /// Terrain classification at `pos`.
    fn terrain_at(&self, _pos: Vec3) -> TerrainMask {
        TerrainMask::NORMAL
    }

    /// Height of the standing surface above the cell floor at `pos`.
    fn climb_height_at(&self, _pos: Vec3) -> f32 {
        0.0
    }
}

/// Visibility query used by path smoothing.
pub trait LineOfSight {
    /// Whether the straight segment `from → to` is unobstructed.
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool;
}

impl<F: Fn(Vec3, Vec3) -> bool> LineOfSight for F {
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        self(from, to)
    }
}

/// Opaque handle for a movement-capable entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObstacleKey(pub u64);

/// Source of current bounds for tracked dynamic obstacles.
pub trait ObstacleSource {
    /// Current world bounds of `key`, or `None` if the entity is gone.
    fn bounds_of(&self, key: ObstacleKey) -> Option<Aabb>;
}

impl ObstacleSource for HashMap<ObstacleKey, Aabb> {
    fn bounds_of(&self, key: ObstacleKey) -> Option<Aabb> {
        self.get(&key).copied()
    }
}

// ---------------------------------------------------------------------------
// StaticScene
// ---------------------------------------------------------------------------

/// A terrain volume: cells whose centre falls inside `region` get `terrain`
/// and `climb_height`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerrainVolume {
    pub region: Aabb,
    pub terrain: TerrainMask,
    pub climb_height: f32,
}

/// A scene made of solid axis-aligned boxes over an optional flat floor.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticScene {
    /// World height of an infinite ground plane, if any.
    pub floor: Option<f32>,
    pub solids: Vec<Aabb>,
    /// Later volumes override earlier ones.
    pub volumes: Vec<TerrainVolume>,
}

impl StaticScene {
    /// An empty scene with a ground plane at `floor`.
    pub fn with_floor(floor: f32) -> Self {
        Self {
            floor: Some(floor),
            ..Self::default()
        }
    }

    /// Add a solid box.
    pub fn solid(mut self, region: Aabb) -> Self {
        self.solids.push(region);
        self
    }

    /// Add a terrain volume.
    pub fn volume(mut self, region: Aabb, terrain: TerrainMask, climb_height: f32) -> Self {
        self.volumes.push(TerrainVolume {
            region,
            terrain,
            climb_height,
        });
        self
    }

    fn volume_at(&self, pos: Vec3) -> Option<&TerrainVolume> {
        self.volumes.iter().rev().find(|v| v.region.contains(pos))
    }
}

impl WorldProbe for StaticScene {
    fn overlaps(&self, region: &Aabb) -> bool {
        self.solids.iter().any(|s| s.intersects(region))
    }

    fn has_ground(&self, from: Vec3, max_distance: f32) -> bool {
        if let Some(floor) = self.floor {
            if from.y >= floor && from.y - floor <= max_distance {
                return true;
            }
        }
        self.solids.iter().any(|s| {
            from.x >= s.min.x
                && from.x <= s.max.x
                && from.z >= s.min.z
                && from.z <= s.max.z
                && from.y >= s.max.y
                && from.y - s.max.y <= max_distance
        })
    }

    fn terrain_at(&self, pos: Vec3) -> TerrainMask {
        self.volume_at(pos)
            .map_or(TerrainMask::NORMAL, |v| v.terrain)
    }

    fn climb_height_at(&self, pos: Vec3) -> f32 {
        self.volume_at(pos).map_or(0.0, |v| v.climb_height)
    }
}

impl LineOfSight for StaticScene {
    /// Segment-vs-box slab test against every solid.
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        !self.solids.iter().any(|s| segment_hits_box(from, to, s))
    }
}

/// Slab test of the segment `a → b` against `bx`.
fn segment_hits_box(a: Vec3, b: Vec3, bx: &Aabb) -> bool {
    let d = b - a;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    for (o, dir, lo, hi) in [
        (a.x, d.x, bx.min.x, bx.max.x),
        (a.y, d.y, bx.min.y, bx.max.y),
        (a.z, d.z, bx.min.z, bx.max.z),
    ] {
        if dir.abs() < f32::EPSILON {
            if o <= lo || o >= hi {
                return false;
            }
            continue;
        }
        let inv = 1.0 / dir;
        let (mut near, mut far) = ((lo - o) * inv, (hi - o) * inv);
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }
        t0 = t0.max(near);
        t1 = t1.min(far);
        if t0 >= t1 {
            return false;
        }
    }
    true
}
