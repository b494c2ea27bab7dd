//! Geometry primitives: [`Coord`], [`Vec3`], [`CoordBox`] and [`Aabb`].
//!
//! Grid space uses integer [`Coord`]s, world space uses `f32` [`Vec3`]s.
//! The `y` axis is vertical in both.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// An integer grid coordinate. `y` grows upward.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    /// Origin (0, 0, 0).
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// One step up.
    pub const UP: Self = Self { x: 0, y: 1, z: 0 };

    /// One step down.
    pub const DOWN: Self = Self { x: 0, y: -1, z: 0 };

    /// The four horizontal cardinal offsets (+z, +x, -z, -x).
    pub const CARDINALS: [Self; 4] = [
        Self::new(0, 0, 1),
        Self::new(1, 0, 0),
        Self::new(0, 0, -1),
        Self::new(-1, 0, 0),
    ];

    /// The four horizontal diagonal offsets.
    pub const DIAGONALS: [Self; 4] = [
        Self::new(1, 0, 1),
        Self::new(1, 0, -1),
        Self::new(-1, 0, -1),
        Self::new(-1, 0, 1),
    ];

    /// Create a new coordinate.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Return a coordinate shifted by (dx, dy, dz).
    #[inline]
    pub const fn shift(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Manhattan (L1) distance over all three axes.
    #[inline]
    pub fn manhattan(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }

    /// Chebyshev (L∞) distance over all three axes.
    #[inline]
    pub fn chebyshev(self, other: Self) -> i32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }

    /// Whether `other` is one grid step away: a horizontal cardinal, a
    /// horizontal diagonal, or a pure vertical step.
    pub fn is_adjacent(self, other: Self) -> bool {
        let d = other - self;
        let (ax, ay, az) = (d.x.abs(), d.y.abs(), d.z.abs());
        if ax > 1 || ay > 1 || az > 1 || self == other {
            return false;
        }
        if ay == 1 {
            return ax == 0 && az == 0;
        }
        true
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Add for Coord {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Coord {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<i32> for Coord {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: i32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

// ---------------------------------------------------------------------------
// Vec3
// ---------------------------------------------------------------------------

/// A world-space position or direction.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// A vector with all three components set to `v`.
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Whether every component is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ---------------------------------------------------------------------------
// CoordBox
// ---------------------------------------------------------------------------

/// A half-open box of grid coordinates \[min, max).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoordBox {
    pub min: Coord,
    pub max: Coord,
}

impl CoordBox {
    /// Create a box from a min (inclusive) and max (exclusive) corner.
    #[inline]
    pub const fn new(min: Coord, max: Coord) -> Self {
        Self { min, max }
    }

    /// Box covering both corners inclusively, in any order.
    pub fn from_corners(a: Coord, b: Coord) -> Self {
        Self {
            min: Coord::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Coord::new(a.x.max(b.x) + 1, a.y.max(b.y) + 1, a.z.max(b.z) + 1),
        }
    }

    /// Size along each axis.
    #[inline]
    pub fn size(self) -> Coord {
        self.max - self.min
    }

    /// Whether the box contains no coordinates.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y || self.min.z >= self.max.z
    }

    /// Number of coordinates in the box.
    #[inline]
    pub fn len(self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let s = self.size();
        s.x as usize * s.y as usize * s.z as usize
    }

    #[inline]
    pub fn contains(self, c: Coord) -> bool {
        c.x >= self.min.x
            && c.x < self.max.x
            && c.y >= self.min.y
            && c.y < self.max.y
            && c.z >= self.min.z
            && c.z < self.max.z
    }

    /// Intersection of two boxes. Returns the empty default box when they
    /// do not overlap.
    pub fn intersect(self, other: Self) -> Self {
        let r = Self {
            min: Coord::new(
                self.min.x.max(other.min.x),
                self.min.y.max(other.min.y),
                self.min.z.max(other.min.z),
            ),
            max: Coord::new(
                self.max.x.min(other.max.x),
                self.max.y.min(other.max.y),
                self.max.z.min(other.max.z),
            ),
        };
        if r.is_empty() { Self::default() } else { r }
    }

    /// Iterator over every coordinate, `x` fastest, then `z`, then `y`.
    #[inline]
    pub fn iter(self) -> CoordBoxIter {
        CoordBoxIter {
            bounds: self,
            cur: self.min,
        }
    }
}

impl IntoIterator for CoordBox {
    type Item = Coord;
    type IntoIter = CoordBoxIter;
    #[inline]
    fn into_iter(self) -> CoordBoxIter {
        self.iter()
    }
}

impl fmt::Display for CoordBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{})", self.min, self.max)
    }
}

/// Iterator over the coordinates in a [`CoordBox`].
#[derive(Clone, Debug)]
pub struct CoordBoxIter {
    bounds: CoordBox,
    cur: Coord,
}

impl Iterator for CoordBoxIter {
    type Item = Coord;

    fn next(&mut self) -> Option<Coord> {
        if self.bounds.is_empty() || self.cur.y >= self.bounds.max.y {
            return None;
        }
        let c = self.cur;
        self.cur.x += 1;
        if self.cur.x >= self.bounds.max.x {
            self.cur.x = self.bounds.min.x;
            self.cur.z += 1;
            if self.cur.z >= self.bounds.max.z {
                self.cur.z = self.bounds.min.z;
                self.cur.y += 1;
            }
        }
        Some(c)
    }
}

// ---------------------------------------------------------------------------
// Aabb
// ---------------------------------------------------------------------------

/// A world-space axis-aligned bounding box. Both corners are inclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from two corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a box from its centre and half extents.
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Whether the two boxes share interior volume. Boxes that merely touch
    /// on a face do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Translate the box by `offset`.
    #[inline]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Shrink (or grow, with a negative margin) every face by `margin`.
    pub fn shrunk(&self, margin: f32) -> Self {
        let m = Vec3::splat(margin);
        let min = self.min + m;
        let max = self.max - m;
        Self::new(min.min(self.center()), max.max(self.center()))
    }
}
