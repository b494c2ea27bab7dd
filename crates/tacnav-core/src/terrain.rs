//! Terrain classification: [`TerrainMask`] and [`TerrainCosts`].

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

// ---------------------------------------------------------------------------
// TerrainMask
// ---------------------------------------------------------------------------

/// Bitmask of terrain types. Flags combine freely, e.g. a rooftop ladder is
/// `CLIMBABLE | OUTDOOR`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerrainMask(pub u8);

impl TerrainMask {
    pub const NONE: Self = Self(0);
    pub const NORMAL: Self = Self(1 << 0);
    pub const ROUGH: Self = Self(1 << 1);
    pub const HAZARDOUS: Self = Self(1 << 2);
    pub const CLIMBABLE: Self = Self(1 << 3);
    pub const WATER: Self = Self(1 << 4);
    pub const INDOOR: Self = Self(1 << 5);
    pub const OUTDOOR: Self = Self(1 << 6);
    pub const ALL: Self = Self(0x7F);

    const NAMES: [(Self, &'static str); 7] = [
        (Self::NORMAL, "normal"),
        (Self::ROUGH, "rough"),
        (Self::HAZARDOUS, "hazardous"),
        (Self::CLIMBABLE, "climbable"),
        (Self::WATER, "water"),
        (Self::INDOOR, "indoor"),
        (Self::OUTDOOR, "outdoor"),
    ];

    /// Whether this mask contains all the bits from `other`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Whether the two masks share at least one bit.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the single-bit flags set in this mask.
    pub fn flags(self) -> impl Iterator<Item = Self> {
        Self::NAMES
            .into_iter()
            .map(|(flag, _)| flag)
            .filter(move |flag| self.contains(*flag))
    }
}

impl BitOr for TerrainMask {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TerrainMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TerrainMask {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for TerrainMask {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl fmt::Display for TerrainMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TerrainCosts
// ---------------------------------------------------------------------------

/// Cost multiplier per terrain flag.
///
/// The multiplier of a combined mask is the product of the multipliers of
/// its flags; an empty mask costs 1.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TerrainCosts {
    pub normal: f32,
    pub rough: f32,
    pub hazardous: f32,
    pub climbable: f32,
    pub water: f32,
    pub indoor: f32,
    pub outdoor: f32,
}

impl Default for TerrainCosts {
    fn default() -> Self {
        Self {
            normal: 1.0,
            rough: 1.5,
            hazardous: 3.0,
            climbable: 2.0,
            water: 2.5,
            indoor: 1.0,
            outdoor: 1.0,
        }
    }
}

impl TerrainCosts {
    /// All multipliers set to 1.
    pub const UNIFORM: Self = Self {
        normal: 1.0,
        rough: 1.0,
        hazardous: 1.0,
        climbable: 1.0,
        water: 1.0,
        indoor: 1.0,
        outdoor: 1.0,
    };

    fn entries(&self) -> [(TerrainMask, f32); 7] {
        [
            (TerrainMask::NORMAL, self.normal),
            (TerrainMask::ROUGH, self.rough),
            (TerrainMask::HAZARDOUS, self.hazardous),
            (TerrainMask::CLIMBABLE, self.climbable),
            (TerrainMask::WATER, self.water),
            (TerrainMask::INDOOR, self.indoor),
            (TerrainMask::OUTDOOR, self.outdoor),
        ]
    }

    /// Multiplier for a (possibly combined) terrain mask.
    pub fn multiplier(&self, terrain: TerrainMask) -> f32 {
        self.entries()
            .into_iter()
            .filter(|(flag, _)| terrain.contains(*flag))
            .map(|(_, m)| m)
            .product()
    }

    /// A lower bound on [`multiplier`](Self::multiplier) over every
    /// possible mask, never above 1.
    pub fn min_multiplier(&self) -> f32 {
        self.entries()
            .into_iter()
            .map(|(_, m)| m.min(1.0))
            .product()
    }

    /// Whether every multiplier is finite and positive.
    pub fn is_valid(&self) -> bool {
        self.entries()
            .into_iter()
            .all(|(_, m)| m.is_finite() && m > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_combination() {
        let m = TerrainMask::ROUGH | TerrainMask::OUTDOOR;
        assert!(m.contains(TerrainMask::ROUGH));
        assert!(m.contains(TerrainMask::OUTDOOR));
        assert!(!m.contains(TerrainMask::WATER));
        assert!(m.intersects(TerrainMask::ROUGH | TerrainMask::WATER));
        assert_eq!(m.flags().count(), 2);
        assert_eq!(m.to_string(), "rough|outdoor");
    }

    #[test]
    fn mask_not_stays_in_range() {
        let m = !TerrainMask::WATER;
        assert!(!m.contains(TerrainMask::WATER));
        assert!(m.contains(TerrainMask::NORMAL | TerrainMask::CLIMBABLE));
        assert_eq!(!TerrainMask::ALL, TerrainMask::NONE);
    }

    #[test]
    fn multiplier_is_product_of_flags() {
        let costs = TerrainCosts::default();
        assert_eq!(costs.multiplier(TerrainMask::NONE), 1.0);
        assert_eq!(costs.multiplier(TerrainMask::NORMAL), 1.0);
        let m = costs.multiplier(TerrainMask::ROUGH | TerrainMask::WATER);
        assert!((m - 1.5 * 2.5).abs() < 1e-6);
    }

    #[test]
    fn min_multiplier_bounds_cheap_terrain() {
        let costs = TerrainCosts {
            rough: 0.5,
            indoor: 0.8,
            ..TerrainCosts::default()
        };
        let lower = costs.min_multiplier();
        assert!((lower - 0.4).abs() < 1e-6);
        assert!(costs.multiplier(TerrainMask::ROUGH | TerrainMask::INDOOR) >= lower - 1e-6);
        assert_eq!(TerrainCosts::default().min_multiplier(), 1.0);
    }

    #[test]
    fn invalid_costs_detected() {
        let costs = TerrainCosts {
            water: 0.0,
            ..TerrainCosts::default()
        };
        assert!(!costs.is_valid());
        assert!(TerrainCosts::UNIFORM.is_valid());
    }
}
