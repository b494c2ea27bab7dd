use tacnav_core::{TerrainCosts, TerrainMask};

use crate::stats::PathFailure;

/// Movement policy of one agent class.
///
/// Profiles are plain values: a search only reads them, so any number of
/// searches may share one.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MovementProfile {
    pub name: String,
    /// Largest surface height difference a single move may bridge.
    pub max_climb_height: f32,
    pub allow_diagonal: bool,
    pub allow_vertical: bool,
    /// Nodes whose terrain has a flag outside this mask are never entered.
    pub allowed_terrain: TerrainMask,
    /// Agent-specific multipliers, applied on top of the grid's.
    pub terrain_costs: TerrainCosts,
    /// Extra relative cost of exposed (outdoor) nodes.
    pub cover_weight: f32,
    /// Extra relative cost of hazardous nodes.
    pub hazard_weight: f32,
}

impl Default for MovementProfile {
    fn default() -> Self {
        Self::infantry()
    }
}

impl MovementProfile {
    /// Standard foot soldier.
    pub fn infantry() -> Self {
        Self {
            name: "infantry".into(),
            max_climb_height: 1.0,
            allow_diagonal: true,
            allow_vertical: true,
            allowed_terrain: TerrainMask::ALL,
            terrain_costs: TerrainCosts::default(),
            cover_weight: 0.25,
            hazard_weight: 1.0,
        }
    }

    /// Light and fast, shrugs off rough ground, less cautious.
    pub fn scout() -> Self {
        Self {
            name: "scout".into(),
            max_climb_height: 1.5,
            terrain_costs: TerrainCosts {
                rough: 1.2,
                climbable: 1.5,
                ..TerrainCosts::default()
            },
            cover_weight: 0.5,
            hazard_weight: 0.5,
            ..Self::infantry()
        }
    }

    /// Armoured unit: no ladders, no water, small steps only.
    pub fn heavy() -> Self {
        Self {
            name: "heavy".into(),
            max_climb_height: 0.5,
            allow_vertical: false,
            allowed_terrain: TerrainMask::ALL & !(TerrainMask::CLIMBABLE | TerrainMask::WATER),
            terrain_costs: TerrainCosts {
                rough: 2.0,
                ..TerrainCosts::default()
            },
            cover_weight: 0.1,
            hazard_weight: 2.0,
            ..Self::infantry()
        }
    }

    /// Specialist that treats ladders and walls as ordinary ground.
    pub fn climber() -> Self {
        Self {
            name: "climber".into(),
            max_climb_height: 2.5,
            terrain_costs: TerrainCosts {
                climbable: 1.0,
                ..TerrainCosts::default()
            },
            ..Self::infantry()
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "infantry" => Some(Self::infantry()),
            "scout" => Some(Self::scout()),
            "heavy" => Some(Self::heavy()),
            "climber" => Some(Self::climber()),
            _ => None,
        }
    }

    /// Check that every cost multiplier is finite and positive, the climb
    /// limit finite and non-negative, and both weights finite.
    pub fn validate(&self) -> Result<(), PathFailure> {
        let climb_ok = self.max_climb_height.is_finite() && self.max_climb_height >= 0.0;
        let weights_ok = self.cover_weight.is_finite() && self.hazard_weight.is_finite();
        if self.terrain_costs.is_valid() && climb_ok && weights_ok {
            Ok(())
        } else {
            Err(PathFailure::InvalidProfile)
        }
    }

    /// Whether nodes with `terrain` may be entered.
    #[inline]
    pub fn allows(&self, terrain: TerrainMask) -> bool {
        self.allowed_terrain.contains(terrain)
    }

    /// Preference factor for `terrain`: hazard and cover weights, never
    /// below 1.
    pub fn preference(&self, terrain: TerrainMask) -> f32 {
        let mut m = 1.0;
        if terrain.contains(TerrainMask::HAZARDOUS) {
            m *= 1.0 + self.hazard_weight.max(0.0);
        }
        if terrain.contains(TerrainMask::OUTDOOR) {
            m *= 1.0 + self.cover_weight.max(0.0);
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_by_name() {
        for name in ["infantry", "scout", "heavy", "climber"] {
            assert_eq!(MovementProfile::preset(name).unwrap().name, name);
        }
        assert!(MovementProfile::preset("tank").is_none());
    }

    #[test]
    fn heavy_rejects_ladders_and_water() {
        let p = MovementProfile::heavy();
        assert!(!p.allows(TerrainMask::CLIMBABLE));
        assert!(!p.allows(TerrainMask::WATER | TerrainMask::OUTDOOR));
        assert!(p.allows(TerrainMask::ROUGH | TerrainMask::OUTDOOR));
        assert!(!p.allow_vertical);
    }

    #[test]
    fn validate_checks_costs_and_limits() {
        for name in ["infantry", "scout", "heavy", "climber"] {
            assert_eq!(MovementProfile::preset(name).unwrap().validate(), Ok(()));
        }
        let negative = MovementProfile {
            terrain_costs: TerrainCosts {
                rough: -5.0,
                ..TerrainCosts::default()
            },
            ..MovementProfile::infantry()
        };
        assert_eq!(negative.validate(), Err(PathFailure::InvalidProfile));
        let zero = MovementProfile {
            terrain_costs: TerrainCosts {
                water: 0.0,
                ..TerrainCosts::default()
            },
            ..MovementProfile::infantry()
        };
        assert!(zero.validate().is_err());
        for climb in [-1.0, f32::NAN, f32::INFINITY] {
            let p = MovementProfile {
                max_climb_height: climb,
                ..MovementProfile::infantry()
            };
            assert!(p.validate().is_err(), "climb {climb}");
        }
        let p = MovementProfile {
            hazard_weight: f32::NAN,
            ..MovementProfile::infantry()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn preference_combines_weights() {
        let p = MovementProfile::infantry();
        assert_eq!(p.preference(TerrainMask::NORMAL), 1.0);
        assert_eq!(p.preference(TerrainMask::HAZARDOUS), 2.0);
        assert_eq!(
            p.preference(TerrainMask::HAZARDOUS | TerrainMask::OUTDOOR),
            2.5
        );
        let careless = MovementProfile {
            hazard_weight: -3.0,
            ..p
        };
        assert_eq!(careless.preference(TerrainMask::HAZARDOUS), 1.0);
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn profile_round_trip() {
        let p = MovementProfile::scout();
        let json = serde_json::to_string(&p).unwrap();
        let back: MovementProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn partial_profile_uses_infantry_defaults() {
        let p: MovementProfile =
            serde_json::from_str(r#"{"name": "sniper", "max_climb_height": 0.75}"#).unwrap();
        assert_eq!(p.name, "sniper");
        assert_eq!(p.max_climb_height, 0.75);
        assert!(p.allow_diagonal);
        assert_eq!(p.allowed_terrain, TerrainMask::ALL);
    }
}
