//! [`GridConfig`] — the record a [`NavGrid`](crate::NavGrid) is built from.

use crate::error::GridError;
use crate::geom::Vec3;
use crate::terrain::TerrainCosts;

/// Default ceiling on the number of cells a grid may hold.
pub const DEFAULT_MAX_CELLS: usize = 1 << 24;

/// Grid dimensions, placement and movement options.
///
/// Supplied by the host's configuration loader; every field has a usable
/// default so partial records deserialize.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GridConfig {
    /// Cells along x.
    pub width: usize,
    /// Cells along y (vertical).
    pub height: usize,
    /// Cells along z.
    pub depth: usize,
    /// Edge length of a cubic cell in world units.
    pub cell_size: f32,
    /// World position of the minimum corner of cell (0, 0, 0).
    pub origin: Vec3,
    pub allow_diagonal: bool,
    pub allow_vertical: bool,
    /// Grid-wide terrain multipliers, combined with each profile's own.
    pub terrain_costs: TerrainCosts,
    /// How far below a cell centre the ground probe looks.
    pub ground_probe_distance: f32,
    /// Inset applied to each cell box before overlap queries, so geometry
    /// that only touches a cell face does not block it.
    pub overlap_margin: f32,
    pub max_cells: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 4,
            depth: 32,
            cell_size: 1.0,
            origin: Vec3::ZERO,
            allow_diagonal: true,
            allow_vertical: true,
            terrain_costs: TerrainCosts::default(),
            ground_probe_distance: 0.75,
            overlap_margin: 0.05,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

impl GridConfig {
    /// A config with the given dimensions and defaults elsewhere.
    pub fn with_size(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
            ..Self::default()
        }
    }

    /// Total number of cells, saturating on overflow.
    pub fn cell_count(&self) -> usize {
        self.width
            .saturating_mul(self.height)
            .saturating_mul(self.depth)
    }

    /// Check the record for values a grid cannot be built from.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(GridError::InvalidDimensions {
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        let limit = self.max_cells.min(i32::MAX as usize);
        let cells = self.cell_count();
        if cells > limit
            || self.width > i32::MAX as usize
            || self.height > i32::MAX as usize
            || self.depth > i32::MAX as usize
        {
            return Err(GridError::TooLarge { cells, limit });
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(self.cell_size));
        }
        if !self.origin.is_finite() {
            return Err(GridError::InvalidOrigin);
        }
        if !self.terrain_costs.is_valid() {
            return Err(GridError::InvalidTerrainCosts);
        }
        Ok(())
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn partial_record_fills_defaults() {
        let cfg: GridConfig =
            serde_json::from_str(r#"{"width": 8, "height": 2, "depth": 6, "cell_size": 0.5}"#)
                .unwrap();
        assert_eq!(cfg.width, 8);
        assert_eq!(cfg.cell_size, 0.5);
        assert!(cfg.allow_diagonal);
        assert_eq!(cfg.terrain_costs, TerrainCosts::default());
    }

    #[test]
    fn config_round_trip() {
        let cfg = GridConfig {
            origin: Vec3::new(-4.0, 0.0, 2.0),
            allow_vertical: false,
            ..GridConfig::with_size(3, 3, 3)
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: GridConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
