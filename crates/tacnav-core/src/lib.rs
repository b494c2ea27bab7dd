//! **tacnav-core** — 3D navigation grid for tactical games (core types).
//!
//! This crate provides the foundational types used across the *tacnav*
//! workspace: geometry primitives, terrain classification, the dense node
//! grid with its obstacle scan, collaborator probe traits, voxel line of
//! sight, a spatial hash and the static/dynamic occupancy tracker.

pub mod config;
pub mod error;
pub mod geom;
pub mod grid;
pub mod node;
pub mod occupancy;
pub mod probe;
pub mod raycast;
pub mod spatial;
pub mod terrain;

pub use config::GridConfig;
pub use error::GridError;
pub use geom::{Aabb, Coord, CoordBox, Vec3};
pub use grid::{NavGrid, ScanReport};
pub use node::{Node, SearchState};
pub use occupancy::{ObstacleKind, OccupationTracker, TrackerConfig, TrackerUpdate};
pub use probe::{LineOfSight, ObstacleKey, ObstacleSource, StaticScene, TerrainVolume, WorldProbe};
pub use spatial::{SpatialHash, spatial_key};
pub use terrain::{TerrainCosts, TerrainMask};
