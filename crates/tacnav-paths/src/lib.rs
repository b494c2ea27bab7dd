//! Pathfinding over 3D tactical grids.
//!
//! This crate provides the search side of *tacnav*:
//!
//! - **A\*** with diagonal and vertical moves, terrain costs and
//!   corner-cutting rules ([`Pathfinder::find_path`])
//! - an **indexed binary heap** with O(1) membership and decrease-key
//!   ([`IndexedHeap`])
//! - per-agent **movement profiles** ([`MovementProfile`])
//! - line-of-sight **path smoothing** ([`smooth_path`])
//!
//! A [`Pathfinder`] owns and reuses its open heap, closed set and neighbour
//! buffer so repeated queries incur no allocations after warm-up. Per-node
//! scratch state lives on the grid and is invalidated by bumping its search
//! generation.

mod astar;
mod heap;
mod profile;
mod smooth;
mod stats;

pub use astar::{Path, Pathfinder, PathfinderConfig};
pub use heap::{HeapItem, IndexedHeap};
pub use profile::MovementProfile;
pub use smooth::{smooth_path, smooth_waypoints};
pub use stats::{PathFailure, PathStats};
