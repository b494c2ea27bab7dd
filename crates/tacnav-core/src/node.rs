//! [`Node`] — one cell of the navigation grid.

use std::hash::{Hash, Hasher};

use crate::geom::{Coord, Vec3};
use crate::terrain::TerrainMask;

/// Per-search scratch fields.
///
/// The fields are only meaningful while `generation` matches the owning
/// grid's current search generation; see [`Node::search`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchState {
    /// Cost from the start.
    pub g: f32,
    /// Heuristic estimate to the goal.
    pub h: f32,
    /// `g + h`.
    pub f: f32,
    /// Grid index of the predecessor on the best known path.
    pub parent: Option<usize>,
    /// Position inside the open-set heap, if queued.
    pub heap_index: Option<usize>,
    pub generation: u32,
}

impl SearchState {
    const fn cleared(generation: u32) -> Self {
        Self {
            g: f32::INFINITY,
            h: 0.0,
            f: f32::INFINITY,
            parent: None,
            heap_index: None,
            generation,
        }
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::cleared(0)
    }
}

/// One grid cell.
///
/// Identity is the coordinate: equality and hashing ignore every other field.
#[derive(Clone, Debug)]
pub struct Node {
    pub coord: Coord,
    /// World-space centre of the cell.
    pub world_pos: Vec3,
    /// Result of the obstacle scan: free of geometry and supported.
    pub walkable: bool,
    /// Claimed by at least one tracked obstacle.
    pub occupied: bool,
    pub terrain: TerrainMask,
    /// Vertical offset of the standing surface above the cell floor.
    pub climb_height: f32,
    search: SearchState,
}

impl Node {
    /// A walkable, unoccupied node with normal terrain.
    pub fn new(coord: Coord, world_pos: Vec3) -> Self {
        Self {
            coord,
            world_pos,
            walkable: true,
            occupied: false,
            terrain: TerrainMask::NORMAL,
            climb_height: 0.0,
            search: SearchState::default(),
        }
    }

    /// Walkable and not occupied.
    #[inline]
    pub fn is_passable(&self) -> bool {
        self.walkable && !self.occupied
    }

    #[inline]
    pub fn is_climbable(&self) -> bool {
        self.terrain.contains(TerrainMask::CLIMBABLE)
    }

    /// Height an agent standing on this node is at.
    #[inline]
    pub fn surface_height(&self) -> f32 {
        self.world_pos.y + self.climb_height
    }

    /// Scratch state for search `generation`, or `None` if the node has not
    /// been touched by that search.
    #[inline]
    pub fn search(&self, generation: u32) -> Option<&SearchState> {
        (self.search.generation == generation).then_some(&self.search)
    }

    /// Scratch state for search `generation`, lazily cleared the first time
    /// the node is touched by that search.
    #[inline]
    pub fn search_mut(&mut self, generation: u32) -> &mut SearchState {
        if self.search.generation != generation {
            self.search = SearchState::cleared(generation);
        }
        &mut self.search
    }

    /// Raw scratch state regardless of generation.
    #[inline]
    pub fn raw_search(&self) -> &SearchState {
        &self.search
    }

    #[inline]
    pub fn raw_search_mut(&mut self) -> &mut SearchState {
        &mut self.search
    }

    /// Reset scratch state eagerly.
    pub fn clear_search(&mut self, generation: u32) {
        self.search = SearchState::cleared(generation);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coord.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identity_is_coordinate_based() {
        let mut a = Node::new(Coord::new(1, 2, 3), Vec3::ZERO);
        let b = Node::new(Coord::new(1, 2, 3), Vec3::ONE);
        a.walkable = false;
        a.terrain = TerrainMask::WATER;
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn search_state_is_generation_stamped() {
        let mut n = Node::new(Coord::ZERO, Vec3::ZERO);
        {
            let s = n.search_mut(1);
            s.g = 4.0;
            s.parent = Some(7);
            s.heap_index = Some(0);
        }
        assert_eq!(n.search(1).map(|s| s.g), Some(4.0));
        assert!(n.search(2).is_none());

        let s = n.search_mut(2);
        assert_eq!(s.g, f32::INFINITY);
        assert_eq!(s.parent, None);
        assert_eq!(s.heap_index, None);
    }

    #[test]
    fn passable_requires_walkable_and_unoccupied() {
        let mut n = Node::new(Coord::ZERO, Vec3::ZERO);
        assert!(n.is_passable());
        n.occupied = true;
        assert!(!n.is_passable());
        n.occupied = false;
        n.walkable = false;
        assert!(!n.is_passable());
    }

    #[test]
    fn surface_height_includes_climb_offset() {
        let mut n = Node::new(Coord::ZERO, Vec3::new(0.0, 2.5, 0.0));
        n.climb_height = 0.75;
        assert!((n.surface_height() - 3.25).abs() < 1e-6);
    }
}
