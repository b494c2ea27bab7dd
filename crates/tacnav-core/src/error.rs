//! Error types for grid construction.

/// Errors raised while building a [`NavGrid`](crate::NavGrid) from a
/// [`GridConfig`](crate::GridConfig).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    /// Every dimension must be at least one cell.
    #[error("invalid grid dimensions: {width}x{height}x{depth}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        depth: usize,
    },

    /// The cell size must be positive and finite.
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),

    /// The grid would hold more nodes than the configured ceiling.
    #[error("grid of {cells} cells exceeds the limit of {limit}")]
    TooLarge { cells: usize, limit: usize },

    /// A terrain cost multiplier is zero, negative or not finite.
    #[error("terrain cost multipliers must be positive and finite")]
    InvalidTerrainCosts,

    /// The origin has a non-finite component.
    #[error("grid origin must be finite")]
    InvalidOrigin,
}
