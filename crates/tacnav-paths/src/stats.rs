use std::fmt;
use std::time::Duration;

/// Why a search produced no path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathFailure {
    /// The start position is outside the grid.
    StartOutOfBounds,
    /// The goal position is outside the grid.
    GoalOutOfBounds,
    /// The start node is not walkable.
    StartBlocked,
    /// The goal node is not passable or its terrain is not allowed.
    GoalBlocked,
    /// The iteration cap was reached before the goal.
    IterationCap,
    /// The open set ran dry.
    NoPath,
    /// The movement profile has non-positive or non-finite costs or limits.
    InvalidProfile,
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StartOutOfBounds => "start out of bounds",
            Self::GoalOutOfBounds => "goal out of bounds",
            Self::StartBlocked => "start not walkable",
            Self::GoalBlocked => "goal not reachable by this profile",
            Self::IterationCap => "iteration cap reached",
            Self::NoPath => "no path",
            Self::InvalidProfile => "invalid movement profile",
        };
        f.write_str(s)
    }
}

/// Diagnostics of one search.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathStats {
    pub path_found: bool,
    /// Nodes moved to the closed set.
    pub nodes_explored: usize,
    /// Open-set pops.
    pub iterations: usize,
    /// Number of nodes on the returned path.
    pub path_length: usize,
    pub total_cost: f32,
    /// Open-set size when the search stopped.
    pub open_set_size: usize,
    /// Closed-set size when the search stopped.
    pub closed_set_size: usize,
    pub elapsed: Duration,
    pub failure: Option<PathFailure>,
}

impl PathStats {
    pub(crate) fn failed(failure: PathFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }
}

impl fmt::Display for PathStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure {
            None => write!(
                f,
                "path of {} nodes, cost {:.2}, {} explored in {:?}",
                self.path_length, self.total_cost, self.nodes_explored, self.elapsed
            ),
            Some(reason) => write!(
                f,
                "{} after {} iterations ({} explored, open {}, closed {}) in {:?}",
                reason,
                self.iterations,
                self.nodes_explored,
                self.open_set_size,
                self.closed_set_size,
                self.elapsed
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_stats_carry_reason() {
        let s = PathStats::failed(PathFailure::GoalBlocked);
        assert!(!s.path_found);
        assert_eq!(s.failure, Some(PathFailure::GoalBlocked));
        assert!(s.to_string().starts_with("goal not reachable"));
    }
}
