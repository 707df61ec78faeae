//! Error types.

use crate::Cell;
use thiserror::Error;

/// Problems with a map layout or simulation configuration.
/// These are fatal at world-build time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("the map must be at least one cell wide and high (got {width}x{height})")]
    EmptyGrid { width: u32, height: u32 },
    #[error("cell {cell} lies outside the {width}x{height} map")]
    CellOutOfBounds { cell: Cell, width: u32, height: u32 },
    #[error("expected {expected} tiles for the map, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("signal at {cell} has a period of zero")]
    ZeroSignalPeriod { cell: Cell },
    #[error("road at {cell} has no direction of travel")]
    MissingRoadDirection { cell: Cell },
    #[error("spawn phase {phase} must be less than the spawn interval {interval}")]
    InvalidSpawnPhase { phase: u64, interval: u64 },
}

/// Failures of route computation or route integrity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The search exhausted its frontier. Expected and recoverable.
    #[error("no path from {from} to {to}")]
    NoPathFound { from: Cell, to: Cell },
    /// Consecutive route cells are not joined by a legal move.
    #[error("route step from {from} to {to} is not a legal move")]
    InvalidStep { from: Cell, to: Cell },
}

/// Reasons an explicit vehicle placement was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("cell {0} is not a road")]
    NotRoad(Cell),
    #[error("cell {0} is not a destination")]
    NotDestination(Cell),
    #[error("cell {0} already holds a vehicle")]
    Occupied(Cell),
    #[error("the simulation already holds the maximum of {0} vehicles")]
    AtCapacity(usize),
}

/// Errors from the external control surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("the simulation has not been initialized")]
    NotInitialized,
    #[error(transparent)]
    Config(#[from] ConfigError),
}
