//! Grid coordinates and cardinal directions.

use cgmath::Point2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

/// A cell of the city grid.
///
/// This is the single coordinate type shared by the spatial index and the
/// routing graph. Coordinates are signed so that stepping off the edge of the
/// grid produces a cell that fails the bounds check rather than wrapping.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

/// One of the four directions of travel on the grid.
/// `Up` is towards increasing `y`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Cell {
    /// Creates a new cell.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell in the given direction.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The cell `n` steps away in the given direction.
    pub fn step_n(self, dir: Direction, n: i32) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + n * dx, self.y + n * dy)
    }

    /// The offset from this cell to `other`.
    pub fn delta_to(self, other: Cell) -> (i32, i32) {
        (other.x - self.x, other.y - self.y)
    }

    /// The four orthogonal neighbours, in [`Direction::ALL`] order.
    pub fn neighbours(self) -> impl Iterator<Item = (Direction, Cell)> {
        Direction::ALL.into_iter().map(move |dir| (dir, self.step(dir)))
    }

    /// The centre of the cell as a point in the plane.
    pub fn to_point(self) -> Point2<f64> {
        Point2::new(self.x as f64, self.y as f64)
    }
}

impl Direction {
    /// Every direction, in a fixed order used wherever iteration order matters.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The unit offset of one step in this direction.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// The direction of a unit cardinal step, if `delta` is one.
    pub fn from_delta(delta: (i32, i32)) -> Option<Self> {
        match delta {
            (0, 1) => Some(Direction::Up),
            (0, -1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }

    /// The opposite direction.
    pub const fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// The direction rotated 90 degrees clockwise.
    pub const fn clockwise(self) -> Self {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// The two directions perpendicular to this one.
    pub const fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        }
    }
}

impl Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}
