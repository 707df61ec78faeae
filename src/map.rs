//! The decoded map description consumed at world-build time.

use crate::error::ConfigError;
use crate::signal::SignalPhase;
use crate::{Cell, Direction};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// The permitted directions of travel on a road cell.
pub type RoadDirections = SmallVec<[Direction; 2]>;

/// What a map cell contains before any vehicles are placed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Tile {
    #[default]
    Empty,
    Obstacle,
    Destination,
    /// A road along which vehicles may travel in any of the given directions.
    Road(RoadDirections),
    /// A traffic signal with its initial phase and its period in ticks.
    Signal { phase: SignalPhase, period: u32 },
}

impl Tile {
    /// A one-way road.
    pub fn road(dir: Direction) -> Self {
        Tile::Road(smallvec![dir])
    }

    /// A signal.
    pub fn signal(phase: SignalPhase, period: u32) -> Self {
        Tile::Signal { phase, period }
    }
}

/// A rectangular map of tiles, as produced by a map loader.
///
/// Tiles are stored row by row starting from `y = 0`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapLayout {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl MapLayout {
    /// Creates a map of the given size where every tile is [`Tile::Empty`].
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::Empty; width as usize * height as usize],
        }
    }

    /// Creates a map from a complete set of tiles, row by row from `y = 0`.
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Result<Self, ConfigError> {
        let expected = width as usize * height as usize;
        if tiles.len() != expected {
            return Err(ConfigError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// The width of the map in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height of the map in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the cell lies within the map.
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// Gets the tile at a cell. Cells outside the map are [`Tile::Empty`].
    pub fn get(&self, cell: Cell) -> &Tile {
        static EMPTY: Tile = Tile::Empty;
        if self.contains(cell) {
            &self.tiles[self.index_of(cell)]
        } else {
            &EMPTY
        }
    }

    /// Sets the tile at a cell.
    pub fn set(&mut self, cell: Cell, tile: Tile) -> Result<(), ConfigError> {
        if !self.contains(cell) {
            return Err(ConfigError::CellOutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            });
        }
        let idx = self.index_of(cell);
        self.tiles[idx] = tile;
        Ok(())
    }

    /// Iterates over every cell and its tile, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, &Tile)> + '_ {
        let width = self.width.max(1) as usize;
        self.tiles.iter().enumerate().map(move |(idx, tile)| {
            let cell = Cell::new((idx % width) as i32, (idx / width) as i32);
            (cell, tile)
        })
    }

    /// Checks the layout for configuration errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize;
        if self.tiles.len() != expected {
            return Err(ConfigError::TileCountMismatch {
                expected,
                actual: self.tiles.len(),
            });
        }
        for (cell, tile) in self.iter() {
            match tile {
                Tile::Road(dirs) if dirs.is_empty() => {
                    return Err(ConfigError::MissingRoadDirection { cell });
                }
                Tile::Signal { period: 0, .. } => {
                    return Err(ConfigError::ZeroSignalPeriod { cell });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn index_of(&self, cell: Cell) -> usize {
        cell.y as usize * self.width as usize + cell.x as usize
    }
}

/// Something that can supply a map layout when the world is (re)built.
///
/// This is the seam to the map loader, which owns the on-disk format and its legend.
pub trait MapSource {
    /// Produces a layout. `width` and `height` are the dimensions requested by
    /// the controller; sources with a fixed map may ignore them.
    fn layout(&self, width: u32, height: u32) -> Result<MapLayout, ConfigError>;
}

impl MapSource for MapLayout {
    fn layout(&self, width: u32, height: u32) -> Result<MapLayout, ConfigError> {
        if (width, height) != (self.width, self.height) {
            log::warn!(
                "requested a {}x{} map but the layout is {}x{}; using the layout",
                width,
                height,
                self.width,
                self.height
            );
        }
        Ok(self.clone())
    }
}

impl<F> MapSource for F
where
    F: Fn(u32, u32) -> Result<MapLayout, ConfigError>,
{
    fn layout(&self, width: u32, height: u32) -> Result<MapLayout, ConfigError> {
        self(width, height)
    }
}
