use crate::map::{MapLayout, RoadDirections, Tile};
use crate::signal::SignalPhase;
use crate::{Cell, SignalId, SignalSet, VehicleId};
use smallvec::SmallVec;

/// Something that sits on a cell of the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Occupant {
    Road(RoadDirections),
    Signal(SignalId),
    Destination,
    Obstacle,
    Vehicle(VehicleId),
}

/// The authoritative record of what occupies each cell.
///
/// Queries about cells outside the grid never fail; such cells are simply
/// empty and not routable.
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    width: u32,
    height: u32,
    cells: Vec<SmallVec<[Occupant; 2]>>,
}

impl SpatialIndex {
    /// Creates an empty index.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![SmallVec::new(); width as usize * height as usize],
        }
    }

    /// Creates an index holding the stationary features of a layout.
    /// Signal cells are registered with the ID produced by `add_signal`.
    pub(crate) fn from_layout(
        layout: &MapLayout,
        mut add_signal: impl FnMut(Cell, SignalPhase, u32) -> SignalId,
    ) -> Self {
        let mut index = Self::new(layout.width(), layout.height());
        for (cell, tile) in layout.iter() {
            let occupant = match tile {
                Tile::Empty => continue,
                Tile::Obstacle => Occupant::Obstacle,
                Tile::Destination => Occupant::Destination,
                Tile::Road(dirs) => Occupant::Road(dirs.clone()),
                Tile::Signal { phase, period } => {
                    Occupant::Signal(add_signal(cell, *phase, *period))
                }
            };
            index.place(cell, occupant);
        }
        index
    }

    /// The width of the grid.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height of the grid.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the cell lies within the grid.
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// The occupants of a cell. Empty for out-of-bounds cells.
    pub fn contents(&self, cell: Cell) -> &[Occupant] {
        match self.slot(cell) {
            Some(idx) => self.cells[idx].as_slice(),
            None => &[],
        }
    }

    /// The travel directions of the road on a cell, if there is one.
    pub fn road_directions(&self, cell: Cell) -> Option<&RoadDirections> {
        self.contents(cell).iter().find_map(|o| match o {
            Occupant::Road(dirs) => Some(dirs),
            _ => None,
        })
    }

    /// The signal on a cell, if there is one.
    pub fn signal_at(&self, cell: Cell) -> Option<SignalId> {
        self.contents(cell).iter().find_map(|o| match o {
            Occupant::Signal(id) => Some(*id),
            _ => None,
        })
    }

    /// The vehicle on a cell, if there is one.
    pub fn vehicle_at(&self, cell: Cell) -> Option<VehicleId> {
        self.contents(cell).iter().find_map(|o| match o {
            Occupant::Vehicle(id) => Some(*id),
            _ => None,
        })
    }

    pub fn is_road(&self, cell: Cell) -> bool {
        self.road_directions(cell).is_some()
    }

    pub fn is_signal(&self, cell: Cell) -> bool {
        self.signal_at(cell).is_some()
    }

    pub fn is_destination(&self, cell: Cell) -> bool {
        self.contents(cell).contains(&Occupant::Destination)
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.contents(cell).contains(&Occupant::Obstacle)
    }

    pub fn has_vehicle(&self, cell: Cell) -> bool {
        self.vehicle_at(cell).is_some()
    }

    /// Whether a vehicle may be routed onto the cell: an in-bounds road,
    /// signal, or destination.
    pub fn is_routable(&self, cell: Cell) -> bool {
        self.contents(cell).iter().any(|o| {
            matches!(
                o,
                Occupant::Road(_) | Occupant::Signal(_) | Occupant::Destination
            )
        })
    }

    /// Whether the cell holds a signal in its restrictive phase.
    pub fn has_restrictive_signal(&self, cell: Cell, signals: &SignalSet) -> bool {
        self.signal_at(cell)
            .and_then(|id| signals.get(id))
            .map_or(false, |signal| signal.phase().is_restrictive())
    }

    /// Whether a new vehicle may start on the cell: a road with no other
    /// feature and no vehicle.
    pub fn is_free_road(&self, cell: Cell) -> bool {
        self.is_road(cell)
            && !self.is_obstacle(cell)
            && !self.is_signal(cell)
            && !self.is_destination(cell)
            && !self.has_vehicle(cell)
    }

    /// Adds an occupant to a cell. Out-of-bounds placements are ignored.
    pub(crate) fn place(&mut self, cell: Cell, occupant: Occupant) {
        if let Some(idx) = self.slot(cell) {
            self.cells[idx].push(occupant);
        }
    }

    /// Removes a vehicle from a cell.
    pub(crate) fn remove_vehicle(&mut self, cell: Cell, id: VehicleId) {
        if let Some(idx) = self.slot(cell) {
            let occupants = &mut self.cells[idx];
            if let Some(pos) = occupants
                .iter()
                .rposition(|o| *o == Occupant::Vehicle(id))
            {
                occupants.remove(pos);
            }
        }
    }

    /// Moves a vehicle between cells.
    pub(crate) fn move_vehicle(&mut self, id: VehicleId, from: Cell, to: Cell) {
        self.remove_vehicle(from, id);
        self.place(to, Occupant::Vehicle(id));
    }

    /// Iterates over every cell holding a vehicle.
    pub fn vehicle_cells(&self) -> impl Iterator<Item = (Cell, VehicleId)> + '_ {
        self.cells.iter().enumerate().flat_map(move |(idx, occupants)| {
            let cell = self.cell_of(idx);
            occupants.iter().filter_map(move |o| match o {
                Occupant::Vehicle(id) => Some((cell, *id)),
                _ => None,
            })
        })
    }

    fn slot(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| cell.y as usize * self.width as usize + cell.x as usize)
    }

    fn cell_of(&self, idx: usize) -> Cell {
        let width = self.width as usize;
        Cell::new((idx % width) as i32, (idx / width) as i32)
    }
}
