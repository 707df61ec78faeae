pub use self::pathfinding::find_path;
use crate::error::RouteError;
use crate::graph::{CityGraph, EdgeKind};
use crate::index::SpatialIndex;
use crate::{Cell, Direction, SignalSet, VehicleId};
use arrayvec::ArrayVec;
use std::collections::VecDeque;
use std::rc::Rc;

mod pathfinding;

/// How many cells ahead a vehicle looks when judging congestion.
const CONGESTION_LOOKAHEAD: usize = 3;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// The order in which the vehicle entered the simulation.
    /// Lower serials take priority when two vehicles claim the same cell.
    serial: u64,
    /// The cell the vehicle is on.
    cell: Cell,
    /// The cell the vehicle is heading for.
    destination: Cell,
    /// The remaining cells to travel through, ending with the destination.
    route: VecDeque<Cell>,
    /// The vehicle's own snapshot of the routing graph.
    graph: Rc<CityGraph>,
    /// The direction of the most recent move.
    heading: Option<Direction>,
    /// The number of consecutive activations without moving.
    stop_cnt: usize,
    /// The number of lane changes the vehicle has decided on.
    lane_changes: usize,
}

/// What a vehicle did when activated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// There is currently no route to the destination.
    Parked,
    /// The vehicle has a route but could not move this tick.
    Halted(HaltReason),
    /// The vehicle moved one cell.
    Moved,
    /// The vehicle moved onto its destination and has left the simulation.
    Arrived,
}

/// Why a vehicle with a route did not move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaltReason {
    /// The next cell holds a restrictive signal.
    Signal,
    /// The next cell holds another vehicle.
    Vehicle,
    /// Another vehicle with priority claimed the same cell this tick.
    Conflict,
    /// The route was corrupt and has been discarded.
    InvalidRoute,
}

/// The move a vehicle intends to make this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Plan {
    Parked,
    Halt(HaltReason, Option<Direction>),
    Advance { to: Cell, dir: Direction },
}

impl Vehicle {
    /// Creates a new vehicle.
    pub(crate) fn new(
        id: VehicleId,
        serial: u64,
        cell: Cell,
        destination: Cell,
        graph: Rc<CityGraph>,
    ) -> Self {
        Self {
            id,
            serial,
            cell,
            destination,
            route: VecDeque::new(),
            graph,
            heading: None,
            stop_cnt: 0,
            lane_changes: 0,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The order in which the vehicle entered the simulation.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// A display name for the vehicle, e.g. `car_3`.
    pub fn label(&self) -> String {
        format!("car_{}", self.serial)
    }

    /// The cell the vehicle is on.
    pub fn cell(&self) -> Cell {
        self.cell
    }

    /// The cell the vehicle is heading for.
    pub fn destination(&self) -> Cell {
        self.destination
    }

    /// The remaining cells on the vehicle's route.
    pub fn route(&self) -> impl ExactSizeIterator<Item = Cell> + '_ {
        self.route.iter().copied()
    }

    /// The direction of the vehicle's most recent move.
    pub fn heading(&self) -> Option<Direction> {
        self.heading
    }

    /// Whether the vehicle failed to move on its latest activation.
    pub fn has_stopped(&self) -> bool {
        self.stop_cnt > 0
    }

    /// The number of consecutive activations on which the vehicle did not move.
    pub fn stop_count(&self) -> usize {
        self.stop_cnt
    }

    /// The number of lane changes the vehicle has decided on.
    pub fn lane_changes(&self) -> usize {
        self.lane_changes
    }

    /// The snapshot of the routing graph the vehicle plans against.
    pub fn graph(&self) -> &CityGraph {
        &self.graph
    }

    /// Replaces the vehicle's graph snapshot and discards its route,
    /// so that it reroutes on its next activation.
    pub(crate) fn refresh(&mut self, graph: Rc<CityGraph>) {
        self.graph = graph;
        self.route.clear();
    }

    /// Performs one activation: plan, move if the way is clear, then consider
    /// changing lanes. Arrived vehicles are left on their destination in the
    /// index; the caller deregisters them.
    pub(crate) fn step(&mut self, index: &mut SpatialIndex, signals: &SignalSet) -> StepOutcome {
        let (outcome, dir) = match self.plan(index, signals) {
            Plan::Parked => (StepOutcome::Parked, None),
            Plan::Halt(reason, dir) => (self.halt(reason), dir),
            Plan::Advance { to, dir } => {
                if self.advance(to, dir, index) {
                    return StepOutcome::Arrived;
                }
                (StepOutcome::Moved, Some(dir))
            }
        };
        if let Some(dir) = dir {
            self.relieve_congestion(dir, index, signals);
        }
        outcome
    }

    /// Works out the vehicle's next move against the current occupancy,
    /// computing a route first if the vehicle has none.
    pub(crate) fn plan(&mut self, index: &SpatialIndex, signals: &SignalSet) -> Plan {
        if self.route.is_empty() {
            match find_path(&self.graph, self.cell, self.destination) {
                Ok(route) => {
                    log::debug!(
                        "{} routed from {} to {} in {} steps",
                        self.label(),
                        self.cell,
                        self.destination,
                        route.len()
                    );
                    self.route = route.into();
                }
                Err(err) => {
                    log::debug!("{} is parked: {}", self.label(), err);
                    self.stop_cnt += 1;
                    return Plan::Parked;
                }
            }
        }

        let Some(&next) = self.route.front() else {
            self.stop_cnt += 1;
            return Plan::Parked;
        };
        let dir = match self.step_direction(next) {
            Ok(dir) => dir,
            Err(err) => {
                log::error!("{} discarded its route: {}", self.label(), err);
                self.route.clear();
                return Plan::Halt(HaltReason::InvalidRoute, None);
            }
        };

        if index.has_restrictive_signal(next, signals) {
            Plan::Halt(HaltReason::Signal, Some(dir))
        } else if index.has_vehicle(next) {
            Plan::Halt(HaltReason::Vehicle, Some(dir))
        } else {
            Plan::Advance { to: next, dir }
        }
    }

    /// Records that the vehicle did not move.
    pub(crate) fn halt(&mut self, reason: HaltReason) -> StepOutcome {
        self.stop_cnt += 1;
        log::trace!("{} halted at {}: {:?}", self.label(), self.cell, reason);
        StepOutcome::Halted(reason)
    }

    /// Moves the vehicle onto the next cell of its route.
    /// Returns `true` iff the vehicle reached its destination.
    pub(crate) fn advance(&mut self, to: Cell, dir: Direction, index: &mut SpatialIndex) -> bool {
        self.route.pop_front();
        index.move_vehicle(self.id, self.cell, to);
        log::trace!("{} moved from {} to {}", self.label(), self.cell, to);
        self.cell = to;
        self.heading = Some(dir);
        self.stop_cnt = 0;
        self.cell == self.destination
    }

    /// If every routable cell within a few steps ahead holds a vehicle, tries to
    /// reroute via the cell to the right of the direction of travel. The lane
    /// change only alters the route; the move itself happens on a later
    /// activation, subject to the usual checks.
    ///
    /// Returns `true` iff the route was changed.
    pub(crate) fn relieve_congestion(
        &mut self,
        dir: Direction,
        index: &SpatialIndex,
        signals: &SignalSet,
    ) -> bool {
        let ahead = (1..=CONGESTION_LOOKAHEAD as i32)
            .map(|n| self.cell.step_n(dir, n))
            .take_while(|cell| index.is_routable(*cell))
            .collect::<ArrayVec<Cell, CONGESTION_LOOKAHEAD>>();
        if ahead.is_empty() || !ahead.iter().all(|cell| index.has_vehicle(*cell)) {
            return false;
        }

        let lateral = self.cell.step(dir.clockwise());
        if !index.is_routable(lateral)
            || index.has_vehicle(lateral)
            || index.has_restrictive_signal(lateral, signals)
        {
            return false;
        }

        match find_path(&self.graph, lateral, self.destination) {
            Ok(route) => {
                log::debug!(
                    "{} is boxed in at {}; changing lanes via {}",
                    self.label(),
                    self.cell,
                    lateral
                );
                self.route = std::iter::once(lateral).chain(route).collect();
                self.lane_changes += 1;
                true
            }
            Err(_) => false,
        }
    }

    /// The direction of travel for a step to `next`.
    fn step_direction(&self, next: Cell) -> Result<Direction, RouteError> {
        if let Some(dir) = Direction::from_delta(self.cell.delta_to(next)) {
            return Ok(dir);
        }
        match self.graph.edge(self.cell, next).map(|edge| edge.kind()) {
            Some(EdgeKind::Connector { forward }) => Ok(forward),
            _ => Err(RouteError::InvalidStep {
                from: self.cell,
                to: next,
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_route(&mut self, route: &[Cell]) {
        self.route = route.iter().copied().collect();
    }
}

#[cfg(test)]
mod test {
    use super::{HaltReason, StepOutcome, Vehicle};
    use crate::graph::{CityGraph, GraphOptions};
    use crate::index::{Occupant, SpatialIndex};
    use crate::map::{MapLayout, Tile};
    use crate::signal::{SignalPhase, TrafficSignal};
    use crate::{Cell, Direction, SignalSet, VehicleId};
    use slotmap::SlotMap;
    use smallvec::smallvec;
    use std::rc::Rc;

    struct World {
        index: SpatialIndex,
        signals: SignalSet,
        graph: Rc<CityGraph>,
        ids: SlotMap<VehicleId, ()>,
    }

    impl World {
        fn new(layout: &MapLayout, options: GraphOptions) -> Self {
            let mut signals = SignalSet::with_key();
            let index = SpatialIndex::from_layout(layout, |cell, phase, period| {
                signals.insert_with_key(|id| TrafficSignal::new(id, cell, phase, period))
            });
            let graph = Rc::new(CityGraph::build(&index, &signals, &options));
            Self {
                index,
                signals,
                graph,
                ids: SlotMap::with_key(),
            }
        }

        fn vehicle(&mut self, cell: Cell, destination: Cell) -> Vehicle {
            let id = self.ids.insert(());
            self.index.place(cell, Occupant::Vehicle(id));
            Vehicle::new(id, self.ids.len() as u64, cell, destination, self.graph.clone())
        }

        fn step(&mut self, vehicle: &mut Vehicle) -> StepOutcome {
            vehicle.step(&mut self.index, &self.signals)
        }
    }

    /// Eastbound lanes on rows 0 and 1 of a `width`x2 map.
    fn two_lanes(width: i32) -> MapLayout {
        let mut map = MapLayout::new(width as u32, 2);
        for x in 0..width {
            map.set(Cell::new(x, 0), Tile::road(Direction::Right)).unwrap();
            map.set(Cell::new(x, 1), Tile::road(Direction::Right)).unwrap();
        }
        map
    }

    #[test]
    fn drives_to_destination() {
        let mut map = two_lanes(4);
        map.set(Cell::new(3, 0), Tile::Destination).unwrap();
        let mut world = World::new(&map, Default::default());
        let mut car = world.vehicle(Cell::new(0, 0), Cell::new(3, 0));

        assert_eq!(world.step(&mut car), StepOutcome::Moved);
        assert_eq!(car.cell(), Cell::new(1, 0));
        assert_eq!(car.heading(), Some(Direction::Right));
        assert_eq!(car.route().collect::<Vec<_>>(), vec![Cell::new(2, 0), Cell::new(3, 0)]);
        assert_eq!(world.step(&mut car), StepOutcome::Moved);
        assert_eq!(world.step(&mut car), StepOutcome::Arrived);
        assert_eq!(car.cell(), Cell::new(3, 0));
        assert_eq!(world.index.vehicle_at(Cell::new(3, 0)), Some(car.id()));
    }

    #[test]
    fn parks_without_a_route_and_stays_scheduled() {
        let map = two_lanes(3);
        let mut world = World::new(&map, Default::default());
        let mut car = world.vehicle(Cell::new(2, 0), Cell::new(0, 0));
        for _ in 0..3 {
            assert_eq!(world.step(&mut car), StepOutcome::Parked);
        }
        assert_eq!(car.cell(), Cell::new(2, 0));
        assert_eq!(car.stop_count(), 3);
        assert_eq!(car.route().len(), 0);
    }

    #[test]
    fn waits_at_restrictive_signal() {
        let mut map = two_lanes(4);
        map.set(Cell::new(1, 0), Tile::signal(SignalPhase::Restrictive, 10)).unwrap();
        map.set(Cell::new(3, 0), Tile::Destination).unwrap();
        // Close the other lane so the only route runs through the signal.
        for x in 0..4 {
            map.set(Cell::new(x, 1), Tile::Obstacle).unwrap();
        }
        let mut world = World::new(&map, Default::default());
        let mut car = world.vehicle(Cell::new(0, 0), Cell::new(3, 0));

        assert_eq!(world.step(&mut car), StepOutcome::Halted(HaltReason::Signal));
        assert_eq!(car.route().len(), 3);
        assert!(car.has_stopped());

        let signal = world.index.signal_at(Cell::new(1, 0)).unwrap();
        world.signals[signal].step(10);
        assert_eq!(world.step(&mut car), StepOutcome::Moved);
        assert_eq!(car.cell(), Cell::new(1, 0));
        assert!(!car.has_stopped());
    }

    #[test]
    fn waits_behind_another_vehicle() {
        let mut map = two_lanes(4);
        map.set(Cell::new(3, 0), Tile::Destination).unwrap();
        let mut world = World::new(&map, Default::default());
        let _lead = world.vehicle(Cell::new(1, 0), Cell::new(3, 0));
        let mut car = world.vehicle(Cell::new(0, 0), Cell::new(3, 0));
        assert_eq!(world.step(&mut car), StepOutcome::Halted(HaltReason::Vehicle));
        assert_eq!(car.cell(), Cell::new(0, 0));
    }

    #[test]
    fn discards_corrupt_route() {
        let mut map = two_lanes(4);
        map.set(Cell::new(3, 0), Tile::Destination).unwrap();
        let mut world = World::new(&map, Default::default());
        let mut car = world.vehicle(Cell::new(0, 0), Cell::new(3, 0));
        car.set_route(&[Cell::new(2, 0), Cell::new(3, 0)]);

        assert_eq!(world.step(&mut car), StepOutcome::Halted(HaltReason::InvalidRoute));
        assert_eq!(car.route().len(), 0);
        assert_eq!(world.step(&mut car), StepOutcome::Moved);
    }

    #[test]
    fn changes_lanes_when_boxed_in() {
        // Lane 1 is jammed ahead of the car; lane 0 (to the right) is clear.
        let mut map = two_lanes(6);
        map.set(Cell::new(5, 0), Tile::Destination).unwrap();
        let right_or_down = Tile::Road(smallvec![Direction::Right, Direction::Down]);
        map.set(Cell::new(0, 1), right_or_down.clone()).unwrap();
        map.set(Cell::new(4, 1), right_or_down).unwrap();
        let mut world = World::new(&map, Default::default());
        for x in 1..4 {
            world.vehicle(Cell::new(x, 1), Cell::new(5, 0));
        }
        let mut car = world.vehicle(Cell::new(0, 1), Cell::new(5, 0));
        let jammed = [(1, 1), (2, 1), (3, 1), (4, 1), (4, 0), (5, 0)].map(Cell::from);
        car.set_route(&jammed);

        assert_eq!(world.step(&mut car), StepOutcome::Halted(HaltReason::Vehicle));
        assert_eq!(car.lane_changes(), 1);
        assert_eq!(car.route().next(), Some(Cell::new(0, 0)));
        assert_eq!(car.route().last(), Some(Cell::new(5, 0)));

        assert_eq!(world.step(&mut car), StepOutcome::Moved);
        assert_eq!(car.cell(), Cell::new(0, 0));
        assert_eq!(car.heading(), Some(Direction::Down));
    }

    #[test]
    fn stays_put_when_no_lane_to_change_into() {
        let mut map = MapLayout::new(5, 1);
        for x in 0..4 {
            map.set(Cell::new(x, 0), Tile::road(Direction::Right)).unwrap();
        }
        map.set(Cell::new(4, 0), Tile::Destination).unwrap();
        let mut world = World::new(&map, Default::default());
        for x in 1..4 {
            world.vehicle(Cell::new(x, 0), Cell::new(4, 0));
        }
        let mut car = world.vehicle(Cell::new(0, 0), Cell::new(4, 0));
        assert_eq!(world.step(&mut car), StepOutcome::Halted(HaltReason::Vehicle));
        assert_eq!(car.lane_changes(), 0);
        assert_eq!(car.cell(), Cell::new(0, 0));
    }

    #[test]
    fn follows_diagonal_connectors() {
        // A red signal makes the diagonal detour through the other lane cheaper.
        let mut map = two_lanes(3);
        map.set(Cell::new(2, 0), Tile::Destination).unwrap();
        map.set(Cell::new(1, 0), Tile::signal(SignalPhase::Restrictive, 10)).unwrap();
        let options = GraphOptions {
            lane_change_connectors: true,
        };
        let mut world = World::new(&map, options);
        let mut car = world.vehicle(Cell::new(0, 0), Cell::new(2, 0));

        assert_eq!(world.step(&mut car), StepOutcome::Moved);
        assert_eq!(car.cell(), Cell::new(1, 1));
        assert_eq!(car.heading(), Some(Direction::Right));
        assert_eq!(world.step(&mut car), StepOutcome::Moved);
        assert_eq!(world.step(&mut car), StepOutcome::Arrived);
    }
}
