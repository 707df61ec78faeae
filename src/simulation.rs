use crate::config::{ActivationMode, SimulationConfig};
use crate::error::{ConfigError, PlacementError};
use crate::graph::CityGraph;
use crate::index::{Occupant, SpatialIndex};
use crate::map::{MapLayout, Tile};
use crate::signal::TrafficSignal;
use crate::vehicle::{HaltReason, Plan, StepOutcome, Vehicle};
use crate::{Cell, Direction, SignalId, SignalSet, VehicleId, VehicleSet};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;
use std::rc::Rc;

/// A traffic simulation on a grid city.
pub struct Simulation {
    /// What occupies each cell.
    index: SpatialIndex,
    /// The authoritative routing graph. Vehicles hold snapshots of it, so it
    /// is copied on write while any snapshot of the current version is alive.
    graph: Rc<CityGraph>,
    /// The traffic signals.
    signals: SignalSet,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The destination cells, in map order.
    destinations: Vec<Cell>,
    /// The simulation parameters.
    config: SimulationConfig,
    /// Drives activation order and spawning.
    rng: ChaCha8Rng,
    /// The number of ticks simulated.
    tick: u64,
    /// The serial number for the next vehicle.
    next_serial: u64,
    /// The number of vehicles that have reached their destination.
    arrived: u64,
    /// The order in which vehicles were activated on the latest tick.
    activation_order: Vec<VehicleId>,
}

/// A summary of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick that was simulated.
    pub tick: u64,
    /// The number of signals that changed phase.
    pub signals_flipped: usize,
    /// The number of vehicles that moved without arriving.
    pub moved: usize,
    /// The number of vehicles that had a route but did not move.
    pub halted: usize,
    /// The number of vehicles without a route.
    pub parked: usize,
    /// The number of vehicles that reached their destination and were removed.
    pub arrived: usize,
    /// The vehicle spawned at the end of the tick, if any.
    pub spawned: Option<VehicleId>,
}

impl Simulation {
    /// Builds a simulation from a map layout.
    pub fn new(layout: &MapLayout, config: SimulationConfig) -> Result<Self, ConfigError> {
        layout.validate()?;
        config.validate()?;

        let mut signals = SignalSet::with_key();
        let index = SpatialIndex::from_layout(layout, |cell, phase, period| {
            signals.insert_with_key(|id| TrafficSignal::new(id, cell, phase, period))
        });
        let graph = Rc::new(CityGraph::build(&index, &signals, &config.graph));
        let destinations = layout
            .iter()
            .filter(|(_, tile)| **tile == Tile::Destination)
            .map(|(cell, _)| cell)
            .collect::<Vec<_>>();

        log::info!(
            "built a {}x{} city with {} signals and {} destinations",
            layout.width(),
            layout.height(),
            signals.len(),
            destinations.len()
        );

        Ok(Self {
            index,
            graph,
            signals,
            vehicles: VehicleSet::with_key(),
            destinations,
            config,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tick: 0,
            next_serial: 0,
            arrived: 0,
            activation_order: vec![],
        })
    }

    /// Advances the simulation by one tick.
    ///
    /// Signals are updated first, then every vehicle is activated once in a
    /// random order, then a vehicle may be spawned.
    pub fn step(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        report.signals_flipped = self.update_signals();

        let mut order = std::mem::take(&mut self.activation_order);
        order.clear();
        order.extend(self.vehicles.keys());
        order.shuffle(&mut self.rng);
        match self.config.activation {
            ActivationMode::Sequential => self.move_sequential(&order, &mut report),
            ActivationMode::ProposeCommit => self.move_propose_commit(&order, &mut report),
        }
        self.activation_order = order;

        if self.config.is_spawn_tick(self.tick) {
            report.spawned = self.spawn_vehicle();
        }

        log::trace!("{:?}", report);
        report
    }

    /// The number of ticks simulated so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The simulation parameters.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The width of the map in cells.
    pub fn width(&self) -> u32 {
        self.index.width()
    }

    /// The height of the map in cells.
    pub fn height(&self) -> u32 {
        self.index.height()
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Returns an iterator over all the traffic signals in the simulation.
    pub fn iter_signals(&self) -> impl Iterator<Item = (SignalId, &TrafficSignal)> {
        self.signals.iter()
    }

    /// Gets a reference to the vehicle with the given ID,
    /// if it is still in the simulation.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Gets a reference to the signal with the given ID.
    pub fn get_signal(&self, signal_id: SignalId) -> Option<&TrafficSignal> {
        self.signals.get(signal_id)
    }

    /// The number of vehicles in the simulation.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// The number of vehicles that have reached their destinations.
    pub fn arrived_count(&self) -> u64 {
        self.arrived
    }

    /// The destination cells.
    pub fn destinations(&self) -> &[Cell] {
        &self.destinations
    }

    /// The current routing graph.
    pub fn graph(&self) -> &CityGraph {
        &self.graph
    }

    /// The occupancy of the grid.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// The order in which vehicles were activated on the latest tick.
    pub fn activation_order(&self) -> &[VehicleId] {
        &self.activation_order
    }

    /// Places a vehicle on a road cell, heading for a destination cell.
    pub fn add_vehicle(
        &mut self,
        start: Cell,
        destination: Cell,
    ) -> Result<VehicleId, PlacementError> {
        if self.index.has_vehicle(start) {
            return Err(PlacementError::Occupied(start));
        }
        if !self.index.is_free_road(start) {
            return Err(PlacementError::NotRoad(start));
        }
        if !self.index.is_destination(destination) {
            return Err(PlacementError::NotDestination(destination));
        }
        if let Some(max) = self.config.max_vehicles {
            if self.vehicles.len() >= max {
                return Err(PlacementError::AtCapacity(max));
            }
        }
        Ok(self.insert_vehicle(start, destination))
    }

    /// Spawns a vehicle on a random free corner of the map, heading for a
    /// random destination. Does nothing if no corner is free, there are no
    /// destinations, or the simulation is at capacity.
    pub fn spawn_vehicle(&mut self) -> Option<VehicleId> {
        if self.destinations.is_empty() {
            return None;
        }
        if let Some(max) = self.config.max_vehicles {
            if self.vehicles.len() >= max {
                log::debug!("not spawning: already {} vehicles", max);
                return None;
            }
        }
        let corners = self
            .corners()
            .filter(|cell| self.index.is_free_road(*cell))
            .collect::<SmallVec<[Cell; 4]>>();
        let Some(&start) = corners.choose(&mut self.rng) else {
            log::debug!("not spawning: no free corner");
            return None;
        };
        let destination = *self.destinations.choose(&mut self.rng)?;
        Some(self.insert_vehicle(start, destination))
    }

    /// Gives every vehicle a fresh snapshot of the routing graph and discards
    /// their routes, so that each reroutes against the current edge weights.
    pub fn refresh_routes(&mut self) {
        for vehicle in self.vehicles.values_mut() {
            vehicle.refresh(self.graph.clone());
        }
        log::debug!("refreshed routes of {} vehicles", self.vehicles.len());
    }

    /// Steps every signal, reweighting the graph around those that flip.
    /// Signals see the tick count as it stood before the current tick.
    fn update_signals(&mut self) -> usize {
        let elapsed = self.tick - 1;
        let mut flipped = 0;
        for signal in self.signals.values_mut() {
            if signal.step(elapsed) {
                let graph = Rc::make_mut(&mut self.graph);
                let edges = graph.reweight_signal(signal.cell(), signal.phase());
                log::debug!(
                    "signal at {} is now {:?} ({} edges reweighted)",
                    signal.cell(),
                    signal.phase(),
                    edges
                );
                flipped += 1;
            }
        }
        flipped
    }

    /// Activates vehicles one after another, each seeing the moves of those
    /// activated before it.
    fn move_sequential(&mut self, order: &[VehicleId], report: &mut TickReport) {
        for &vehicle_id in order {
            let Some(vehicle) = self.vehicles.get_mut(vehicle_id) else {
                continue;
            };
            let outcome = vehicle.step(&mut self.index, &self.signals);
            match outcome {
                StepOutcome::Parked => report.parked += 1,
                StepOutcome::Halted(_) => report.halted += 1,
                StepOutcome::Moved => report.moved += 1,
                StepOutcome::Arrived => {
                    self.remove_arrived(vehicle_id);
                    report.arrived += 1;
                }
            }
        }
    }

    /// Collects a proposed move from every vehicle against the occupancy at the
    /// start of the tick, then commits them. Where several vehicles propose the
    /// same cell, the one with the lowest serial moves and the rest halt.
    fn move_propose_commit(&mut self, order: &[VehicleId], report: &mut TickReport) {
        let mut proposals = vec![];
        let mut travelling: Vec<(VehicleId, Direction)> = vec![];

        for &vehicle_id in order {
            let vehicle = &mut self.vehicles[vehicle_id];
            match vehicle.plan(&self.index, &self.signals) {
                Plan::Parked => report.parked += 1,
                Plan::Halt(reason, dir) => {
                    vehicle.halt(reason);
                    report.halted += 1;
                    travelling.extend(dir.map(|dir| (vehicle_id, dir)));
                }
                Plan::Advance { to, dir } => proposals.push((vehicle_id, to, dir)),
            }
        }

        proposals.sort_by_key(|(vehicle_id, to, _)| (*to, self.vehicles[*vehicle_id].serial()));
        let mut claimed = None;
        for (vehicle_id, to, dir) in proposals {
            if claimed == Some(to) {
                let vehicle = &mut self.vehicles[vehicle_id];
                log::debug!("{} lost the claim on {}", vehicle.label(), to);
                vehicle.halt(HaltReason::Conflict);
                report.halted += 1;
                travelling.push((vehicle_id, dir));
                continue;
            }
            claimed = Some(to);
            if self.vehicles[vehicle_id].advance(to, dir, &mut self.index) {
                self.remove_arrived(vehicle_id);
                report.arrived += 1;
            } else {
                report.moved += 1;
                travelling.push((vehicle_id, dir));
            }
        }

        for (vehicle_id, dir) in travelling {
            if let Some(vehicle) = self.vehicles.get_mut(vehicle_id) {
                vehicle.relieve_congestion(dir, &self.index, &self.signals);
            }
        }
    }

    /// Removes a vehicle that has reached its destination.
    fn remove_arrived(&mut self, vehicle_id: VehicleId) {
        if let Some(vehicle) = self.vehicles.remove(vehicle_id) {
            self.index.remove_vehicle(vehicle.cell(), vehicle_id);
            self.arrived += 1;
            log::debug!(
                "{} reached {} on tick {}",
                vehicle.label(),
                vehicle.cell(),
                self.tick
            );
        }
    }

    fn insert_vehicle(&mut self, start: Cell, destination: Cell) -> VehicleId {
        let serial = self.next_serial;
        self.next_serial += 1;
        let graph = self.graph.clone();
        let vehicle_id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, serial, start, destination, graph));
        self.index.place(start, Occupant::Vehicle(vehicle_id));
        log::debug!(
            "car_{} entered at {} heading for {}",
            serial,
            start,
            destination
        );
        vehicle_id
    }

    /// The corner cells of the map.
    fn corners(&self) -> impl Iterator<Item = Cell> {
        let (w, h) = (self.width() as i32, self.height() as i32);
        [
            Cell::new(0, 0),
            Cell::new(w - 1, 0),
            Cell::new(0, h - 1),
            Cell::new(w - 1, h - 1),
        ]
        .into_iter()
        .unique()
    }
}
