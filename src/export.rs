use crate::signal::SignalPhase;
use crate::Simulation;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The observable state of a simulation at the end of a tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldSnapshot {
    /// The number of ticks simulated.
    pub tick: u64,
    /// The vehicles, in order of serial.
    pub vehicles: Vec<VehicleState>,
    /// The traffic signals, in map order.
    pub signals: Vec<SignalState>,
}

/// The exported state of one vehicle.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleState {
    /// The vehicle's label, e.g. `car_0`.
    pub id: String,
    pub x: i32,
    pub y: i32,
}

/// The exported state of one signal.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalState {
    /// The signal's index in map order.
    pub id: usize,
    pub x: i32,
    pub y: i32,
    pub phase: SignalPhase,
}

impl Simulation {
    /// Captures the positions of all vehicles and the phases of all signals.
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut vehicles = self.iter_vehicles().collect::<Vec<_>>();
        vehicles.sort_by_key(|vehicle| vehicle.serial());
        let vehicles = vehicles
            .into_iter()
            .map(|vehicle| VehicleState {
                id: vehicle.label(),
                x: vehicle.cell().x,
                y: vehicle.cell().y,
            })
            .collect();

        let signals = self
            .iter_signals()
            .enumerate()
            .map(|(id, (_, signal))| SignalState {
                id,
                x: signal.cell().x,
                y: signal.cell().y,
                phase: signal.phase(),
            })
            .collect();

        WorldSnapshot {
            tick: self.tick(),
            vehicles,
            signals,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::map::{MapLayout, Tile};
    use crate::signal::SignalPhase;
    use crate::{Cell, Direction, Simulation, SimulationConfig};

    #[test]
    fn snapshot_lists_vehicles_and_signals() {
        let mut map = MapLayout::new(5, 1);
        map.set(Cell::new(0, 0), Tile::road(Direction::Right)).unwrap();
        map.set(Cell::new(1, 0), Tile::road(Direction::Right)).unwrap();
        // Turns permissive on the first tick.
        map.set(Cell::new(2, 0), Tile::signal(SignalPhase::Restrictive, 2))
            .unwrap();
        map.set(Cell::new(3, 0), Tile::road(Direction::Right)).unwrap();
        map.set(Cell::new(4, 0), Tile::Destination).unwrap();
        let config = SimulationConfig::default().without_spawning();
        let mut sim = Simulation::new(&map, config).unwrap();
        sim.add_vehicle(Cell::new(1, 0), Cell::new(4, 0)).unwrap();
        sim.add_vehicle(Cell::new(0, 0), Cell::new(4, 0)).unwrap();
        sim.step();

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.tick, 1);
        let labels = snapshot
            .vehicles
            .iter()
            .map(|v| v.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["car_0", "car_1"]);
        // The trailing car moves only if it was activated after the lead.
        assert_eq!(snapshot.vehicles[0].x, 2);
        assert!(snapshot.vehicles[1].x <= 1);
        assert_eq!(snapshot.signals.len(), 1);
        assert_eq!(snapshot.signals[0].phase, SignalPhase::Permissive);
        assert_eq!((snapshot.signals[0].x, snapshot.signals[0].y), (2, 0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_serializes_to_json() {
        let mut map = MapLayout::new(2, 1);
        map.set(Cell::new(0, 0), Tile::road(Direction::Right)).unwrap();
        map.set(Cell::new(1, 0), Tile::Destination).unwrap();
        let config = SimulationConfig::default().without_spawning();
        let mut sim = Simulation::new(&map, config).unwrap();
        sim.add_vehicle(Cell::new(0, 0), Cell::new(1, 0)).unwrap();

        let json = serde_json::to_value(sim.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tick": 0,
                "vehicles": [{ "id": "car_0", "x": 0, "y": 0 }],
                "signals": [],
            })
        );
    }
}
