pub use cell::{Cell, Direction};
pub use cgmath;
pub use config::{ActivationMode, SimulationConfig};
pub use control::Controller;
pub use export::{SignalState, VehicleState, WorldSnapshot};
pub use graph::{
    CityGraph, Edge, EdgeKind, GraphOptions, NodeKind, BASE_WEIGHT, CONNECTOR_WEIGHT,
    RESTRICTIVE_FACTOR,
};
pub use index::{Occupant, SpatialIndex};
pub use map::{MapLayout, MapSource, RoadDirections, Tile};
pub use signal::{SignalPhase, TrafficSignal};
pub use simulation::{Simulation, TickReport};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use vehicle::{find_path, HaltReason, StepOutcome, Vehicle};

mod cell;
mod config;
mod control;
pub mod error;
mod export;
mod graph;
mod index;
mod map;
mod signal;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [TrafficSignal].
    pub struct SignalId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
type SignalSet = SlotMap<SignalId, TrafficSignal>;
