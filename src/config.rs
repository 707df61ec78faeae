use crate::error::ConfigError;
use crate::graph::GraphOptions;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The tunable parameters of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SimulationConfig {
    /// Seed for the random number generator driving activation order,
    /// spawn corners and destinations.
    pub seed: u64,
    /// A vehicle is spawned every this many ticks. Zero disables spawning.
    pub spawn_interval: u64,
    /// Spawning happens on ticks where `tick % spawn_interval == spawn_phase`.
    pub spawn_phase: u64,
    /// The maximum number of vehicles alive at once, if any.
    pub max_vehicles: Option<usize>,
    /// How vehicle moves are scheduled within a tick.
    pub activation: ActivationMode,
    /// Options for building the routing graph.
    pub graph: GraphOptions,
}

/// How vehicle moves are scheduled within a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActivationMode {
    /// Vehicles act one at a time in a random order, each seeing the moves of
    /// those before it.
    #[default]
    Sequential,
    /// Every vehicle proposes a move against the occupancy at the start of the
    /// tick; proposals for the same cell are settled in favour of the vehicle
    /// with the lowest serial.
    ProposeCommit,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            spawn_interval: 5,
            spawn_phase: 1,
            max_vehicles: None,
            activation: ActivationMode::Sequential,
            graph: GraphOptions::default(),
        }
    }
}

impl SimulationConfig {
    /// Checks the configuration for errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spawn_interval > 0 && self.spawn_phase >= self.spawn_interval {
            return Err(ConfigError::InvalidSpawnPhase {
                phase: self.spawn_phase,
                interval: self.spawn_interval,
            });
        }
        Ok(())
    }

    /// Whether a vehicle should be spawned on the given tick.
    pub fn is_spawn_tick(&self, tick: u64) -> bool {
        self.spawn_interval > 0 && tick % self.spawn_interval == self.spawn_phase
    }

    /// A configuration with spawning disabled.
    pub fn without_spawning(self) -> Self {
        Self {
            spawn_interval: 0,
            ..self
        }
    }
}
