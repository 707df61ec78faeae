use crate::error::ControlError;
use crate::export::WorldSnapshot;
use crate::map::MapSource;
use crate::{Simulation, SimulationConfig, TickReport};

/// The external control surface: builds a world on request and steps it.
pub struct Controller {
    /// Supplies the map whenever the world is (re)built.
    source: Box<dyn MapSource>,
    /// The parameters every new world starts from.
    config: SimulationConfig,
    /// The current world, once initialized.
    sim: Option<Simulation>,
}

impl Controller {
    /// Creates a controller with no world.
    pub fn new(source: impl MapSource + 'static, config: SimulationConfig) -> Self {
        Self {
            source: Box::new(source),
            config,
            sim: None,
        }
    }

    /// Builds a fresh world, replacing any existing one.
    ///
    /// At most `vehicle_count` vehicles are alive at once. The map source
    /// decides whether `width` and `height` are honoured.
    pub fn initialize(
        &mut self,
        vehicle_count: usize,
        width: u32,
        height: u32,
    ) -> Result<(), ControlError> {
        let layout = self.source.layout(width, height)?;
        let config = SimulationConfig {
            max_vehicles: Some(vehicle_count),
            ..self.config
        };
        let sim = Simulation::new(&layout, config)?;
        log::info!(
            "initialized a {}x{} world for up to {} vehicles",
            sim.width(),
            sim.height(),
            vehicle_count
        );
        self.sim = Some(sim);
        Ok(())
    }

    /// Runs one tick of the current world.
    pub fn advance_one_tick(&mut self) -> Result<TickReport, ControlError> {
        let sim = self.sim.as_mut().ok_or(ControlError::NotInitialized)?;
        Ok(sim.step())
    }

    /// The state of the current world.
    pub fn snapshot(&self) -> Result<WorldSnapshot, ControlError> {
        self.sim
            .as_ref()
            .map(Simulation::snapshot)
            .ok_or(ControlError::NotInitialized)
    }

    /// The current world, if initialized.
    pub fn simulation(&self) -> Option<&Simulation> {
        self.sim.as_ref()
    }
}
