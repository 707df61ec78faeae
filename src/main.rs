use grid_traffic::error::ConfigError;
use grid_traffic::{Cell, Controller, Direction, MapLayout, SignalPhase, SimulationConfig, Tile};
use std::error::Error;

/// A ring road with a cross street through the middle, signalled where the
/// streets meet, and a few destinations along the kerbs.
fn demo_city(width: u32, height: u32) -> Result<MapLayout, ConfigError> {
    let mut map = MapLayout::new(width, height);
    let (w, h) = (width as i32, height as i32);
    let (mx, my) = (w / 2, h / 2);

    for x in 0..w {
        map.set(Cell::new(x, 0), Tile::road(Direction::Right))?;
        map.set(Cell::new(x, h - 1), Tile::road(Direction::Left))?;
        map.set(Cell::new(x, my), Tile::road(Direction::Right))?;
    }
    for y in 0..h {
        map.set(Cell::new(0, y), Tile::road(Direction::Down))?;
        map.set(Cell::new(w - 1, y), Tile::road(Direction::Up))?;
        map.set(Cell::new(mx, y), Tile::road(Direction::Up))?;
    }
    let both = |a, b| Tile::Road([a, b].into_iter().collect());
    map.set(Cell::new(0, 0), Tile::road(Direction::Right))?;
    map.set(Cell::new(0, my), both(Direction::Down, Direction::Right))?;
    map.set(Cell::new(mx, 0), both(Direction::Right, Direction::Up))?;
    map.set(Cell::new(mx, h - 1), Tile::road(Direction::Left))?;
    map.set(Cell::new(w - 1, h - 1), Tile::road(Direction::Left))?;

    map.set(Cell::new(mx, my), Tile::signal(SignalPhase::Permissive, 4))?;
    map.set(Cell::new(w - 1, my), Tile::signal(SignalPhase::Restrictive, 6))?;

    map.set(Cell::new(mx - 2, 1), Tile::Destination)?;
    map.set(Cell::new(w - 2, my + 2), Tile::Destination)?;
    map.set(Cell::new(mx - 1, h - 2), Tile::Destination)?;
    map.set(Cell::new(mx + 1, my - 1), Tile::Destination)?;
    Ok(map)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let ticks = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>()?,
        None => 50,
    };

    let config = SimulationConfig {
        seed: 7,
        ..Default::default()
    };
    let mut controller = Controller::new(demo_city, config);
    controller.initialize(8, 11, 11)?;

    for _ in 0..ticks {
        let report = controller.advance_one_tick()?;
        log::info!(
            "tick {}: {} moved, {} halted, {} arrived",
            report.tick,
            report.moved,
            report.halted,
            report.arrived
        );
        println!("{}", serde_json::to_string(&controller.snapshot()?)?);
    }
    Ok(())
}
