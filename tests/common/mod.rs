//! Map fixtures shared by the integration tests.

#![allow(dead_code)]

use grid_traffic::{Cell, Direction, MapLayout, RoadDirections, SignalPhase, Tile};
use rand::seq::SliceRandom;
use rand::Rng;

/// Builds a map from rows of characters, drawn top row first so that `^`
/// points up the screen (towards larger `y`).
///
/// `.` empty, `#` obstacle, `D` destination, `>` `<` `^` `v` one-way road,
/// `P` permissive signal, `R` restrictive signal. Signals get `period`.
pub fn layout(rows: &[&str], period: u32) -> MapLayout {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |row| row.len()) as u32;
    let mut map = MapLayout::new(width, height);
    for (line, row) in rows.iter().enumerate() {
        assert_eq!(row.len() as u32, width, "ragged fixture row {:?}", row);
        let y = height as i32 - 1 - line as i32;
        for (x, ch) in row.chars().enumerate() {
            let tile = match ch {
                '.' => Tile::Empty,
                '#' => Tile::Obstacle,
                'D' => Tile::Destination,
                '>' => Tile::road(Direction::Right),
                '<' => Tile::road(Direction::Left),
                '^' => Tile::road(Direction::Up),
                'v' => Tile::road(Direction::Down),
                'P' => Tile::signal(SignalPhase::Permissive, period),
                'R' => Tile::signal(SignalPhase::Restrictive, period),
                other => panic!("unknown fixture tile {:?}", other),
            };
            map.set(Cell::new(x as i32, y), tile).unwrap();
        }
    }
    map
}

/// A random city. Corners are always roads so that vehicles can spawn.
pub fn random_city(rng: &mut impl Rng, width: u32, height: u32) -> MapLayout {
    let mut map = MapLayout::new(width, height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let roll: f64 = rng.gen();
            let tile = if roll < 0.55 {
                random_road(rng)
            } else if roll < 0.65 {
                let phase = if rng.gen_bool(0.5) {
                    SignalPhase::Permissive
                } else {
                    SignalPhase::Restrictive
                };
                Tile::signal(phase, rng.gen_range(1..=6))
            } else if roll < 0.72 {
                Tile::Destination
            } else if roll < 0.8 {
                Tile::Obstacle
            } else {
                Tile::Empty
            };
            map.set(Cell::new(x, y), tile).unwrap();
        }
    }
    let (w, h) = (width as i32, height as i32);
    for corner in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
        map.set(corner.into(), random_road(rng)).unwrap();
    }
    map
}

fn random_road(rng: &mut impl Rng) -> Tile {
    let mut dirs = RoadDirections::new();
    dirs.extend(Direction::ALL.choose(rng).copied());
    if rng.gen_bool(0.3) {
        let second = Direction::ALL.choose(rng).copied();
        if second.is_some() && second != dirs.first().copied() {
            dirs.extend(second);
        }
    }
    Tile::Road(dirs)
}
