//! Small hand-drawn scenarios with fully predictable outcomes.

mod common;

use common::layout;
use grid_traffic::{
    ActivationMode, Cell, HaltReason, SignalPhase, Simulation, SimulationConfig, StepOutcome,
};

fn quiet() -> SimulationConfig {
    SimulationConfig::default().without_spawning()
}

/// A single vehicle is held by a signal for exactly the ticks it is restrictive.
/// Signals flip on the first tick and then every `period` ticks.
#[test]
fn vehicle_waits_out_a_signal_cycle() {
    let map = layout(&[".....", ".....", ".....", ".....", ">>P>D"], 2);
    let mut sim = Simulation::new(&map, quiet()).unwrap();
    let car = sim.add_vehicle(Cell::new(0, 0), Cell::new(4, 0)).unwrap();

    let mut timeline = vec![];
    for _ in 0..4 {
        let report = sim.step();
        let cell = sim.get_vehicle(car).unwrap().cell();
        let phase = sim.snapshot().signals[0].phase;
        timeline.push((report.tick, cell.x, phase, report.moved, report.halted));
    }
    use SignalPhase::*;
    assert_eq!(
        timeline,
        vec![
            (1, 1, Restrictive, 1, 0),
            (2, 1, Restrictive, 0, 1),
            (3, 2, Permissive, 1, 0),
            (4, 3, Permissive, 1, 0),
        ]
    );

    // Four moves plus one halted tick.
    let report = sim.step();
    assert_eq!(report.tick, 5);
    assert_eq!(report.arrived, 1);
    assert_eq!(sim.get_vehicle(car).map(|v| v.cell()), None);
    assert_eq!(sim.vehicle_count(), 0);
    assert_eq!(sim.arrived_count(), 1);
    assert!(!sim.index().has_vehicle(Cell::new(4, 0)));
    assert!(sim.snapshot().vehicles.is_empty());
}

/// A vehicle behind one stopped at a signal halts too, whatever the
/// activation order. The signal turns restrictive on the first tick.
#[test]
fn queue_forms_behind_a_signal() {
    let map = layout(&[">>>PD"], 100);
    for seed in 0..8 {
        let config = SimulationConfig { seed, ..quiet() };
        let mut sim = Simulation::new(&map, config).unwrap();
        let lead = sim.add_vehicle(Cell::new(2, 0), Cell::new(4, 0)).unwrap();
        let trailer = sim.add_vehicle(Cell::new(1, 0), Cell::new(4, 0)).unwrap();

        let report = sim.step();
        assert_eq!(report.halted, 2);
        assert_eq!(sim.get_vehicle(lead).unwrap().cell(), Cell::new(2, 0));
        assert_eq!(sim.get_vehicle(trailer).unwrap().cell(), Cell::new(1, 0));
        assert!(sim.get_vehicle(trailer).unwrap().has_stopped());
    }
}

/// A vehicle whose destination is unreachable stays parked without blocking
/// the tick.
#[test]
fn unreachable_destination_parks() {
    let map = layout(&["D#>>>"], 1);
    let mut sim = Simulation::new(&map, quiet()).unwrap();
    let car = sim.add_vehicle(Cell::new(2, 0), Cell::new(0, 0)).unwrap();
    for _ in 0..4 {
        let report = sim.step();
        assert_eq!(report.parked, 1);
    }
    let vehicle = sim.get_vehicle(car).unwrap();
    assert_eq!(vehicle.cell(), Cell::new(2, 0));
    assert_eq!(vehicle.stop_count(), 4);
}

/// When two vehicles propose the same cell, the earlier arrival wins.
#[test]
fn contested_cell_goes_to_lowest_serial() {
    let map = layout(&["...", ">>D", ".^."], 1);
    let config = SimulationConfig {
        activation: ActivationMode::ProposeCommit,
        ..quiet()
    };
    let mut sim = Simulation::new(&map, config).unwrap();
    let first = sim.add_vehicle(Cell::new(0, 1), Cell::new(2, 1)).unwrap();
    let second = sim.add_vehicle(Cell::new(1, 0), Cell::new(2, 1)).unwrap();

    let report = sim.step();
    assert_eq!((report.moved, report.halted), (1, 1));
    assert_eq!(sim.get_vehicle(first).unwrap().cell(), Cell::new(1, 1));
    assert_eq!(sim.get_vehicle(second).unwrap().cell(), Cell::new(1, 0));

    // The winner arrives; the cell it left was still occupied when the
    // loser planned, so the loser waits one more tick.
    let report = sim.step();
    assert_eq!((report.arrived, report.halted), (1, 1));
    let report = sim.step();
    assert_eq!(report.moved, 1);
    assert_eq!(sim.get_vehicle(second).unwrap().cell(), Cell::new(1, 1));
}

/// Outcomes reported per vehicle add up to the tick summary.
#[test]
fn report_accounts_for_every_vehicle() {
    let map = layout(&[">>>>D", ">>P>D", "D#..."], 50);
    let mut sim = Simulation::new(&map, quiet()).unwrap();
    sim.add_vehicle(Cell::new(0, 2), Cell::new(4, 2)).unwrap();
    sim.add_vehicle(Cell::new(1, 1), Cell::new(4, 1)).unwrap();
    sim.add_vehicle(Cell::new(3, 2), Cell::new(4, 2)).unwrap();
    let before = sim.vehicle_count();

    let report = sim.step();
    assert_eq!(
        report.moved + report.halted + report.parked + report.arrived,
        before
    );
    assert_eq!(report.arrived, 1);
    assert_eq!(report.halted, 1);
    assert_eq!(report.moved, 1);
}

/// Signals flip on the first tick, then once every period.
#[test]
fn signal_flips_on_first_tick_and_every_period() {
    let map = layout(&[">>P>D"], 3);
    let mut sim = Simulation::new(&map, quiet()).unwrap();
    let flips = (0..7)
        .map(|_| {
            let report = sim.step();
            (report.tick, report.signals_flipped)
        })
        .filter(|(_, flipped)| *flipped > 0)
        .map(|(tick, _)| tick)
        .collect::<Vec<_>>();
    assert_eq!(flips, vec![1, 4, 7]);
    assert_eq!(sim.snapshot().signals[0].phase, SignalPhase::Restrictive);
}

#[test]
fn halt_reasons_are_distinguished() {
    assert_ne!(
        StepOutcome::Halted(HaltReason::Signal),
        StepOutcome::Halted(HaltReason::Vehicle)
    );
}
