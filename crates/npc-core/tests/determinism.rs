//! Determinism verification tests
//!
//! The same seed and population must produce the same town, hour for hour.

use npc_core::setup::generate_population;
use npc_core::{NpcSeed, Simulation, Tuning};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn population(seed: u64) -> Vec<NpcSeed> {
    generate_population(30, 20, &mut SmallRng::seed_from_u64(seed))
}

fn run(seed: u64, hours: u64) -> Simulation {
    let mut sim = Simulation::new(Tuning::default(), seed).unwrap();
    sim.initialize(population(seed)).unwrap();
    sim.simulate_hours(hours);
    sim
}

/// Same seed, same world after two simulated days
#[test]
fn test_identical_runs() {
    let a = run(42, 48);
    let b = run(42, 48);

    assert_eq!(a.get_alive_npcs(), b.get_alive_npcs());
    assert_eq!(a.gangs(), b.gangs());
    assert_eq!(a.get_recent_events(2), b.get_recent_events(2));
    assert_eq!(a.last_decisions(), b.last_decisions());
}

/// Different seeds diverge
#[test]
fn test_different_seeds_diverge() {
    let mut a = Simulation::new(Tuning::default(), 1).unwrap();
    let mut b = Simulation::new(Tuning::default(), 2).unwrap();
    a.initialize(population(7)).unwrap();
    b.initialize(population(7)).unwrap();
    a.simulate_hours(24);
    b.simulate_hours(24);

    assert_ne!(a.get_recent_events(1), b.get_recent_events(1));
}

/// reset() followed by initialize() with the same agents replays the first tick
#[test]
fn test_reset_replays_first_tick() {
    let mut sim = Simulation::new(Tuning::default(), 99).unwrap();
    sim.initialize(population(5)).unwrap();
    sim.simulate_hour();
    let first = sim.last_decisions().to_vec();
    let first_events = sim.get_recent_events(1);
    assert_eq!(first.len(), 30);

    sim.simulate_hours(40);
    sim.reset();
    sim.initialize(population(5)).unwrap();
    sim.simulate_hour();

    assert_eq!(sim.current_tick(), 1);
    assert_eq!(sim.last_decisions(), first.as_slice());
    assert_eq!(sim.get_recent_events(1), first_events);
}

/// Decisions come out in ascending id order every tick
#[test]
fn test_agents_decide_in_id_order() {
    let sim = run(3, 5);
    let ids: Vec<_> = sim.last_decisions().iter().map(|(id, _)| id.clone()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}
