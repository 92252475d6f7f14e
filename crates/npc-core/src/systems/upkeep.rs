//! Daily Upkeep System
//!
//! Runs on day boundaries: living costs, overnight healing, and pruning of
//! old memories, gravestones and log entries.

use bevy_ecs::prelude::*;
use npc_events::TICKS_PER_DAY;

use crate::actions::economy::rest_heal;
use crate::components::{Alive, Graveyard, MemoryStore, SimClock, Vitals};
use crate::config::Tuning;
use crate::events::EventLog;

/// Run condition: the clock sits on a day boundary
pub fn is_day_boundary(clock: Res<SimClock>) -> bool {
    clock.is_day_boundary()
}

pub fn daily_upkeep(
    clock: Res<SimClock>,
    tuning: Res<Tuning>,
    mut log: ResMut<EventLog>,
    mut graveyard: ResMut<Graveyard>,
    mut agents: Query<(&Alive, &mut Vitals, &mut MemoryStore)>,
) {
    let tick = clock.tick();
    let horizon = tick.saturating_sub(tuning.memory.retention_days * TICKS_PER_DAY);
    let mut forgotten = 0usize;

    for (alive, mut vitals, mut memory) in agents.iter_mut() {
        if !alive.is_alive() {
            continue;
        }
        vitals.take_gold(tuning.economy.daily_upkeep);
        let overnight = rest_heal(&vitals, 1.0, &tuning.economy);
        vitals.heal(overnight);
        forgotten += memory.prune_older_than(horizon);
    }

    let dropped = log.prune(tick, tuning.simulation.event_log_days);
    let exhumed = graveyard.prune_older_than(horizon);
    tracing::debug!(day = clock.day(), forgotten, dropped, exhumed, "daily upkeep");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AgentId, MemoryEvent, MemoryKind, Personality};

    #[test]
    fn test_upkeep_charges_heals_and_forgets() {
        let mut world = World::new();
        let mut clock = SimClock::new();
        for _ in 0..(40 * TICKS_PER_DAY) {
            clock.advance();
        }
        assert!(clock.is_day_boundary());
        world.insert_resource(clock);
        world.insert_resource(Tuning::default());
        world.insert_resource(EventLog::new());
        let mut graveyard = Graveyard::new();
        graveyard.bury(AgentId::from("npc_0009"), Default::default(), 2);
        graveyard.bury(AgentId::from("npc_0010"), Default::default(), 39 * TICKS_PER_DAY);
        world.insert_resource(graveyard);

        let personality = Personality::default();
        let mut memory = MemoryStore::new(&personality);
        memory.record_event(MemoryEvent::new(MemoryKind::Traded, 5).about(AgentId::from("npc_0002")));
        memory.record_event(
            MemoryEvent::new(MemoryKind::Traded, 39 * TICKS_PER_DAY).about(AgentId::from("npc_0002")),
        );
        let mut vitals = Vitals::new(1, 60, 10);
        vitals.hp = 20;
        let living = world.spawn((Alive(true), vitals.clone(), memory.clone())).id();
        let dead = world.spawn((Alive(false), vitals, memory)).id();

        let mut schedule = Schedule::default();
        schedule.add_systems(daily_upkeep.run_if(is_day_boundary));
        schedule.run(&mut world);

        let after = world.get::<Vitals>(living).unwrap();
        assert_eq!(after.gold, 7);
        assert_eq!(after.hp, 26);
        assert_eq!(world.get::<MemoryStore>(living).unwrap().len(), 1);
        assert_eq!(world.get::<Vitals>(dead).unwrap().gold, 10);
        let graveyard = world.resource::<Graveyard>();
        assert!(!graveyard.contains(&AgentId::from("npc_0009")));
        assert!(graveyard.contains(&AgentId::from("npc_0010")));
    }
}
