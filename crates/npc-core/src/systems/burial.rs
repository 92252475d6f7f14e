//! Burial System
//!
//! Runs last in every tick. Agents killed during the tick are despawned and
//! leave the index, so later passes only walk agents still in town. A
//! snapshot of each stays in the `Graveyard` for a while.

use bevy_ecs::prelude::*;
use npc_events::NpcSnapshot;

use crate::components::{
    AgentId, AgentIndex, AgentName, Alive, GangMembership, GoalManager, Graveyard, Personality,
    Position, SimClock, Vitals,
};

/// Snapshot of one agent entity, dead or alive
pub fn npc_snapshot(world: &World, entity: Entity) -> Option<NpcSnapshot> {
    let agent = world.get_entity(entity)?;
    let id = agent.get::<AgentId>()?;
    let vitals = agent.get::<Vitals>()?;
    let membership = agent.get::<GangMembership>()?;
    let goals = agent
        .get::<GoalManager>()
        .map(|g| g.get_active_goals().into_iter().map(|goal| goal.to_snapshot()).collect())
        .unwrap_or_default();

    Some(NpcSnapshot {
        agent_id: id.0.clone(),
        name: agent.get::<AgentName>().map(|n| n.0.clone()).unwrap_or_default(),
        alive: agent.get::<Alive>().is_some_and(|a| a.is_alive()),
        level: vitals.level,
        hp: vitals.hp,
        max_hp: vitals.max_hp,
        gold: vitals.gold,
        location: agent
            .get::<Position>()
            .map(|p| p.location_id.clone())
            .unwrap_or_default(),
        traits: agent
            .get::<Personality>()
            .map(Personality::to_snapshot)
            .unwrap_or_default(),
        gang_id: membership.gang.clone(),
        is_gang_leader: membership.is_gang_leader,
        goals,
    })
}

/// Despawn the dead and move them from the index to the graveyard
pub fn bury_dead(world: &mut World) {
    let tick = world.resource::<SimClock>().tick();
    let dead: Vec<(AgentId, Entity)> = world
        .resource::<AgentIndex>()
        .iter()
        .filter(|(_, entity)| world.get::<Alive>(*entity).is_some_and(|a| !a.is_alive()))
        .map(|(id, entity)| (id.clone(), entity))
        .collect();

    for (id, entity) in dead {
        let snapshot = npc_snapshot(world, entity);
        world.resource_mut::<AgentIndex>().remove(&id);
        world.despawn(entity);
        if let (Some(snapshot), Some(mut graveyard)) =
            (snapshot, world.get_resource_mut::<Graveyard>())
        {
            graveyard.bury(id.clone(), snapshot, tick);
        }
        tracing::debug!(agent = %id, tick, "buried");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::MemoryStore;

    fn spawn(world: &mut World, id: &str, alive: bool) -> Entity {
        let personality = Personality::default();
        let agent = AgentId::from(id);
        let entity = world
            .spawn((
                agent.clone(),
                AgentName(id.to_string()),
                personality,
                MemoryStore::new(&personality),
                GoalManager::new(),
                Vitals::new(2, 60, 35),
                Position::new("tavern"),
                Alive(alive),
                GangMembership::default(),
            ))
            .id();
        world.resource_mut::<AgentIndex>().insert(agent, entity);
        entity
    }

    #[test]
    fn test_dead_leave_the_world_for_the_graveyard() {
        let mut world = World::new();
        let mut clock = SimClock::new();
        clock.advance();
        world.insert_resource(clock);
        world.insert_resource(AgentIndex::new());
        world.insert_resource(Graveyard::new());
        let living = spawn(&mut world, "npc_0001", true);
        let dead = spawn(&mut world, "npc_0002", false);

        let mut schedule = Schedule::default();
        schedule.add_systems(bury_dead);
        schedule.run(&mut world);

        let index = world.resource::<AgentIndex>();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&AgentId::from("npc_0001")), Some(living));
        assert_eq!(index.next_index(), 3);
        assert!(world.get_entity(dead).is_none());

        let graveyard = world.resource::<Graveyard>();
        let grave = graveyard.get(&AgentId::from("npc_0002")).unwrap();
        assert!(!grave.snapshot.alive);
        assert_eq!(grave.snapshot.gold, 35);
        assert_eq!(grave.buried_at, 1);

        // Nothing left to bury
        schedule.run(&mut world);
        assert_eq!(world.resource::<Graveyard>().total(), 1);
    }
}
