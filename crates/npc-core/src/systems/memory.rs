//! Memory Delivery System
//!
//! Memories produced while resolving a tick are buffered and delivered at
//! the end of that same tick, so every decision in a tick reads the same
//! memory state. The tick's events are committed here too.

use bevy_ecs::prelude::*;

use crate::components::{AgentId, AgentIndex, MemoryEvent, MemoryStore};
use crate::events::{EventLog, EventLogger};
use crate::systems::resolve::TickEvents;

/// Resource: memories waiting for delivery
#[derive(Resource, Debug, Default)]
pub struct PendingMemories {
    entries: Vec<(AgentId, MemoryEvent)>,
}

impl PendingMemories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, recipient: &AgentId, event: MemoryEvent) {
        self.entries.push((recipient.clone(), event));
    }

    pub fn drain(&mut self) -> Vec<(AgentId, MemoryEvent)> {
        std::mem::take(&mut self.entries)
    }

    pub fn as_slice(&self) -> &[(AgentId, MemoryEvent)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Record buffered memories and commit this tick's events to the log
pub fn deliver_memories(
    index: Res<AgentIndex>,
    mut pending: ResMut<PendingMemories>,
    mut tick_events: ResMut<TickEvents>,
    mut log: ResMut<EventLog>,
    logger: Option<ResMut<EventLogger>>,
    mut stores: Query<&mut MemoryStore>,
) {
    let mut delivered = 0usize;
    for (recipient, event) in pending.drain() {
        let Some(entity) = index.get(&recipient) else {
            tracing::warn!(agent = %recipient, "memory for unknown agent dropped");
            continue;
        };
        if let Ok(mut store) = stores.get_mut(entity) {
            store.record_event(event);
            delivered += 1;
        }
    }

    let events = tick_events.drain();
    if !events.is_empty() || delivered > 0 {
        tracing::trace!(events = events.len(), memories = delivered, "tick committed");
    }
    if let Some(mut logger) = logger {
        if let Err(err) = logger.log_batch(&events) {
            tracing::warn!(%err, "failed to write events");
        }
    }
    for event in events {
        log.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MemoryKind, Personality};
    use npc_events::{EventType, SimTimestamp};

    #[test]
    fn test_delivery_records_memories_and_commits_events() {
        let mut world = World::new();
        let personality = Personality::default();
        let id = AgentId::from("npc_0001");
        let entity = world.spawn(MemoryStore::new(&personality)).id();
        let mut index = AgentIndex::new();
        index.insert(id.clone(), entity);
        world.insert_resource(index);
        world.insert_resource(EventLog::new());

        let mut pending = PendingMemories::new();
        pending.push(
            &id,
            MemoryEvent::new(MemoryKind::WasHelped, 3).about(AgentId::from("npc_0002")),
        );
        pending.push(
            &AgentId::from("npc_0404"),
            MemoryEvent::new(MemoryKind::Helped, 3),
        );
        world.insert_resource(pending);

        let mut tick_events = TickEvents::new();
        let event = tick_events.create(SimTimestamp::from_tick(3), EventType::Work);
        tick_events.push(event);
        world.insert_resource(tick_events);

        let mut schedule = Schedule::default();
        schedule.add_systems(deliver_memories);
        schedule.run(&mut world);

        assert!(world.resource::<PendingMemories>().is_empty());
        assert!(world.resource::<TickEvents>().is_empty());
        assert_eq!(world.resource::<EventLog>().len(), 1);
        let store = world.get::<MemoryStore>(entity).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get_relationship(&AgentId::from("npc_0002")).friendship > 0.0);
    }
}
