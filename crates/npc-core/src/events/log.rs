//! Rolling Event Log
//!
//! World events in tick order, trimmed to a window of days at each day
//! boundary.

use bevy_ecs::prelude::*;
use npc_events::{WorldEvent, TICKS_PER_DAY};
use std::collections::VecDeque;

/// Resource: committed world events, oldest first
#[derive(Resource, Debug, Default)]
pub struct EventLog {
    events: VecDeque<WorldEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: WorldEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldEvent> {
        self.events.iter()
    }

    /// Events from the last `days` days up to and including `now`
    pub fn recent(&self, days: u64, now: u64) -> Vec<&WorldEvent> {
        let floor = window_floor(days, now);
        self.events
            .iter()
            .filter(|e| floor.map_or(true, |floor| e.tick() > floor))
            .collect()
    }

    /// Events naming `agent_id` as a participant
    pub fn involving(&self, agent_id: &str) -> Vec<&WorldEvent> {
        self.events.iter().filter(|e| e.involves(agent_id)).collect()
    }

    /// Drop events that fell out of the window. Returns how many went.
    pub fn prune(&mut self, now: u64, days: u64) -> usize {
        let Some(floor) = window_floor(days, now) else {
            return 0;
        };
        let mut dropped = 0;
        while self.events.front().is_some_and(|e| e.tick() <= floor) {
            self.events.pop_front();
            dropped += 1;
        }
        dropped
    }
}

/// Last tick outside a window of `days` ending at `now`; `None` while the
/// window still reaches back before tick 0
fn window_floor(days: u64, now: u64) -> Option<u64> {
    now.checked_sub(days.saturating_mul(TICKS_PER_DAY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use npc_events::{EventType, SimTimestamp};

    fn event_at(tick: u64, who: &str) -> WorldEvent {
        WorldEvent::new(format!("evt_{tick:08}"), SimTimestamp::from_tick(tick), EventType::Work)
            .with_participant(who)
    }

    #[test]
    fn test_recent_window() {
        let mut log = EventLog::new();
        for tick in [1, 24, 25, 47, 48] {
            log.push(event_at(tick, "npc_0001"));
        }
        let ticks: Vec<u64> = log.recent(1, 48).iter().map(|e| e.tick()).collect();
        assert_eq!(ticks, vec![25, 47, 48]);
        assert_eq!(log.recent(10, 48).len(), 5);
    }

    #[test]
    fn test_prune_matches_window() {
        let mut log = EventLog::new();
        for tick in [1, 24, 25, 48] {
            log.push(event_at(tick, "npc_0001"));
        }
        assert_eq!(log.prune(48, 1), 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.prune(48, 1), 0);
    }

    #[test]
    fn test_window_reaching_past_start_keeps_tick_zero() {
        let mut log = EventLog::new();
        for tick in [0, 3, 23] {
            log.push(event_at(tick, "npc_0001"));
        }
        assert_eq!(log.recent(1, 3).len(), 3);
        assert_eq!(log.recent(1, 0).len(), 1);
        assert_eq!(log.prune(23, 1), 0);
        assert_eq!(log.len(), 3);

        // A full day later tick 0 falls out
        assert_eq!(log.prune(24, 1), 1);
        let ticks: Vec<u64> = log.recent(1, 24).iter().map(|e| e.tick()).collect();
        assert_eq!(ticks, vec![3, 23]);
    }

    #[test]
    fn test_involving() {
        let mut log = EventLog::new();
        log.push(event_at(1, "npc_0001"));
        log.push(event_at(2, "npc_0002"));
        assert_eq!(log.involving("npc_0002").len(), 1);
        assert!(log.involving("npc_0003").is_empty());
    }
}
