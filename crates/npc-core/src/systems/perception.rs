//! Perception System
//!
//! Builds the start-of-tick roster every decision reads from. Decisions see
//! the world as it was when the tick began; resolution re-checks live state.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use crate::components::{
    AgentId, AgentName, Alive, GangId, GangMembership, GangRegistry, MemoryStore, Personality,
    Position, SimClock, TownMap, Vitals,
};
use crate::config::Tuning;

/// What any agent can observe about another
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSummary {
    pub id: AgentId,
    pub name: String,
    pub location: String,
    pub level: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub gold: u32,
    pub strength: f32,
    pub gang: Option<GangId>,
    pub is_gang_leader: bool,
    /// Leader whose gang can still take followers
    pub recruiting: bool,
}

impl AgentSummary {
    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            0.0
        } else {
            (self.hp as f32 / self.max_hp as f32).clamp(0.0, 1.0)
        }
    }

    pub fn same_gang(&self, other: &AgentSummary) -> bool {
        self.gang.is_some() && self.gang == other.gang
    }
}

/// Resource: living agents by id and by location
#[derive(Resource, Debug, Default)]
pub struct Roster {
    agents: BTreeMap<AgentId, AgentSummary>,
    by_location: BTreeMap<String, Vec<AgentId>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (called before rebuilding)
    pub fn clear(&mut self) {
        self.agents.clear();
        self.by_location.clear();
    }

    pub fn insert(&mut self, summary: AgentSummary) {
        let ids = self.by_location.entry(summary.location.clone()).or_default();
        if let Err(pos) = ids.binary_search(&summary.id) {
            ids.insert(pos, summary.id.clone());
        }
        self.agents.insert(summary.id.clone(), summary);
    }

    pub fn get(&self, id: &AgentId) -> Option<&AgentSummary> {
        self.agents.get(id)
    }

    /// Present in the roster means alive at the start of the tick
    pub fn is_alive(&self, id: &AgentId) -> bool {
        self.agents.contains_key(id)
    }

    /// Agents at a location, in id order
    pub fn at_location(&self, location_id: &str) -> &[AgentId] {
        self.by_location
            .get(location_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Everyone at `location_id` except `id`
    pub fn others_at<'a>(
        &'a self,
        location_id: &str,
        id: &'a AgentId,
    ) -> impl Iterator<Item = &'a AgentSummary> + 'a {
        self.at_location(location_id)
            .iter()
            .filter(move |other| *other != id)
            .filter_map(move |other| self.agents.get(other))
    }

    /// All living agents in id order
    pub fn iter(&self) -> impl Iterator<Item = &AgentSummary> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// One agent's own state, borrowed for a decision
#[derive(Debug, Clone, Copy)]
pub struct AgentContext<'a> {
    pub id: &'a AgentId,
    pub personality: &'a Personality,
    pub memory: &'a MemoryStore,
    pub vitals: &'a Vitals,
    pub location: &'a str,
    pub membership: &'a GangMembership,
}

/// Shared world state, borrowed for a decision
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'w> {
    pub tick: u64,
    pub roster: &'w Roster,
    pub map: &'w TownMap,
}

impl<'w> WorldView<'w> {
    pub fn new(tick: u64, roster: &'w Roster, map: &'w TownMap) -> Self {
        Self { tick, roster, map }
    }

    /// Other living agents sharing the agent's location
    pub fn neighbors<'a>(&'a self, agent: &AgentContext<'a>) -> Vec<&'a AgentSummary> {
        self.roster.others_at(agent.location, agent.id).collect()
    }

    /// Is `other` alive and at the agent's location?
    pub fn is_co_located(&self, agent: &AgentContext<'_>, other: &AgentId) -> bool {
        self.roster
            .get(other)
            .is_some_and(|s| s.location == agent.location)
    }
}

/// Rebuild the roster from live components
pub fn build_roster(
    tuning: Res<Tuning>,
    gangs: Res<GangRegistry>,
    mut roster: ResMut<Roster>,
    query: Query<(&AgentId, &AgentName, &Vitals, &Position, &Alive, &GangMembership)>,
) {
    roster.clear();
    for (id, name, vitals, position, alive, membership) in query.iter() {
        if !alive.is_alive() {
            continue;
        }
        let recruiting = membership.is_gang_leader
            && membership
                .gang
                .as_deref()
                .and_then(|g| gangs.get(g))
                .is_some_and(|g| g.has_room(tuning.gangs.max_members));
        roster.insert(AgentSummary {
            id: id.clone(),
            name: name.0.clone(),
            location: position.location_id.clone(),
            level: vitals.level,
            hp: vitals.hp,
            max_hp: vitals.max_hp,
            gold: vitals.gold,
            strength: vitals.strength(),
            gang: membership.gang.clone(),
            is_gang_leader: membership.is_gang_leader,
            recruiting,
        });
    }
}
