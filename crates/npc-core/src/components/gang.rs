//! Gang Components
//!
//! Gang records and the registry that enforces membership invariants.
//! Agents only hold a [`GangId`] reference; the registry owns the gang.

use bevy_ecs::prelude::*;
use npc_events::GangSnapshot;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::agent::{AgentId, GangId};
use crate::error::GangError;

/// Lifecycle phase of a gang
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GangPhase {
    /// Leader recruiting, below the minimum follower count
    Forming,
    Established,
    /// Below the minimum since the given tick
    Dissolving { since: u64 },
}

impl GangPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GangPhase::Forming => "forming",
            GangPhase::Established => "established",
            GangPhase::Dissolving { .. } => "dissolving",
        }
    }
}

/// A gang
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gang {
    pub id: GangId,
    pub name: String,
    pub leader: AgentId,
    /// Followers in join order, leader excluded
    pub members: Vec<AgentId>,
    pub phase: GangPhase,
    /// Locations this gang controls
    pub turf: BTreeSet<String>,
    pub formed_at: u64,
}

impl Gang {
    pub fn follower_count(&self) -> usize {
        self.members.len()
    }

    /// Leader plus followers
    pub fn size(&self) -> usize {
        self.members.len() + 1
    }

    /// Whether one more follower fits under a cap that counts the leader
    pub fn has_room(&self, max_members: usize) -> bool {
        self.size() < max_members
    }

    pub fn contains(&self, agent: &AgentId) -> bool {
        &self.leader == agent || self.members.contains(agent)
    }

    /// Leader first, then followers
    pub fn everyone(&self) -> impl Iterator<Item = &AgentId> {
        std::iter::once(&self.leader).chain(self.members.iter())
    }

    pub fn to_snapshot(&self) -> GangSnapshot {
        GangSnapshot {
            gang_id: self.id.clone(),
            name: self.name.clone(),
            leader: self.leader.0.clone(),
            members: self.members.iter().map(|m| m.0.clone()).collect(),
            phase: self.phase.as_str().to_string(),
            turf: self.turf.clone(),
            formed_at_tick: self.formed_at,
        }
    }
}

/// Outcome of a turf fight, decided outside the core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurfOutcome {
    pub location: String,
    pub winner: GangId,
}

/// Resource: all gangs
#[derive(Resource, Debug, Default)]
pub struct GangRegistry {
    gangs: BTreeMap<GangId, Gang>,
    member_index: BTreeMap<AgentId, GangId>,
    next_id: u64,
}

impl GangRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_id(&mut self) -> GangId {
        self.next_id += 1;
        format!("gang_{:04}", self.next_id)
    }

    /// Found a gang around an ungrouped leader.
    pub fn create(
        &mut self,
        leader: AgentId,
        name: impl Into<String>,
        tick: u64,
    ) -> Result<GangId, GangError> {
        if let Some(existing) = self.member_index.get(&leader) {
            return Err(GangError::AlreadyInGang {
                agent: leader.0.clone(),
                gang: existing.clone(),
            });
        }
        let id = self.generate_id();
        self.member_index.insert(leader.clone(), id.clone());
        self.gangs.insert(
            id.clone(),
            Gang {
                id: id.clone(),
                name: name.into(),
                leader,
                members: Vec::new(),
                phase: GangPhase::Forming,
                turf: BTreeSet::new(),
                formed_at: tick,
            },
        );
        Ok(id)
    }

    /// Add an ungrouped agent as a follower.
    pub fn add_member(
        &mut self,
        gang_id: &str,
        agent: AgentId,
        max_members: usize,
    ) -> Result<(), GangError> {
        if let Some(existing) = self.member_index.get(&agent) {
            return Err(GangError::AlreadyInGang {
                agent: agent.0.clone(),
                gang: existing.clone(),
            });
        }
        let gang = self
            .gangs
            .get_mut(gang_id)
            .ok_or_else(|| GangError::UnknownGang(gang_id.to_string()))?;
        if !gang.has_room(max_members) {
            return Err(GangError::GangFull(gang_id.to_string()));
        }
        gang.members.push(agent.clone());
        self.member_index.insert(agent, gang_id.to_string());
        Ok(())
    }

    /// Remove a follower. Leaders leave through succession or disbanding.
    pub fn remove_member(&mut self, gang_id: &str, agent: &AgentId) -> Result<(), GangError> {
        let gang = self
            .gangs
            .get_mut(gang_id)
            .ok_or_else(|| GangError::UnknownGang(gang_id.to_string()))?;
        let pos = gang
            .members
            .iter()
            .position(|m| m == agent)
            .ok_or_else(|| GangError::NotAMember {
                agent: agent.0.clone(),
                gang: gang_id.to_string(),
            })?;
        gang.members.remove(pos);
        self.member_index.remove(agent);
        Ok(())
    }

    /// Promote a follower to leader. The previous leader leaves the gang.
    /// Returns the previous leader.
    pub fn promote(&mut self, gang_id: &str, new_leader: &AgentId) -> Result<AgentId, GangError> {
        let gang = self
            .gangs
            .get_mut(gang_id)
            .ok_or_else(|| GangError::UnknownGang(gang_id.to_string()))?;
        let pos = gang
            .members
            .iter()
            .position(|m| m == new_leader)
            .ok_or_else(|| GangError::NotAMember {
                agent: new_leader.0.clone(),
                gang: gang_id.to_string(),
            })?;
        gang.members.remove(pos);
        let previous = std::mem::replace(&mut gang.leader, new_leader.clone());
        self.member_index.remove(&previous);
        Ok(previous)
    }

    /// Remove a gang entirely, releasing every member.
    pub fn disband(&mut self, gang_id: &str) -> Option<Gang> {
        let gang = self.gangs.remove(gang_id)?;
        for agent in gang.everyone() {
            self.member_index.remove(agent);
        }
        Some(gang)
    }

    pub fn set_phase(&mut self, gang_id: &str, phase: GangPhase) {
        if let Some(gang) = self.gangs.get_mut(gang_id) {
            gang.phase = phase;
        }
    }

    /// Hand a location to the winner of a turf fight. A location belongs to
    /// at most one gang.
    pub fn apply_turf_outcome(&mut self, outcome: &TurfOutcome) -> Result<Option<GangId>, GangError> {
        if !self.gangs.contains_key(&outcome.winner) {
            return Err(GangError::UnknownGang(outcome.winner.clone()));
        }
        let mut previous = None;
        for gang in self.gangs.values_mut() {
            if gang.id != outcome.winner && gang.turf.remove(&outcome.location) {
                previous = Some(gang.id.clone());
            }
        }
        if let Some(winner) = self.gangs.get_mut(&outcome.winner) {
            winner.turf.insert(outcome.location.clone());
        }
        Ok(previous)
    }

    pub fn get(&self, gang_id: &str) -> Option<&Gang> {
        self.gangs.get(gang_id)
    }

    pub fn gang_of(&self, agent: &AgentId) -> Option<&Gang> {
        self.member_index.get(agent).and_then(|id| self.gangs.get(id))
    }

    pub fn is_member(&self, agent: &AgentId) -> bool {
        self.member_index.contains_key(agent)
    }

    /// Gangs in id order
    pub fn iter(&self) -> impl Iterator<Item = &Gang> {
        self.gangs.values()
    }

    pub fn ids(&self) -> Vec<GangId> {
        self.gangs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.gangs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gangs.is_empty()
    }
}

const NAME_ADJECTIVES: &[&str] = &[
    "Iron", "Crimson", "Silent", "Rusty", "Black", "Gilded", "Broken", "Howling", "Salt",
    "Ashen",
];

const NAME_NOUNS: &[&str] = &[
    "Rats", "Knives", "Hounds", "Crows", "Hands", "Lanterns", "Wolves", "Anchors", "Masks",
    "Cutters",
];

/// Pick a gang name
pub fn generate_gang_name(rng: &mut impl Rng) -> String {
    let adjective = NAME_ADJECTIVES.choose(rng).copied().unwrap_or("Nameless");
    let noun = NAME_NOUNS.choose(rng).copied().unwrap_or("Crew");
    format!("The {} {}", adjective, noun)
}
