//! Snapshot Types
//!
//! Read-only views of agents and gangs handed to display layers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Personality traits snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitsSnapshot {
    pub ambition: f32,
    pub loyalty: f32,
    pub sociability: f32,
    pub aggression: f32,
    pub courage: f32,
    pub greed: f32,
    pub vengefulness: f32,
    pub impulsiveness: f32,
}

/// Goal snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSnapshot {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub priority: f32,
}

/// Full NPC snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NpcSnapshot {
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub alive: bool,
    pub level: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub gold: u32,
    pub location: String,
    #[serde(default)]
    pub traits: TraitsSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gang_id: Option<String>,
    #[serde(default)]
    pub is_gang_leader: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<GoalSnapshot>,
}

/// Gang snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GangSnapshot {
    pub gang_id: String,
    pub name: String,
    pub leader: String,
    pub members: Vec<String>,
    /// `forming`, `established` or `dissolving`
    pub phase: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub turf: BTreeSet<String>,
    pub formed_at_tick: u64,
}

impl GangSnapshot {
    /// Followers plus the leader.
    pub fn size(&self) -> usize {
        self.members.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gang_size_counts_leader() {
        let gang = GangSnapshot {
            gang_id: "gang_0001".into(),
            name: "The Iron Rats".into(),
            leader: "npc_0001".into(),
            members: vec!["npc_0002".into(), "npc_0003".into()],
            phase: "established".into(),
            turf: BTreeSet::new(),
            formed_at_tick: 40,
        };
        assert_eq!(gang.size(), 3);
    }

    #[test]
    fn test_npc_snapshot_skips_empty_optionals() {
        let npc = NpcSnapshot {
            agent_id: "npc_0001".into(),
            name: "Brak".into(),
            alive: true,
            level: 2,
            hp: 80,
            max_hp: 100,
            gold: 12,
            location: "docks".into(),
            traits: TraitsSnapshot::default(),
            gang_id: None,
            is_gang_leader: false,
            goals: Vec::new(),
        };
        let json = serde_json::to_string(&npc).unwrap();
        assert!(!json.contains("gang_id"));
        assert!(!json.contains("goals"));
    }
}
