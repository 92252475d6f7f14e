//! Agent Components
//!
//! Components for individual agents: identity, vitals, gang membership.

use bevy_ecs::prelude::*;
use npc_events::NpcSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for an agent
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric part of a sequential `npc_NNNN` id
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix("npc_")?.parse().ok()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Human-readable name for an agent
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct AgentName(pub String);

/// Level, health and wealth
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub level: u32,
    pub xp: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub gold: u32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            hp: 60,
            max_hp: 60,
            gold: 0,
        }
    }
}

impl Vitals {
    pub fn new(level: u32, hp: i32, gold: u32) -> Self {
        Self {
            level: level.max(1),
            xp: 0,
            hp,
            max_hp: hp.max(1),
            gold,
        }
    }

    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        (self.hp as f32 / self.max_hp as f32).clamp(0.0, 1.0)
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    pub fn heal(&mut self, amount: i32) {
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
    }

    /// Apply damage. Returns true when this blow was fatal.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        let was_alive = self.hp > 0;
        self.hp -= amount.max(0);
        was_alive && self.hp <= 0
    }

    /// Spend gold if affordable.
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.gold >= amount {
            self.gold -= amount;
            true
        } else {
            false
        }
    }

    /// Take up to `amount` gold, returning what was actually taken.
    pub fn take_gold(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.gold);
        self.gold -= taken;
        taken
    }

    /// Grant xp, levelling up as thresholds are crossed. Returns levels gained.
    pub fn gain_xp(&mut self, xp: u32, xp_per_level: u32, hp_per_level: i32) -> u32 {
        self.xp += xp;
        let mut gained = 0;
        while xp_per_level > 0 && self.xp >= xp_per_level * self.level {
            self.xp -= xp_per_level * self.level;
            self.level += 1;
            self.max_hp += hp_per_level;
            self.hp += hp_per_level;
            gained += 1;
        }
        gained
    }

    /// Rough fighting strength used for courage checks and combat odds.
    pub fn strength(&self) -> f32 {
        self.level as f32 * 10.0 + self.hp.max(0) as f32 / 4.0
    }
}

/// Marker for whether agent is alive
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alive(pub bool);

impl Default for Alive {
    fn default() -> Self {
        Self(true)
    }
}

impl Alive {
    pub fn is_alive(&self) -> bool {
        self.0
    }

    pub fn kill(&mut self) {
        self.0 = false;
    }
}

/// Identifier of a gang
pub type GangId = String;

/// Weak reference from an agent to its gang
#[derive(Component, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GangMembership {
    pub gang: Option<GangId>,
    pub is_gang_leader: bool,
}

impl GangMembership {
    pub fn is_ungrouped(&self) -> bool {
        self.gang.is_none()
    }

    pub fn join(&mut self, gang: impl Into<GangId>) {
        self.gang = Some(gang.into());
        self.is_gang_leader = false;
    }

    pub fn lead(&mut self, gang: impl Into<GangId>) {
        self.gang = Some(gang.into());
        self.is_gang_leader = true;
    }

    pub fn leave(&mut self) {
        self.gang = None;
        self.is_gang_leader = false;
    }
}

/// Resource: ordered id -> entity lookup
///
/// Every per-tick pass walks this map, so agents are always processed in
/// ascending id order regardless of ECS storage layout. Holds the agents
/// present in the world; the dead leave it when they are buried.
#[derive(Resource, Debug, Default)]
pub struct AgentIndex {
    entities: BTreeMap<AgentId, Entity>,
    /// Highest sequential id ever indexed, buried agents included
    highest_sequence: u64,
}

impl AgentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: AgentId, entity: Entity) {
        if let Some(sequence) = id.sequence() {
            self.highest_sequence = self.highest_sequence.max(sequence);
        }
        self.entities.insert(id, entity);
    }

    pub fn remove(&mut self, id: &AgentId) -> Option<Entity> {
        self.entities.remove(id)
    }

    /// Next sequential id index never handed out before
    pub fn next_index(&self) -> u64 {
        self.highest_sequence + 1
    }

    pub fn get(&self, id: &AgentId) -> Option<Entity> {
        self.entities.get(id).copied()
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.entities.contains_key(id)
    }

    /// Indexed agents in id order; those killed this tick are still here
    pub fn iter(&self) -> impl Iterator<Item = (&AgentId, Entity)> {
        self.entities.iter().map(|(id, entity)| (id, *entity))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Last known state of a buried agent
#[derive(Debug, Clone, PartialEq)]
pub struct Gravestone {
    pub snapshot: NpcSnapshot,
    pub buried_at: u64,
}

/// Resource: agents removed from the world after death.
///
/// Gravestones are kept for the memory retention window; the death count
/// covers the whole run.
#[derive(Resource, Debug, Default)]
pub struct Graveyard {
    graves: BTreeMap<AgentId, Gravestone>,
    total: usize,
}

impl Graveyard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bury(&mut self, id: AgentId, snapshot: NpcSnapshot, tick: u64) {
        self.graves.insert(
            id,
            Gravestone {
                snapshot,
                buried_at: tick,
            },
        );
        self.total += 1;
    }

    pub fn get(&self, id: &AgentId) -> Option<&Gravestone> {
        self.graves.get(id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.graves.contains_key(id)
    }

    /// Deaths since the run began
    pub fn total(&self) -> usize {
        self.total
    }

    /// Gravestones still held
    pub fn len(&self) -> usize {
        self.graves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graves.is_empty()
    }

    /// Forget agents buried before `horizon`. Returns how many went.
    pub fn prune_older_than(&mut self, horizon: u64) -> usize {
        let before = self.graves.len();
        self.graves.retain(|_, grave| grave.buried_at >= horizon);
        before - self.graves.len()
    }
}
