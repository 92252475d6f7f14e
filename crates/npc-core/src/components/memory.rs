//! Memory Store
//!
//! Each agent keeps an append-only log of what happened to it. Relationship
//! scalars toward every other agent are a fold of the retained events about
//! that agent, weighted by the owner's personality, and are cached so that
//! lookups stay O(1).

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::agent::AgentId;
use super::personality::Personality;

/// Kinds of remembered events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    WasHelped,
    Helped,
    WasAttacked,
    LostTo,
    WonAgainst,
    SharedSocialActivity,
    WasBetrayed,
    Betrayed,
    Traded,
    WitnessedAttack,
    JoinedGang,
    RejectedBy,
}

impl MemoryKind {
    /// Events that can start a grudge.
    pub fn is_grievance(&self) -> bool {
        matches!(
            self,
            MemoryKind::WasAttacked | MemoryKind::LostTo | MemoryKind::WasBetrayed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::WasHelped => "was_helped",
            MemoryKind::Helped => "helped",
            MemoryKind::WasAttacked => "was_attacked",
            MemoryKind::LostTo => "lost_to",
            MemoryKind::WonAgainst => "won_against",
            MemoryKind::SharedSocialActivity => "shared_social_activity",
            MemoryKind::WasBetrayed => "was_betrayed",
            MemoryKind::Betrayed => "betrayed",
            MemoryKind::Traded => "traded",
            MemoryKind::WitnessedAttack => "witnessed_attack",
            MemoryKind::JoinedGang => "joined_gang",
            MemoryKind::RejectedBy => "rejected_by",
        }
    }
}

/// Detail keys used on memory events
pub mod memory_details {
    /// Combat role of the owner: `attacker`, `defender` or `ally`
    pub const ROLE: &str = "role";
    pub const ROLE_ATTACKER: &str = "attacker";
    pub const ROLE_DEFENDER: &str = "defender";
    pub const ROLE_ALLY: &str = "ally";
    pub const AMOUNT: &str = "amount";
    pub const VICTIM: &str = "victim";
    pub const GANG_ID: &str = "gang_id";
}

/// A single remembered event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub kind: MemoryKind,
    /// The other agent involved, if any
    pub other: Option<AgentId>,
    pub tick: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl MemoryEvent {
    pub fn new(kind: MemoryKind, tick: u64) -> Self {
        Self {
            kind,
            other: None,
            tick,
            details: BTreeMap::new(),
        }
    }

    /// Builder: set the other agent
    pub fn about(mut self, other: AgentId) -> Self {
        self.other = Some(other);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    pub fn is_about(&self, agent: &AgentId) -> bool {
        self.other.as_ref() == Some(agent)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.detail(memory_details::ROLE) == Some(role)
    }
}

/// Relationship constants
pub mod relationship_weights {
    pub const SCALE_MIN: f32 = -100.0;
    pub const SCALE_MAX: f32 = 100.0;
    pub const HOSTILITY_MAX: f32 = 100.0;
    /// Trust after a betrayal; positive trust changes are ignored afterwards
    pub const BETRAYAL_TRUST_FLOOR: f32 = -100.0;

    pub const HELPED_FRIENDSHIP: f32 = 10.0;
    pub const HELPED_TRUST: f32 = 8.0;
    pub const SOCIAL_FRIENDSHIP: f32 = 5.0;
    pub const SOCIAL_TRUST: f32 = 3.0;
    pub const TRADE_FRIENDSHIP: f32 = 2.0;
    pub const TRADE_TRUST: f32 = 2.0;
    pub const JOINED_FRIENDSHIP: f32 = 5.0;
    pub const JOINED_TRUST: f32 = 10.0;
    pub const GAVE_HELP_FRIENDSHIP: f32 = 2.0;
    pub const ALLY_FRIENDSHIP: f32 = 6.0;
    pub const ALLY_TRUST: f32 = 4.0;
    pub const OPPONENT_HOSTILITY: f32 = 2.0;

    pub const ATTACKED_HOSTILITY: f32 = 15.0;
    pub const ATTACKED_TRUST: f32 = -10.0;
    pub const ATTACKED_FRIENDSHIP: f32 = -5.0;
    pub const LOST_HOSTILITY: f32 = 10.0;
    pub const LOST_TRUST: f32 = -5.0;
    pub const LOST_FRIENDSHIP: f32 = -3.0;
    pub const WITNESSED_TRUST: f32 = -2.0;
    pub const REJECTED_FRIENDSHIP: f32 = -3.0;
    pub const REJECTED_HOSTILITY: f32 = 2.0;
    pub const BETRAYED_HOSTILITY: f32 = 30.0;
    pub const BETRAYED_FRIENDSHIP: f32 = -30.0;
    pub const GUILT_FRIENDSHIP: f32 = -5.0;
}

/// Personality factors that shape how events are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipWeights {
    /// Multiplier on friendship gains
    pub warmth: f32,
    /// Multiplier on trust gains
    pub faith: f32,
    /// Multiplier on hostility and trust losses from harm
    pub rancor: f32,
}

impl RelationshipWeights {
    pub fn from_personality(personality: &Personality) -> Self {
        Self {
            warmth: 0.5 + personality.sociability,
            faith: 0.5 + personality.loyalty,
            rancor: 0.5 + personality.vengefulness,
        }
    }
}

impl Default for RelationshipWeights {
    fn default() -> Self {
        Self::from_personality(&Personality::default())
    }
}

/// Derived relationship toward one other agent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationship {
    pub friendship: f32,
    pub trust: f32,
    pub hostility: f32,
    /// Set once a betrayal by this agent is remembered
    pub betrayed: bool,
    pub interactions: u32,
    pub last_tick: u64,
}

impl Relationship {
    fn adjust_friendship(&mut self, delta: f32) {
        use relationship_weights::*;
        self.friendship = (self.friendship + delta).clamp(SCALE_MIN, SCALE_MAX);
    }

    fn adjust_trust(&mut self, delta: f32) {
        use relationship_weights::*;
        if self.betrayed && delta > 0.0 {
            return;
        }
        self.trust = (self.trust + delta).clamp(SCALE_MIN, SCALE_MAX);
    }

    fn adjust_hostility(&mut self, delta: f32) {
        use relationship_weights::*;
        self.hostility = (self.hostility + delta).clamp(0.0, HOSTILITY_MAX);
    }

    /// Fold one event into the record.
    pub fn apply(&mut self, event: &MemoryEvent, weights: &RelationshipWeights) {
        use relationship_weights::*;

        self.interactions += 1;
        self.last_tick = self.last_tick.max(event.tick);

        match event.kind {
            MemoryKind::WasHelped => {
                self.adjust_friendship(HELPED_FRIENDSHIP * weights.warmth);
                self.adjust_trust(HELPED_TRUST * weights.faith);
            }
            MemoryKind::Helped => {
                self.adjust_friendship(GAVE_HELP_FRIENDSHIP);
            }
            MemoryKind::SharedSocialActivity => {
                self.adjust_friendship(SOCIAL_FRIENDSHIP * weights.warmth);
                self.adjust_trust(SOCIAL_TRUST * weights.faith);
            }
            MemoryKind::Traded => {
                self.adjust_friendship(TRADE_FRIENDSHIP);
                self.adjust_trust(TRADE_TRUST * weights.faith);
            }
            MemoryKind::JoinedGang => {
                self.adjust_friendship(JOINED_FRIENDSHIP);
                self.adjust_trust(JOINED_TRUST * weights.faith);
            }
            MemoryKind::WonAgainst if event.has_role(memory_details::ROLE_ALLY) => {
                self.adjust_friendship(ALLY_FRIENDSHIP * weights.warmth);
                self.adjust_trust(ALLY_TRUST * weights.faith);
            }
            MemoryKind::WonAgainst => {
                self.adjust_hostility(OPPONENT_HOSTILITY);
            }
            MemoryKind::WasAttacked => {
                self.adjust_hostility(ATTACKED_HOSTILITY * weights.rancor);
                self.adjust_trust(ATTACKED_TRUST * weights.rancor);
                self.adjust_friendship(ATTACKED_FRIENDSHIP);
            }
            MemoryKind::LostTo => {
                self.adjust_hostility(LOST_HOSTILITY * weights.rancor);
                self.adjust_trust(LOST_TRUST * weights.rancor);
                self.adjust_friendship(LOST_FRIENDSHIP);
            }
            MemoryKind::WitnessedAttack => {
                self.adjust_trust(WITNESSED_TRUST);
            }
            MemoryKind::RejectedBy => {
                self.adjust_friendship(REJECTED_FRIENDSHIP);
                self.adjust_hostility(REJECTED_HOSTILITY);
            }
            MemoryKind::WasBetrayed => {
                self.trust = BETRAYAL_TRUST_FLOOR;
                self.betrayed = true;
                self.adjust_hostility(BETRAYED_HOSTILITY * weights.rancor);
                self.adjust_friendship(BETRAYED_FRIENDSHIP);
            }
            MemoryKind::Betrayed => {
                self.adjust_friendship(GUILT_FRIENDSHIP);
            }
        }
    }

    pub fn is_hostile(&self, threshold: f32) -> bool {
        self.hostility >= threshold
    }
}

/// Component: an agent's episodic memory
#[derive(Component, Debug, Clone, Default)]
pub struct MemoryStore {
    weights: RelationshipWeights,
    events: Vec<MemoryEvent>,
    relationships: HashMap<AgentId, Relationship>,
}

impl MemoryStore {
    pub fn new(personality: &Personality) -> Self {
        Self {
            weights: RelationshipWeights::from_personality(personality),
            events: Vec::new(),
            relationships: HashMap::new(),
        }
    }

    pub fn weights(&self) -> &RelationshipWeights {
        &self.weights
    }

    /// Append an event and update the cached relationship it touches.
    pub fn record_event(&mut self, event: MemoryEvent) {
        if let Some(other) = &event.other {
            self.relationships
                .entry(other.clone())
                .or_default()
                .apply(&event, &self.weights);
        }
        self.events.push(event);
    }

    /// Events about `other`, newest first
    pub fn get_memories_about(&self, other: &AgentId) -> Vec<&MemoryEvent> {
        self.events.iter().rev().filter(|e| e.is_about(other)).collect()
    }

    /// Relationship toward `other`; all zeros when nothing is remembered
    pub fn get_relationship(&self, other: &AgentId) -> Relationship {
        self.relationships.get(other).copied().unwrap_or_default()
    }

    /// All retained events in the order they were recorded
    pub fn get_all_memories(&self) -> &[MemoryEvent] {
        &self.events
    }

    /// Events recorded strictly after `tick`
    pub fn events_since(&self, tick: u64) -> impl Iterator<Item = &MemoryEvent> {
        self.events.iter().filter(move |e| e.tick > tick)
    }

    /// Count events of a kind about `other` at or after `since`
    pub fn count_about_since(&self, other: &AgentId, kind: MemoryKind, since: u64) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == kind && e.tick >= since && e.is_about(other))
            .count()
    }

    /// Count events of a kind at or after `since`, regardless of subject
    pub fn count_since(&self, kind: MemoryKind, since: u64) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == kind && e.tick >= since)
            .count()
    }

    /// Agents this store holds a relationship toward, in id order
    pub fn known_agents(&self) -> Vec<&AgentId> {
        let mut ids: Vec<&AgentId> = self.relationships.keys().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop events older than `horizon`, keeping the latest betrayal by
    /// each agent so the trust floor survives. Relationships are rebuilt
    /// from what remains. Returns the number of events removed.
    pub fn prune_older_than(&mut self, horizon: u64) -> usize {
        if self.events.iter().all(|e| e.tick >= horizon) {
            return 0;
        }

        let mut keep_betrayal: BTreeMap<&AgentId, usize> = BTreeMap::new();
        for (i, event) in self.events.iter().enumerate() {
            if event.kind == MemoryKind::WasBetrayed {
                if let Some(other) = &event.other {
                    keep_betrayal.insert(other, i);
                }
            }
        }
        let protected: BTreeSet<usize> = keep_betrayal.into_values().collect();

        let before = self.events.len();
        let retained: Vec<MemoryEvent> = std::mem::take(&mut self.events)
            .into_iter()
            .enumerate()
            .filter(|(i, e)| e.tick >= horizon || protected.contains(i))
            .map(|(_, e)| e)
            .collect();
        let removed = before - retained.len();

        self.relationships.clear();
        for event in retained {
            self.record_event(event);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AgentId {
        AgentId::from(s)
    }

    fn store() -> MemoryStore {
        MemoryStore::new(&Personality::default())
    }

    #[test]
    fn test_unknown_agent_has_neutral_relationship() {
        let store = store();
        let rel = store.get_relationship(&id("npc_0009"));
        assert_eq!(rel, Relationship::default());
    }

    #[test]
    fn test_help_builds_friendship_and_trust() {
        let mut store = store();
        store.record_event(MemoryEvent::new(MemoryKind::WasHelped, 3).about(id("npc_0002")));
        let rel = store.get_relationship(&id("npc_0002"));
        assert_eq!(rel.friendship, 10.0);
        assert_eq!(rel.trust, 8.0);
        assert_eq!(rel.hostility, 0.0);
    }

    #[test]
    fn test_sociable_agents_warm_up_faster() {
        let mut shy = MemoryStore::new(&Personality::default().with_sociability(0.0));
        let mut warm = MemoryStore::new(&Personality::default().with_sociability(1.0));
        for store in [&mut shy, &mut warm] {
            store.record_event(
                MemoryEvent::new(MemoryKind::SharedSocialActivity, 1).about(id("npc_0002")),
            );
        }
        assert!(
            warm.get_relationship(&id("npc_0002")).friendship
                > shy.get_relationship(&id("npc_0002")).friendship
        );
    }

    #[test]
    fn test_attack_and_loss_accumulate_hostility() {
        let mut store = store();
        let aggressor = id("npc_0005");
        store.record_event(MemoryEvent::new(MemoryKind::WasAttacked, 10).about(aggressor.clone()));
        store.record_event(MemoryEvent::new(MemoryKind::LostTo, 10).about(aggressor.clone()));
        let rel = store.get_relationship(&aggressor);
        assert_eq!(rel.hostility, 25.0);
        assert!(rel.trust < 0.0);
        assert!(rel.friendship < 0.0);
    }

    #[test]
    fn test_betrayal_pins_trust_to_floor() {
        let mut store = store();
        let traitor = id("npc_0007");
        for tick in 0..20 {
            store.record_event(
                MemoryEvent::new(MemoryKind::SharedSocialActivity, tick).about(traitor.clone()),
            );
        }
        assert!(store.get_relationship(&traitor).trust > 50.0);

        store.record_event(MemoryEvent::new(MemoryKind::WasBetrayed, 21).about(traitor.clone()));
        for tick in 22..40 {
            store.record_event(MemoryEvent::new(MemoryKind::WasHelped, tick).about(traitor.clone()));
        }
        let rel = store.get_relationship(&traitor);
        assert_eq!(rel.trust, relationship_weights::BETRAYAL_TRUST_FLOOR);
        assert!(rel.betrayed);
        // Friendship may recover; trust may not
        assert!(rel.friendship > -30.0);
    }

    #[test]
    fn test_ally_victory_is_positive_but_opponent_victory_is_not() {
        let mut store = store();
        store.record_event(
            MemoryEvent::new(MemoryKind::WonAgainst, 4)
                .about(id("npc_0002"))
                .with_detail(memory_details::ROLE, memory_details::ROLE_ALLY),
        );
        store.record_event(
            MemoryEvent::new(MemoryKind::WonAgainst, 4)
                .about(id("npc_0003"))
                .with_detail(memory_details::ROLE, memory_details::ROLE_ATTACKER),
        );
        assert!(store.get_relationship(&id("npc_0002")).friendship > 0.0);
        assert_eq!(store.get_relationship(&id("npc_0003")).friendship, 0.0);
        assert_eq!(store.get_relationship(&id("npc_0003")).hostility, 2.0);
    }

    #[test]
    fn test_memories_about_are_newest_first() {
        let mut store = store();
        let other = id("npc_0002");
        store.record_event(MemoryEvent::new(MemoryKind::Traded, 1).about(other.clone()));
        store.record_event(MemoryEvent::new(MemoryKind::Traded, 2).about(id("npc_0003")));
        store.record_event(MemoryEvent::new(MemoryKind::WasHelped, 5).about(other.clone()));
        let ticks: Vec<u64> = store.get_memories_about(&other).iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![5, 1]);
        assert_eq!(store.get_all_memories().len(), 3);
    }

    #[test]
    fn test_events_since_and_counts() {
        let mut store = store();
        let other = id("npc_0002");
        for tick in [1, 4, 8] {
            store.record_event(MemoryEvent::new(MemoryKind::RejectedBy, tick).about(other.clone()));
        }
        assert_eq!(store.events_since(4).count(), 1);
        assert_eq!(store.count_about_since(&other, MemoryKind::RejectedBy, 4), 2);
        assert_eq!(store.count_since(MemoryKind::RejectedBy, 0), 3);
    }

    #[test]
    fn test_prune_keeps_latest_betrayal() {
        let mut store = store();
        let traitor = id("npc_0007");
        let friend = id("npc_0008");
        store.record_event(MemoryEvent::new(MemoryKind::WasBetrayed, 2).about(traitor.clone()));
        store.record_event(MemoryEvent::new(MemoryKind::WasHelped, 3).about(friend.clone()));
        store.record_event(MemoryEvent::new(MemoryKind::WasBetrayed, 5).about(traitor.clone()));
        store.record_event(MemoryEvent::new(MemoryKind::Traded, 50).about(friend.clone()));

        let removed = store.prune_older_than(40);
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 2);

        let kept: Vec<(MemoryKind, u64)> =
            store.get_all_memories().iter().map(|e| (e.kind, e.tick)).collect();
        assert_eq!(kept, vec![(MemoryKind::WasBetrayed, 5), (MemoryKind::Traded, 50)]);

        assert_eq!(store.get_relationship(&traitor).trust, relationship_weights::BETRAYAL_TRUST_FLOOR);
        // The old help is gone, only the trade remains
        assert_eq!(store.get_relationship(&friend).friendship, 2.0);
    }

    #[test]
    fn test_prune_with_nothing_old_is_noop() {
        let mut store = store();
        store.record_event(MemoryEvent::new(MemoryKind::Traded, 50).about(id("npc_0002")));
        assert_eq!(store.prune_older_than(10), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_known_agents_sorted() {
        let mut store = store();
        for other in ["npc_0009", "npc_0001", "npc_0004"] {
            store.record_event(MemoryEvent::new(MemoryKind::Traded, 1).about(id(other)));
        }
        let known: Vec<&str> = store.known_agents().iter().map(|a| a.as_str()).collect();
        assert_eq!(known, vec!["npc_0001", "npc_0004", "npc_0009"]);
    }
}
