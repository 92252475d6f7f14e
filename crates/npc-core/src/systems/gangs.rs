//! Gang System
//!
//! Runs once per tick after actions resolve. Keeps the registry consistent
//! with who is alive, moves gangs through their lifecycle, founds new gangs
//! around ambitious agents with friends, and lets leaders at social venues
//! pick up followers passively.

use bevy_ecs::prelude::*;
use npc_events::{detail_keys, EventType, SimTimestamp};
use rand::rngs::SmallRng;
use rand::Rng;
use std::collections::BTreeSet;

use crate::components::memory_details;
use crate::components::{
    generate_gang_name, AgentId, AgentIndex, Alive, GangId, GangMembership, GangPhase,
    GangRegistry, MemoryEvent, MemoryKind, MemoryStore, Personality, Position, Relationship,
    SimClock, SimRng, TownMap, Vitals,
};
use crate::config::{GangConfig, Tuning};
use crate::systems::goals::SHUNNED_HOSTILITY;
use crate::systems::memory::PendingMemories;
use crate::systems::resolve::TickEvents;

/// How attractive a leader is to follow, in [0, 1]: ambition, purse and level
pub fn leader_standing(personality: &Personality, vitals: &Vitals) -> f32 {
    let wealth = (vitals.gold as f32 / 100.0).min(1.0);
    let seniority = (vitals.level.saturating_sub(1) as f32 / 9.0).min(1.0);
    (personality.ambition + wealth + seniority) / 3.0
}

/// Probability that `recruit` accepts a leader it feels `toward_leader`
/// about. Zero unless the recruit is loyal enough, likes the leader and
/// does not distrust them.
pub fn recruitment_chance(
    recruit: &Personality,
    toward_leader: &Relationship,
    standing: f32,
    base: f32,
    cfg: &GangConfig,
) -> f32 {
    if recruit.loyalty < cfg.join_min_loyalty
        || toward_leader.friendship <= 0.0
        || toward_leader.trust < 0.0
        || toward_leader.hostility >= SHUNNED_HOSTILITY
    {
        return 0.0;
    }
    let friendship = (toward_leader.friendship / 50.0).clamp(0.0, 1.0);
    (base * (0.5 + recruit.sociability) * friendship * (0.75 + 0.5 * standing)).clamp(0.0, 1.0)
}

/// Emit the event and memories for a new follower
#[allow(clippy::too_many_arguments)]
pub(crate) fn record_joining(
    events: &mut TickEvents,
    memories: &mut PendingMemories,
    ts: SimTimestamp,
    gang_id: &str,
    gang_name: &str,
    recruit: &AgentId,
    leader: &AgentId,
    location: &str,
    reason: &str,
    motivation: Option<&str>,
) {
    let event = events
        .create(ts, EventType::GangJoined)
        .with_participant(recruit.as_str())
        .with_participant(leader.as_str())
        .with_location(location)
        .with_detail(detail_keys::GANG_ID, gang_id)
        .with_detail(detail_keys::GANG_NAME, gang_name)
        .with_detail(detail_keys::LEADER, leader)
        .with_detail(detail_keys::REASON, reason)
        .with_motivation(motivation);
    events.push(event);

    memories.push(
        recruit,
        MemoryEvent::new(MemoryKind::JoinedGang, ts.tick)
            .about(leader.clone())
            .with_detail(memory_details::GANG_ID, gang_id),
    );
    memories.push(
        leader,
        MemoryEvent::new(MemoryKind::JoinedGang, ts.tick)
            .about(recruit.clone())
            .with_detail(memory_details::GANG_ID, gang_id),
    );
    tracing::info!(gang = gang_id, recruit = %recruit, leader = %leader, reason, "gang joined");
}

type GangQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static AgentId,
        &'static Personality,
        &'static MemoryStore,
        &'static Vitals,
        &'static Position,
        &'static Alive,
        &'static mut GangMembership,
    ),
>;

/// What the scan needs to know about a living agent
#[derive(Debug, Clone)]
struct Member {
    entity: Entity,
    id: AgentId,
    personality: Personality,
    vitals: Vitals,
    location: String,
}

/// Update gang lifecycles, founding and passive recruitment
#[allow(clippy::too_many_arguments)]
pub fn update_gangs(
    index: Res<AgentIndex>,
    map: Res<TownMap>,
    clock: Res<SimClock>,
    tuning: Res<Tuning>,
    mut registry: ResMut<GangRegistry>,
    mut rng: ResMut<SimRng>,
    mut tick_events: ResMut<TickEvents>,
    mut memories: ResMut<PendingMemories>,
    mut agents: GangQuery,
) {
    let mut scan = GangScan {
        ts: clock.timestamp(),
        cfg: &tuning.gangs,
        map: &map,
        index: &index,
        registry: &mut registry,
        rng: &mut rng.0,
        events: &mut tick_events,
        memories: &mut memories,
        agents: &mut agents,
    };
    scan.prune_dead_members();
    scan.handle_leader_deaths();
    scan.advance_phases();
    scan.form_new_gangs();
    scan.passive_recruitment();
}

struct GangScan<'a, 'w, 's> {
    ts: SimTimestamp,
    cfg: &'a GangConfig,
    map: &'a TownMap,
    index: &'a AgentIndex,
    registry: &'a mut GangRegistry,
    rng: &'a mut SmallRng,
    events: &'a mut TickEvents,
    memories: &'a mut PendingMemories,
    agents: &'a mut GangQuery<'w, 's>,
}

impl GangScan<'_, '_, '_> {
    fn member(&self, id: &AgentId) -> Option<Member> {
        let entity = self.index.get(id)?;
        let (id, personality, _, vitals, position, alive, _) = self.agents.get(entity).ok()?;
        if !alive.is_alive() {
            return None;
        }
        Some(Member {
            entity,
            id: id.clone(),
            personality: *personality,
            vitals: vitals.clone(),
            location: position.location_id.clone(),
        })
    }

    fn is_alive(&self, id: &AgentId) -> bool {
        self.member(id).is_some()
    }

    /// Living agents in id order
    fn living(&self) -> Vec<Member> {
        self.index
            .iter()
            .filter_map(|(id, _)| self.member(id))
            .collect()
    }

    fn relationship(&self, observer: Entity, subject: &AgentId) -> Relationship {
        self.agents
            .get(observer)
            .map(|(_, _, memory, ..)| memory.get_relationship(subject))
            .unwrap_or_default()
    }

    fn set_membership(&mut self, id: &AgentId, update: impl FnOnce(&mut GangMembership)) {
        let Some(entity) = self.index.get(id) else {
            return;
        };
        if let Ok((.., mut membership)) = self.agents.get_mut(entity) {
            update(&mut *membership);
        }
    }

    fn dissolve(&mut self, gang_id: &str, reason: &str) {
        let Some(gang) = self.registry.disband(gang_id) else {
            return;
        };
        let mut event = self
            .events
            .create(self.ts, EventType::GangDissolved)
            .with_detail(detail_keys::GANG_ID, &gang.id)
            .with_detail(detail_keys::GANG_NAME, &gang.name)
            .with_detail(detail_keys::LEADER, &gang.leader)
            .with_detail(detail_keys::REASON, reason);
        for agent in gang.everyone() {
            event = event.with_participant(agent.as_str());
        }
        self.events.push(event);
        for agent in gang.everyone() {
            self.set_membership(agent, GangMembership::leave);
        }
        tracing::info!(gang = gang_id, name = %gang.name, reason, "gang dissolved");
    }

    fn prune_dead_members(&mut self) {
        for gang_id in self.registry.ids() {
            let Some(gang) = self.registry.get(&gang_id) else {
                continue;
            };
            let dead: Vec<AgentId> = gang
                .members
                .iter()
                .filter(|m| !self.is_alive(m))
                .cloned()
                .collect();
            for member in dead {
                if let Err(err) = self.registry.remove_member(&gang_id, &member) {
                    tracing::warn!(%err, "could not remove dead member");
                }
                self.set_membership(&member, GangMembership::leave);
                tracing::debug!(gang = %gang_id, member = %member, "dead member removed");
            }
        }
    }

    /// A gang whose leader died passes to its most standing ambitious
    /// member, or dissolves when nobody qualifies.
    fn handle_leader_deaths(&mut self) {
        for gang_id in self.registry.ids() {
            let Some(gang) = self.registry.get(&gang_id) else {
                continue;
            };
            if self.is_alive(&gang.leader) {
                continue;
            }
            let previous = gang.leader.clone();
            let name = gang.name.clone();
            let members = gang.members.clone();

            let mut heir: Option<(Member, f32)> = None;
            for candidate in members.iter().filter_map(|m| self.member(m)) {
                if candidate.personality.ambition < self.cfg.succession_min_ambition {
                    continue;
                }
                let standing = leader_standing(&candidate.personality, &candidate.vitals);
                if heir.as_ref().map_or(true, |(_, best)| standing > *best) {
                    heir = Some((candidate, standing));
                }
            }

            let Some((heir, _)) = heir else {
                self.dissolve(&gang_id, "leader_died");
                continue;
            };
            match self.registry.promote(&gang_id, &heir.id) {
                Ok(_) => {
                    self.set_membership(&previous, GangMembership::leave);
                    self.set_membership(&heir.id, |m| m.lead(gang_id.clone()));
                    let event = self
                        .events
                        .create(self.ts, EventType::GangSuccession)
                        .with_participant(heir.id.as_str())
                        .with_participant(previous.as_str())
                        .with_location(heir.location.as_str())
                        .with_detail(detail_keys::GANG_ID, &gang_id)
                        .with_detail(detail_keys::GANG_NAME, &name)
                        .with_detail(detail_keys::LEADER, &heir.id)
                        .with_detail(detail_keys::PREVIOUS_LEADER, &previous);
                    self.events.push(event);
                    tracing::info!(gang = %gang_id, leader = %heir.id, previous = %previous, "gang succession");
                }
                Err(err) => {
                    tracing::warn!(%err, "succession failed");
                    self.dissolve(&gang_id, "leader_died");
                }
            }
        }
    }

    fn advance_phases(&mut self) {
        let tick = self.ts.tick;
        for gang_id in self.registry.ids() {
            let Some(gang) = self.registry.get(&gang_id) else {
                continue;
            };
            let phase = gang.phase;
            let formed_at = gang.formed_at;
            let enough = gang.follower_count() >= self.cfg.min_members;

            match phase {
                GangPhase::Forming if enough => {
                    self.registry.set_phase(&gang_id, GangPhase::Established);
                    tracing::info!(gang = %gang_id, "gang established");
                }
                GangPhase::Forming
                    if tick.saturating_sub(formed_at) >= self.cfg.forming_timeout_ticks =>
                {
                    self.dissolve(&gang_id, "failed_to_form");
                }
                GangPhase::Established if !enough => {
                    self.registry
                        .set_phase(&gang_id, GangPhase::Dissolving { since: tick });
                    tracing::debug!(gang = %gang_id, "gang below minimum size");
                }
                GangPhase::Dissolving { .. } if enough => {
                    self.registry.set_phase(&gang_id, GangPhase::Established);
                }
                GangPhase::Dissolving { since }
                    if tick.saturating_sub(since) >= self.cfg.dissolve_grace_ticks =>
                {
                    self.dissolve(&gang_id, "too_few_members");
                }
                _ => {}
            }
        }
    }

    /// Ambitious ungrouped agents found a gang around their best friend.
    /// At most one new gang per location per scan, and never where a
    /// forming gang or a liked recruiting leader is already present.
    fn form_new_gangs(&mut self) {
        let living = self.living();
        let mut claimed: BTreeSet<String> = BTreeSet::new();

        for candidate in &living {
            if candidate.personality.ambition < self.cfg.leader_min_ambition
                || self.registry.is_member(&candidate.id)
                || claimed.contains(&candidate.location)
            {
                continue;
            }

            let absorbed = self.registry.iter().any(|gang| {
                let Some(leader) = living.iter().find(|m| m.id == gang.leader) else {
                    return false;
                };
                leader.location == candidate.location
                    && (gang.phase == GangPhase::Forming
                        || (gang.has_room(self.cfg.max_members)
                            && self.relationship(candidate.entity, &gang.leader).friendship
                                >= self.cfg.follower_min_friendship))
            });
            if absorbed {
                continue;
            }

            let mut follower: Option<(&Member, f32)> = None;
            for other in living.iter().filter(|m| {
                m.id != candidate.id
                    && m.location == candidate.location
                    && m.personality.loyalty >= self.cfg.join_min_loyalty
                    && !self.registry.is_member(&m.id)
            }) {
                let rel = self.relationship(other.entity, &candidate.id);
                if rel.friendship < self.cfg.follower_min_friendship
                    || rel.trust < self.cfg.follower_min_trust
                    || rel.hostility >= SHUNNED_HOSTILITY
                {
                    continue;
                }
                if follower.map_or(true, |(_, best)| rel.friendship > best) {
                    follower = Some((other, rel.friendship));
                }
            }
            let Some((follower, _)) = follower else {
                continue;
            };

            if self.rng.gen::<f32>() >= self.cfg.formation_chance * candidate.personality.ambition {
                continue;
            }

            let name = generate_gang_name(&mut *self.rng);
            let gang_id = match self
                .registry
                .create(candidate.id.clone(), name.as_str(), self.ts.tick)
            {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(%err, "gang formation failed");
                    continue;
                }
            };
            claimed.insert(candidate.location.clone());
            self.set_membership(&candidate.id, |m| m.lead(gang_id.clone()));

            let event = self
                .events
                .create(self.ts, EventType::GangFormed)
                .with_participant(candidate.id.as_str())
                .with_participant(follower.id.as_str())
                .with_location(candidate.location.as_str())
                .with_detail(detail_keys::GANG_ID, &gang_id)
                .with_detail(detail_keys::GANG_NAME, &name)
                .with_detail(detail_keys::LEADER, &candidate.id);
            self.events.push(event);
            tracing::info!(gang = %gang_id, %name, leader = %candidate.id, "gang formed");

            match self
                .registry
                .add_member(&gang_id, follower.id.clone(), self.cfg.max_members)
            {
                Ok(()) => {
                    self.set_membership(&follower.id, |m| m.join(gang_id.clone()));
                    record_joining(
                        self.events,
                        self.memories,
                        self.ts,
                        &gang_id,
                        &name,
                        &follower.id,
                        &candidate.id,
                        &candidate.location,
                        "founding",
                        None,
                    );
                }
                Err(err) => tracing::warn!(%err, "founding member could not join"),
            }
        }
    }

    /// Leaders with room at a social venue draw in loyal, friendly company
    fn passive_recruitment(&mut self) {
        for gang_id in self.registry.ids() {
            let Some(gang) = self.registry.get(&gang_id) else {
                continue;
            };
            if !gang.has_room(self.cfg.max_members) {
                continue;
            }
            let name = gang.name.clone();
            let Some(leader) = self.member(&gang.leader) else {
                continue;
            };
            if !self.map.is_social_venue(&leader.location) {
                continue;
            }
            let standing = leader_standing(&leader.personality, &leader.vitals);

            let prospects: Vec<Member> = self
                .living()
                .into_iter()
                .filter(|m| m.location == leader.location && !self.registry.is_member(&m.id))
                .collect();
            for prospect in prospects {
                let has_room = self
                    .registry
                    .get(&gang_id)
                    .is_some_and(|g| g.has_room(self.cfg.max_members));
                if !has_room {
                    break;
                }
                let rel = self.relationship(prospect.entity, &leader.id);
                let chance = recruitment_chance(
                    &prospect.personality,
                    &rel,
                    standing,
                    self.cfg.passive_recruit_chance,
                    self.cfg,
                );
                if chance <= 0.0 || self.rng.gen::<f32>() >= chance {
                    continue;
                }
                match self
                    .registry
                    .add_member(&gang_id, prospect.id.clone(), self.cfg.max_members)
                {
                    Ok(()) => {
                        self.set_membership(&prospect.id, |m| m.join(gang_id.clone()));
                        record_joining(
                            self.events,
                            self.memories,
                            self.ts,
                            &gang_id,
                            &name,
                            &prospect.id,
                            &leader.id,
                            &leader.location,
                            "passive",
                            None,
                        );
                    }
                    Err(err) => tracing::warn!(%err, "passive recruitment failed"),
                }
            }
        }
    }
}
