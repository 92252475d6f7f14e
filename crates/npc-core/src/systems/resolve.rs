//! Action Resolution System
//!
//! Applies the tick's proposed actions in agent id order. Every action
//! re-checks live state first: a target killed earlier in the tick, or one
//! who walked away, turns the action into a no-op. Resolution emits world
//! events immediately and buffers memories for end-of-tick delivery.

use bevy_ecs::prelude::*;
use npc_events::{detail_keys, generate_event_id, EventType, SimTimestamp, WorldEvent};
use rand::rngs::SmallRng;
use rand::Rng;

use crate::actions::economy::{help_gift, rest_heal, robbery_take, trade_split, wage};
use crate::actions::{Action, ActionKind, CombatResolver, CombatResolverRes, Combatant};
use crate::components::memory_details;
use crate::components::{
    AgentId, AgentIndex, Alive, GangId, GangMembership, GangRegistry, GoalKind, MemoryEvent,
    MemoryKind, MemoryStore, Personality, Position, Relationship, SimClock, SimRng, TownMap,
    Vitals,
};
use crate::config::Tuning;
use crate::systems::brain::ProposedActions;
use crate::systems::gangs::{leader_standing, record_joining, recruitment_chance};
use crate::systems::goals::SHUNNED_HOSTILITY;
use crate::systems::memory::PendingMemories;

/// Resource: events produced during the current tick
#[derive(Resource, Debug, Default)]
pub struct TickEvents {
    events: Vec<WorldEvent>,
    next_sequence: u64,
}

impl TickEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an event with the next unique id
    pub fn create(&mut self, timestamp: SimTimestamp, event_type: EventType) -> WorldEvent {
        let id = generate_event_id(self.next_sequence);
        self.next_sequence += 1;
        WorldEvent::new(id, timestamp, event_type)
    }

    pub fn push(&mut self, event: WorldEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn as_slice(&self) -> &[WorldEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub(crate) type AgentQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static AgentId,
        &'static Personality,
        &'static MemoryStore,
        &'static mut Vitals,
        &'static mut Position,
        &'static mut Alive,
        &'static mut GangMembership,
    ),
>;

/// Live snapshot of one party to an action
#[derive(Debug, Clone)]
struct Party {
    entity: Entity,
    id: AgentId,
    personality: Personality,
    vitals: Vitals,
    location: String,
    gang: Option<GangId>,
}

/// Apply every proposed action, in agent id order
#[allow(clippy::too_many_arguments)]
pub fn resolve_actions(
    index: Res<AgentIndex>,
    map: Res<TownMap>,
    clock: Res<SimClock>,
    tuning: Res<Tuning>,
    resolver: Res<CombatResolverRes>,
    proposed: Res<ProposedActions>,
    mut gangs: ResMut<GangRegistry>,
    mut rng: ResMut<SimRng>,
    mut tick_events: ResMut<TickEvents>,
    mut memories: ResMut<PendingMemories>,
    mut agents: AgentQuery,
) {
    let mut resolution = Resolution {
        ts: clock.timestamp(),
        tuning: &tuning,
        map: &map,
        index: &index,
        resolver: resolver.0.as_ref(),
        gangs: &mut gangs,
        rng: &mut rng.0,
        events: &mut tick_events,
        memories: &mut memories,
        agents: &mut agents,
    };
    for (actor, action) in proposed.as_slice() {
        resolution.apply(actor, action);
    }
}

struct Resolution<'a, 'w, 's> {
    ts: SimTimestamp,
    tuning: &'a Tuning,
    map: &'a TownMap,
    index: &'a AgentIndex,
    resolver: &'a dyn CombatResolver,
    gangs: &'a mut GangRegistry,
    rng: &'a mut SmallRng,
    events: &'a mut TickEvents,
    memories: &'a mut PendingMemories,
    agents: &'a mut AgentQuery<'w, 's>,
}

impl Resolution<'_, '_, '_> {
    fn party(&self, id: &AgentId) -> Option<Party> {
        let entity = self.index.get(id)?;
        let (id, personality, _, vitals, position, alive, membership) =
            self.agents.get(entity).ok()?;
        if !alive.is_alive() {
            return None;
        }
        Some(Party {
            entity,
            id: id.clone(),
            personality: *personality,
            vitals: vitals.clone(),
            location: position.location_id.clone(),
            gang: membership.gang.clone(),
        })
    }

    /// A living party at the actor's location
    fn counterpart(&self, actor: &Party, id: &AgentId) -> Option<Party> {
        if *id == actor.id {
            return None;
        }
        self.party(id).filter(|other| other.location == actor.location)
    }

    fn relationship(&self, observer: Entity, subject: &AgentId) -> Relationship {
        self.agents
            .get(observer)
            .map(|(_, _, memory, ..)| memory.get_relationship(subject))
            .unwrap_or_default()
    }

    fn with_vitals<R>(&mut self, entity: Entity, update: impl FnOnce(&mut Vitals) -> R) -> Option<R> {
        let (_, _, _, mut vitals, ..) = self.agents.get_mut(entity).ok()?;
        Some(update(&mut *vitals))
    }

    fn remember(&mut self, recipient: &AgentId, event: MemoryEvent) {
        self.memories.push(recipient, event);
    }

    fn apply(&mut self, actor_id: &AgentId, action: &Action) {
        // Killed earlier this tick
        let Some(actor) = self.party(actor_id) else {
            return;
        };
        let tag = action.motivation_tag();
        match &action.kind {
            ActionKind::Attack { target } => self.attack(&actor, target, action.motivation),
            ActionKind::Recruit { target } => self.recruit(&actor, target, tag),
            ActionKind::RequestMembership { leader } => {
                self.request_membership(&actor, leader, tag)
            }
            ActionKind::Trade { partner } => self.trade(&actor, partner, tag),
            ActionKind::Socialize { partner } => self.socialize(&actor, partner, tag),
            ActionKind::Help { target } => self.help(&actor, target, tag),
            ActionKind::Work => self.work(&actor, tag),
            ActionKind::Shop => self.shop(&actor, tag),
            ActionKind::Rest => self.rest(&actor),
            ActionKind::Travel { destination } => self.travel(&actor, destination, tag),
        }
    }

    fn attack(&mut self, attacker: &Party, target: &AgentId, motive: Option<GoalKind>) {
        let tag = motive.map(|g| g.motivation_tag());
        let Some(defender) = self.counterpart(attacker, target) else {
            tracing::debug!(attacker = %attacker.id, target = %target, "attack target out of reach");
            return;
        };

        // Judged on the relationship before the blow lands
        let defender_view = self.relationship(defender.entity, &attacker.id);
        let betrayal = defender_view.trust >= self.tuning.combat.betrayal_trust_threshold
            || (attacker.gang.is_some() && attacker.gang == defender.gang);

        let outcome = self.resolver.resolve_combat(
            &Combatant::new(attacker.id.clone(), &attacker.vitals, &attacker.personality),
            &Combatant::new(defender.id.clone(), &defender.vitals, &defender.personality),
            &mut *self.rng,
        );
        let attacker_won = outcome.winner == attacker.id && outcome.loser == defender.id;
        let defender_won = outcome.winner == defender.id && outcome.loser == attacker.id;
        if !attacker_won && !defender_won {
            tracing::warn!(
                winner = %outcome.winner,
                loser = %outcome.loser,
                "combat resolver named agents outside the fight"
            );
            return;
        }
        let (winner, loser) = if attacker_won {
            (attacker, &defender)
        } else {
            (&defender, attacker)
        };
        let (winner_role, loser_role) = if attacker_won {
            (memory_details::ROLE_ATTACKER, memory_details::ROLE_DEFENDER)
        } else {
            (memory_details::ROLE_DEFENDER, memory_details::ROLE_ATTACKER)
        };

        let damage = outcome.damage.max(0);
        let killed = self
            .with_vitals(loser.entity, |v| v.take_damage(damage))
            .unwrap_or(false);
        if killed {
            if let Ok((.., mut alive, _)) = self.agents.get_mut(loser.entity) {
                alive.kill();
            }
        }

        let combat = self.tuning.combat.clone();
        let levels = self
            .with_vitals(winner.entity, |v| {
                v.gain_xp(combat.xp_per_win, combat.xp_per_level, combat.hp_per_level)
            })
            .unwrap_or(0);
        if levels > 0 {
            tracing::debug!(agent = %winner.id, levels, "level up");
        }

        let stolen = if attacker_won && motive == Some(GoalKind::AccumulateWealth) {
            let share = self.tuning.economy.robbery_share;
            let taken = self
                .with_vitals(defender.entity, |v| v.take_gold(robbery_take(v.gold, share)))
                .unwrap_or(0);
            self.with_vitals(attacker.entity, |v| v.gold += taken);
            taken
        } else {
            0
        };

        let mut event = self
            .events
            .create(self.ts, EventType::Combat)
            .with_participant(attacker.id.as_str())
            .with_participant(defender.id.as_str())
            .with_location(attacker.location.as_str())
            .with_detail(detail_keys::ATTACKER, &attacker.id)
            .with_detail(detail_keys::DEFENDER, &defender.id)
            .with_detail(detail_keys::WINNER, &winner.id)
            .with_detail(detail_keys::LOSER, &loser.id)
            .with_detail(detail_keys::DAMAGE, damage)
            .with_detail(detail_keys::KILLED, killed)
            .with_motivation(tag);
        if stolen > 0 {
            event = event.with_detail(detail_keys::GOLD_STOLEN, stolen);
        }
        self.events.push(event);

        let tick = self.ts.tick;
        self.remember(
            &defender.id,
            MemoryEvent::new(MemoryKind::WasAttacked, tick).about(attacker.id.clone()),
        );
        self.remember(
            &winner.id,
            MemoryEvent::new(MemoryKind::WonAgainst, tick)
                .about(loser.id.clone())
                .with_detail(memory_details::ROLE, winner_role),
        );
        self.remember(
            &loser.id,
            MemoryEvent::new(MemoryKind::LostTo, tick)
                .about(winner.id.clone())
                .with_detail(memory_details::ROLE, loser_role),
        );

        if betrayal {
            self.remember(
                &defender.id,
                MemoryEvent::new(MemoryKind::WasBetrayed, tick).about(attacker.id.clone()),
            );
            self.remember(
                &attacker.id,
                MemoryEvent::new(MemoryKind::Betrayed, tick).about(defender.id.clone()),
            );
            let event = self
                .events
                .create(self.ts, EventType::Betrayal)
                .with_participant(attacker.id.as_str())
                .with_participant(defender.id.as_str())
                .with_location(attacker.location.as_str())
                .with_motivation(tag);
            self.events.push(event);
            tracing::info!(traitor = %attacker.id, victim = %defender.id, "betrayal");
        }

        let bystanders: Vec<Party> = self
            .index
            .iter()
            .filter(|(id, _)| **id != attacker.id && **id != defender.id)
            .filter_map(|(id, _)| self.party(id))
            .filter(|p| p.location == attacker.location)
            .collect();
        for witness in bystanders {
            let memory = if winner.gang.is_some() && witness.gang == winner.gang {
                MemoryEvent::new(MemoryKind::WonAgainst, tick)
                    .about(winner.id.clone())
                    .with_detail(memory_details::ROLE, memory_details::ROLE_ALLY)
                    .with_detail(memory_details::VICTIM, &loser.id)
            } else {
                MemoryEvent::new(MemoryKind::WitnessedAttack, tick)
                    .about(attacker.id.clone())
                    .with_detail(memory_details::VICTIM, &defender.id)
            };
            self.remember(&witness.id, memory);
        }

        if killed {
            let event = self
                .events
                .create(self.ts, EventType::Death)
                .with_participant(loser.id.as_str())
                .with_participant(winner.id.as_str())
                .with_location(attacker.location.as_str())
                .with_detail(detail_keys::WINNER, &winner.id);
            self.events.push(event);
            tracing::info!(agent = %loser.id, killer = %winner.id, "agent killed");
        }
    }

    fn recruit(&mut self, leader: &Party, target: &AgentId, tag: Option<&str>) {
        let cfg = &self.tuning.gangs;
        let Some(gang_id) = leader.gang.clone() else {
            return;
        };
        let Some(gang) = self.gangs.get(&gang_id) else {
            return;
        };
        if gang.leader != leader.id || !gang.has_room(cfg.max_members) {
            return;
        }
        let Some(recruit) = self.counterpart(leader, target) else {
            return;
        };
        if self.gangs.is_member(&recruit.id) {
            return;
        }

        let toward_leader = self.relationship(recruit.entity, &leader.id);
        let standing = leader_standing(&leader.personality, &leader.vitals);
        let chance = recruitment_chance(
            &recruit.personality,
            &toward_leader,
            standing,
            cfg.recruit_chance,
            cfg,
        );
        if self.rng.gen::<f32>() < chance {
            self.admit(&gang_id, &recruit, leader, "recruited", tag);
            return;
        }

        self.reject(&gang_id, &recruit, leader, tag);
        self.remember(
            &leader.id,
            MemoryEvent::new(MemoryKind::RejectedBy, self.ts.tick).about(recruit.id.clone()),
        );
    }

    fn request_membership(&mut self, requester: &Party, leader_id: &AgentId, tag: Option<&str>) {
        let cfg = &self.tuning.gangs;
        if self.gangs.is_member(&requester.id) {
            return;
        }
        let Some(leader) = self.counterpart(requester, leader_id) else {
            return;
        };
        let Some(gang) = self.gangs.gang_of(&leader.id) else {
            return;
        };
        if gang.leader != leader.id || !gang.has_room(cfg.max_members) {
            return;
        }
        let gang_id = gang.id.clone();

        let view = self.relationship(leader.entity, &requester.id);
        let chance = if view.friendship >= 0.0 && view.hostility < SHUNNED_HOSTILITY {
            cfg.request_accept_chance
        } else {
            0.0
        };
        if self.rng.gen::<f32>() < chance {
            self.admit(&gang_id, requester, &leader, "requested", tag);
            return;
        }

        self.reject(&gang_id, requester, &leader, tag);
        self.remember(
            &requester.id,
            MemoryEvent::new(MemoryKind::RejectedBy, self.ts.tick).about(leader.id.clone()),
        );
    }

    fn admit(&mut self, gang_id: &str, recruit: &Party, leader: &Party, reason: &str, tag: Option<&str>) {
        if let Err(err) =
            self.gangs
                .add_member(gang_id, recruit.id.clone(), self.tuning.gangs.max_members)
        {
            tracing::warn!(%err, "gang admission failed");
            return;
        }
        if let Ok((.., mut membership)) = self.agents.get_mut(recruit.entity) {
            membership.join(gang_id);
        }
        let name = self
            .gangs
            .get(gang_id)
            .map(|g| g.name.clone())
            .unwrap_or_default();
        record_joining(
            self.events,
            self.memories,
            self.ts,
            gang_id,
            &name,
            &recruit.id,
            &leader.id,
            &leader.location,
            reason,
            tag,
        );
    }

    fn reject(&mut self, gang_id: &str, recruit: &Party, leader: &Party, tag: Option<&str>) {
        let event = self
            .events
            .create(self.ts, EventType::GangRecruitmentRejected)
            .with_participant(recruit.id.as_str())
            .with_participant(leader.id.as_str())
            .with_location(leader.location.as_str())
            .with_detail(detail_keys::GANG_ID, gang_id)
            .with_detail(detail_keys::LEADER, &leader.id)
            .with_motivation(tag);
        self.events.push(event);
        tracing::debug!(recruit = %recruit.id, leader = %leader.id, "recruitment rejected");
    }

    fn trade(&mut self, actor: &Party, partner_id: &AgentId, tag: Option<&str>) {
        let Some(partner) = self.counterpart(actor, partner_id) else {
            return;
        };
        let surplus = self.tuning.economy.trade_surplus;
        let (mine, theirs) = trade_split(actor.personality.greed, partner.personality.greed, surplus);
        self.with_vitals(actor.entity, |v| v.gold += mine);
        self.with_vitals(partner.entity, |v| v.gold += theirs);

        let event = self
            .events
            .create(self.ts, EventType::Trade)
            .with_participant(actor.id.as_str())
            .with_participant(partner.id.as_str())
            .with_location(actor.location.as_str())
            .with_detail(detail_keys::GOLD, surplus)
            .with_motivation(tag);
        self.events.push(event);

        let tick = self.ts.tick;
        self.remember(
            &actor.id,
            MemoryEvent::new(MemoryKind::Traded, tick)
                .about(partner.id.clone())
                .with_detail(memory_details::AMOUNT, mine),
        );
        self.remember(
            &partner.id,
            MemoryEvent::new(MemoryKind::Traded, tick)
                .about(actor.id.clone())
                .with_detail(memory_details::AMOUNT, theirs),
        );
    }

    fn socialize(&mut self, actor: &Party, partner_id: &AgentId, tag: Option<&str>) {
        let Some(partner) = self.counterpart(actor, partner_id) else {
            return;
        };
        let event = self
            .events
            .create(self.ts, EventType::SocialInteraction)
            .with_participant(actor.id.as_str())
            .with_participant(partner.id.as_str())
            .with_location(actor.location.as_str())
            .with_detail(detail_keys::INTERACTION, "socialize")
            .with_motivation(tag);
        self.events.push(event);

        let tick = self.ts.tick;
        self.remember(
            &actor.id,
            MemoryEvent::new(MemoryKind::SharedSocialActivity, tick).about(partner.id.clone()),
        );
        self.remember(
            &partner.id,
            MemoryEvent::new(MemoryKind::SharedSocialActivity, tick).about(actor.id.clone()),
        );
    }

    fn help(&mut self, actor: &Party, target: &AgentId, tag: Option<&str>) {
        let Some(recipient) = self.counterpart(actor, target) else {
            return;
        };
        let gift = help_gift(actor.vitals.gold, &self.tuning.economy);
        if gift == 0 {
            return;
        }
        let given = self
            .with_vitals(actor.entity, |v| v.take_gold(gift))
            .unwrap_or(0);
        self.with_vitals(recipient.entity, |v| v.gold += given);

        let event = self
            .events
            .create(self.ts, EventType::SocialInteraction)
            .with_participant(actor.id.as_str())
            .with_participant(recipient.id.as_str())
            .with_location(actor.location.as_str())
            .with_detail(detail_keys::INTERACTION, "help")
            .with_detail(detail_keys::GOLD, given)
            .with_motivation(tag);
        self.events.push(event);

        let tick = self.ts.tick;
        self.remember(
            &recipient.id,
            MemoryEvent::new(MemoryKind::WasHelped, tick)
                .about(actor.id.clone())
                .with_detail(memory_details::AMOUNT, given),
        );
        self.remember(
            &actor.id,
            MemoryEvent::new(MemoryKind::Helped, tick).about(recipient.id.clone()),
        );
    }

    fn work(&mut self, actor: &Party, tag: Option<&str>) {
        if !self.map.is_workplace(&actor.location) {
            return;
        }
        let pay = wage(&actor.vitals, &actor.personality, &self.tuning.economy);
        self.with_vitals(actor.entity, |v| v.gold += pay);
        let event = self
            .events
            .create(self.ts, EventType::Work)
            .with_participant(actor.id.as_str())
            .with_location(actor.location.as_str())
            .with_detail(detail_keys::GOLD, pay)
            .with_motivation(tag);
        self.events.push(event);
    }

    fn shop(&mut self, actor: &Party, tag: Option<&str>) {
        if !self.map.has_shop(&actor.location) {
            return;
        }
        let price = self.tuning.economy.shop_price;
        let heal = self.tuning.economy.shop_heal;
        let paid = self
            .with_vitals(actor.entity, |v| {
                let paid = v.spend(price);
                if paid {
                    v.heal(heal);
                }
                paid
            })
            .unwrap_or(false);
        if !paid {
            return;
        }
        let event = self
            .events
            .create(self.ts, EventType::Shop)
            .with_participant(actor.id.as_str())
            .with_location(actor.location.as_str())
            .with_detail(detail_keys::GOLD, price)
            .with_motivation(tag);
        self.events.push(event);
    }

    fn rest(&mut self, actor: &Party) {
        let quality = self
            .map
            .get(&actor.location)
            .map(|l| l.kind.rest_quality())
            .unwrap_or(1.0);
        let amount = rest_heal(&actor.vitals, quality, &self.tuning.economy);
        self.with_vitals(actor.entity, |v| v.heal(amount));
    }

    fn travel(&mut self, actor: &Party, destination: &str, tag: Option<&str>) {
        if !self.map.are_adjacent(&actor.location, destination) {
            tracing::debug!(agent = %actor.id, from = %actor.location, to = destination, "travel blocked");
            return;
        }
        if let Ok((_, _, _, _, mut position, ..)) = self.agents.get_mut(actor.entity) {
            position.location_id = destination.to_string();
        }
        let event = self
            .events
            .create(self.ts, EventType::Travel)
            .with_participant(actor.id.as_str())
            .with_location(destination)
            .with_detail(detail_keys::FROM, &actor.location)
            .with_detail(detail_keys::TO, destination)
            .with_motivation(tag);
        self.events.push(event);
    }
}
